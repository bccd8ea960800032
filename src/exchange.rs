// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Captured HTTP exchanges and their JSON capture format.
//!
//! An API client captures a request together with the most recent response it
//! received. This module deserializes that capture into typed Rust values and
//! provides the variable lookup used while projecting it into a document.
//!
//! # Format Overview
//!
//! A capture contains:
//! - The request method, URL, headers, and body
//! - The request variables (named, resolvable values referenced by the URL)
//! - Optionally, the last captured response (status code, headers, body)
//!
//! URL parts are *dynamic strings*: ordered lists of components that are
//! either literal text, a reference to a request variable, or an expression
//! carrying its already-evaluated text.
//!
//! # Example
//!
//! ```
//! use capture2apib::exchange::parse_exchange;
//!
//! let json = r#"{
//!     "method": "GET",
//!     "url": {
//!         "base": ["https://api.example.com/users/", {"variable": "v-id"}],
//!         "parameters": [{"name": "page", "value": "2"}]
//!     },
//!     "variables": [{"id": "v-id", "name": "id", "value": "42", "required": true}]
//! }"#;
//!
//! let exchange = parse_exchange(json).unwrap();
//! assert_eq!(exchange.method, "GET");
//! assert!(exchange.last_exchange.is_none());
//! ```

use crate::projector::{ProjectError, UnresolvedVariableReferenceSnafu, VariableCycleSnafu};
use serde::Deserialize;
use serde::de::{self, MapAccess, Visitor};
use snafu::prelude::*;
use std::collections::HashMap;
use std::fmt;

/// Error type for capture parsing failures.
#[derive(Debug, Snafu)]
pub enum ParseError {
    /// Failed to parse JSON content.
    #[snafu(display("failed to parse capture: {source}"))]
    Json {
        /// The underlying JSON parsing error.
        source: serde_json::Error,
    },
}

/// One captured request together with its most recent response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exchange {
    /// The HTTP method (e.g., "GET").
    pub method: String,

    /// The decomposed request URL.
    #[serde(default)]
    pub url: Url,

    /// Request headers in capture order.
    #[serde(default)]
    pub headers: Headers,

    /// Raw request body; empty when the request has none.
    #[serde(default)]
    pub body: String,

    /// Variables declared on the request, in declaration order.
    #[serde(default)]
    pub variables: Vec<Variable>,

    /// The most recent response, if one was ever captured.
    #[serde(default)]
    pub last_exchange: Option<CapturedResponse>,
}

impl Exchange {
    /// Returns the query parameters that are not bound to a variable.
    pub fn free_parameters(&self) -> impl Iterator<Item = &QueryParameter> {
        self.url
            .parameters
            .iter()
            .filter(|p| p.variable_binding().is_none())
    }
}

/// A request URL split into its base and query parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Url {
    /// Everything before the query string (scheme, host, path).
    pub base: DynamicString,

    /// Query parameters in URL order.
    pub parameters: Vec<QueryParameter>,
}

/// A single URL query parameter.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QueryParameter {
    /// The parameter key.
    pub name: String,

    /// The parameter value.
    #[serde(default)]
    pub value: DynamicString,
}

impl QueryParameter {
    /// Returns the id of the variable this parameter is bound to.
    ///
    /// A parameter is bound when its value starts with a variable reference.
    #[must_use]
    pub fn variable_binding(&self) -> Option<&str> {
        match self.value.components().first()? {
            Component::Variable { id } => Some(id),
            _ => None,
        }
    }
}

/// A named, resolvable value declared on a request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Variable {
    /// Identifier unique within the request; URL components reference it.
    pub id: String,

    /// Human-readable name shown in the documentation.
    pub name: String,

    /// The variable's value, possibly referencing other variables.
    #[serde(default)]
    pub value: DynamicString,

    /// Optional free-form description.
    #[serde(default)]
    pub description: Option<String>,

    /// Whether the variable must be supplied.
    #[serde(default)]
    pub required: bool,
}

/// The last response captured for a request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CapturedResponse {
    /// HTTP status code.
    #[serde(rename = "responseStatusCode")]
    pub status_code: u16,

    /// Response headers in capture order.
    #[serde(rename = "responseHeaders", default)]
    pub headers: Headers,

    /// Raw response body.
    #[serde(rename = "responseBody", default)]
    pub body: String,
}

/// One piece of a [`DynamicString`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Component {
    /// Literal text.
    Literal(String),

    /// A reference to a request variable.
    Variable {
        /// The referenced variable id.
        id: String,
    },

    /// An expression (environment value, function, ...) with its evaluated text.
    Expression {
        /// The kind of expression, when the capture records it.
        kind: Option<String>,
        /// The evaluated text.
        value: String,
    },
}

impl<'de> Deserialize<'de> for Component {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;

        if let Some(text) = value.as_str() {
            return Ok(Self::Literal(text.to_owned()));
        }
        if let Some(id) = value.get("variable").and_then(serde_json::Value::as_str) {
            return Ok(Self::Variable { id: id.to_owned() });
        }
        if let Some(text) = value.get("value").and_then(serde_json::Value::as_str) {
            return Ok(Self::Expression {
                kind: value
                    .get("expression")
                    .and_then(serde_json::Value::as_str)
                    .map(str::to_owned),
                value: text.to_owned(),
            });
        }

        Err(de::Error::custom(format!("unrecognized component: {value}")))
    }
}

/// A string assembled from literal, variable, and expression components.
///
/// Accepts either a plain JSON string (a single literal) or an array of
/// components.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DynamicString(Vec<Component>);

impl DynamicString {
    /// Creates a dynamic string from its components.
    #[must_use]
    pub const fn new(components: Vec<Component>) -> Self {
        Self(components)
    }

    /// Returns the components in order.
    #[must_use]
    pub fn components(&self) -> &[Component] {
        &self.0
    }
}

impl<'de> Deserialize<'de> for DynamicString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Text(String),
            Components(Vec<Component>),
        }

        Ok(match Option::<Repr>::deserialize(deserializer)? {
            None => Self::default(),
            Some(Repr::Text(text)) if text.is_empty() => Self::default(),
            Some(Repr::Text(text)) => Self(vec![Component::Literal(text)]),
            Some(Repr::Components(components)) => Self(components),
        })
    }
}

/// An ordered header mapping.
///
/// Keys keep their capture order; a repeated key replaces the earlier value
/// in place. Keys are matched exactly, so `content-type` and
/// `Content-Type` are distinct headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(Vec<(String, String)>);

impl Headers {
    /// Inserts a header, replacing an existing value with the same key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
    }

    /// Returns the value of the header with exactly this key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Iterates over `(key, value)` pairs in capture order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns `true` if there are no headers.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Self::default();
        for (k, v) in iter {
            headers.insert(k, v);
        }
        headers
    }
}

impl<'de> Deserialize<'de> for Headers {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct HeadersVisitor;

        impl<'de> Visitor<'de> for HeadersVisitor {
            type Value = Headers;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of header names to string values")
            }

            fn visit_unit<E: de::Error>(self) -> Result<Headers, E> {
                Ok(Headers::default())
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Headers, A::Error> {
                let mut headers = Headers::default();
                while let Some((key, value)) = map.next_entry::<String, String>()? {
                    headers.insert(key, value);
                }
                Ok(headers)
            }
        }

        deserializer.deserialize_any(HeadersVisitor)
    }
}

/// Request variables indexed by id.
///
/// Built once per request so every variable reference is a single lookup.
#[derive(Debug)]
pub struct VariableMap<'a> {
    by_id: HashMap<&'a str, &'a Variable>,
}

impl<'a> VariableMap<'a> {
    /// Indexes the given variables by id. Later duplicates win.
    #[must_use]
    pub fn new(variables: &'a [Variable]) -> Self {
        Self {
            by_id: variables.iter().map(|v| (v.id.as_str(), v)).collect(),
        }
    }

    /// Looks up a variable by id.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectError::UnresolvedVariableReference`] if no variable
    /// has the given id.
    pub fn resolve(&self, id: &str) -> Result<&'a Variable, ProjectError> {
        self.by_id
            .get(id)
            .copied()
            .context(UnresolvedVariableReferenceSnafu { id })
    }

    /// Evaluates a dynamic string to plain text, substituting variable values.
    ///
    /// # Errors
    ///
    /// Returns an error if a referenced variable is missing or if variable
    /// values reference each other in a cycle.
    pub fn evaluate(&self, value: &DynamicString) -> Result<String, ProjectError> {
        let mut visiting = Vec::new();
        self.evaluate_with(value, &mut visiting)
    }

    fn evaluate_with(
        &self,
        value: &DynamicString,
        visiting: &mut Vec<&'a str>,
    ) -> Result<String, ProjectError> {
        let mut out = String::new();
        for component in value.components() {
            match component {
                Component::Literal(text) | Component::Expression { value: text, .. } => {
                    out.push_str(text);
                }
                Component::Variable { id } => {
                    let variable = self.resolve(id)?;
                    ensure!(
                        !visiting.contains(&variable.id.as_str()),
                        VariableCycleSnafu { id }
                    );
                    visiting.push(&variable.id);
                    out.push_str(&self.evaluate_with(&variable.value, visiting)?);
                    visiting.pop();
                }
            }
        }
        Ok(out)
    }
}

/// Parses a JSON string into an [`Exchange`].
///
/// # Errors
///
/// Returns an error if the JSON is malformed or doesn't match the capture
/// schema.
///
/// # Example
///
/// ```
/// use capture2apib::exchange::parse_exchange;
///
/// let exchange = parse_exchange(r#"{"method": "DELETE"}"#).unwrap();
/// assert!(exchange.headers.is_empty());
/// assert!(exchange.body.is_empty());
/// ```
pub fn parse_exchange(json_str: &str) -> Result<Exchange, ParseError> {
    serde_json::from_str(json_str).context(JsonSnafu)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variable(id: &str, name: &str, value: DynamicString) -> Variable {
        Variable {
            id: id.into(),
            name: name.into(),
            value,
            description: None,
            required: false,
        }
    }

    fn literal(text: &str) -> DynamicString {
        DynamicString::new(vec![Component::Literal(text.into())])
    }

    fn reference(id: &str) -> DynamicString {
        DynamicString::new(vec![Component::Variable { id: id.into() }])
    }

    #[test]
    fn parses_minimal_exchange() {
        let exchange = parse_exchange(r#"{"method": "GET"}"#).unwrap();

        assert_eq!(exchange.method, "GET");
        assert!(exchange.url.base.components().is_empty());
        assert!(exchange.url.parameters.is_empty());
        assert!(exchange.variables.is_empty());
        assert!(exchange.last_exchange.is_none());
    }

    #[test]
    fn parses_url_components() {
        let exchange = parse_exchange(
            r#"{
                "method": "GET",
                "url": {
                    "base": [
                        "https://api.example.com/users/",
                        {"variable": "v-1"},
                        {"expression": "env", "value": "/posts"}
                    ]
                }
            }"#,
        )
        .unwrap();

        assert_eq!(
            exchange.url.base.components(),
            &[
                Component::Literal("https://api.example.com/users/".into()),
                Component::Variable { id: "v-1".into() },
                Component::Expression {
                    kind: Some("env".into()),
                    value: "/posts".into()
                },
            ]
        );
    }

    #[test]
    fn parses_plain_string_as_single_literal() {
        let exchange =
            parse_exchange(r#"{"method": "GET", "url": {"base": "http://x.test/a"}}"#).unwrap();

        assert_eq!(exchange.url.base, literal("http://x.test/a"));
    }

    #[test]
    fn rejects_unknown_component_shape() {
        let result = parse_exchange(r#"{"method": "GET", "url": {"base": [{"bogus": 1}]}}"#);

        assert!(result.is_err());
    }

    #[test]
    fn preserves_header_order() {
        let exchange = parse_exchange(
            r#"{"method": "GET", "headers": {"Zeta": "1", "Alpha": "2", "Mid": "3"}}"#,
        )
        .unwrap();

        let keys: Vec<_> = exchange.headers.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["Zeta", "Alpha", "Mid"]);
    }

    #[test]
    fn header_lookup_matches_exact_key() {
        let headers: Headers = [
            ("content-type", "application/json"),
            ("Content-Type", "text/plain"),
        ]
        .into_iter()
        .collect();

        assert_eq!(headers.get("Content-Type"), Some("text/plain"));
        assert_eq!(headers.get("content-type"), Some("application/json"));
        assert_eq!(headers.get("CONTENT-TYPE"), None);
        assert_eq!(headers.iter().count(), 2);
    }

    #[test]
    fn repeated_header_key_replaces_in_place() {
        let headers: Headers = [("A", "1"), ("B", "2"), ("A", "3")].into_iter().collect();

        let pairs: Vec<_> = headers.iter().collect();
        assert_eq!(pairs, [("A", "3"), ("B", "2")]);
    }

    #[test]
    fn parses_last_exchange() {
        let exchange = parse_exchange(
            r#"{
                "method": "GET",
                "lastExchange": {
                    "responseStatusCode": 404,
                    "responseHeaders": {"Content-Type": "text/plain"},
                    "responseBody": "missing"
                }
            }"#,
        )
        .unwrap();

        let response = exchange.last_exchange.unwrap();
        assert_eq!(response.status_code, 404);
        assert_eq!(response.headers.get("Content-Type"), Some("text/plain"));
        assert_eq!(response.body, "missing");
    }

    #[test]
    fn null_last_exchange_means_no_response() {
        let exchange = parse_exchange(r#"{"method": "GET", "lastExchange": null}"#).unwrap();

        assert!(exchange.last_exchange.is_none());
    }

    #[test]
    fn detects_variable_binding_from_first_component() {
        let bound = QueryParameter {
            name: "id".into(),
            value: DynamicString::new(vec![
                Component::Variable { id: "v-1".into() },
                Component::Literal("x".into()),
            ]),
        };
        let trailing = QueryParameter {
            name: "q".into(),
            value: DynamicString::new(vec![
                Component::Literal("x".into()),
                Component::Variable { id: "v-1".into() },
            ]),
        };
        let empty = QueryParameter {
            name: "flag".into(),
            value: DynamicString::default(),
        };

        assert_eq!(bound.variable_binding(), Some("v-1"));
        assert_eq!(trailing.variable_binding(), None);
        assert_eq!(empty.variable_binding(), None);
    }

    #[test]
    fn evaluates_nested_variables() {
        let variables = vec![
            variable("host", "host", literal("example.com")),
            variable(
                "url",
                "url",
                DynamicString::new(vec![
                    Component::Literal("https://".into()),
                    Component::Variable { id: "host".into() },
                ]),
            ),
        ];
        let map = VariableMap::new(&variables);

        assert_eq!(map.evaluate(&reference("url")).unwrap(), "https://example.com");
    }

    #[test]
    fn reports_unresolved_reference() {
        let map = VariableMap::new(&[]);

        let err = map.evaluate(&reference("ghost")).unwrap_err();
        assert!(matches!(
            err,
            ProjectError::UnresolvedVariableReference { ref id } if id == "ghost"
        ));
    }

    #[test]
    fn reports_variable_cycle() {
        let variables = vec![
            variable("a", "a", reference("b")),
            variable("b", "b", reference("a")),
        ];
        let map = VariableMap::new(&variables);

        let err = map.evaluate(&reference("a")).unwrap_err();
        assert!(matches!(err, ProjectError::VariableCycle { .. }));
    }

    #[test]
    fn repeated_reference_is_not_a_cycle() {
        let variables = vec![variable("a", "a", literal("x"))];
        let map = VariableMap::new(&variables);
        let value = DynamicString::new(vec![
            Component::Variable { id: "a".into() },
            Component::Variable { id: "a".into() },
        ]);

        assert_eq!(map.evaluate(&value).unwrap(), "xx");
    }

    #[test]
    fn returns_error_for_invalid_json() {
        assert!(parse_exchange("not json").is_err());
    }

    #[test]
    fn returns_error_for_missing_method() {
        assert!(parse_exchange("{}").is_err());
    }
}
