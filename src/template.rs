// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! URI template reconstruction.
//!
//! Rebuilds a parameterized path such as `/users/{id}{?page}` from a concrete
//! captured URL: variable-bound components become `{name}` placeholders and
//! free query parameters are listed in a `{?a,b}` suffix.

use crate::exchange::{Component, Exchange, VariableMap};
use crate::projector::ProjectError;
use regex::Regex;
use std::sync::LazyLock;

/// A leading `scheme://host[:port]`; any RFC 3986 scheme, any case.
static ORIGIN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[a-z][a-z0-9+.\-]*://[^/]+").expect("origin pattern is valid")
});

/// Builds the URI template path for a request.
///
/// The scheme and host are dropped; an empty path becomes `/`. Query
/// parameters bound to a variable are left out of the `{?...}` suffix.
///
/// # Errors
///
/// Returns [`ProjectError::UnresolvedVariableReference`] if a URL component
/// references an undeclared variable.
pub fn build_path(
    exchange: &Exchange,
    variables: &VariableMap<'_>,
) -> Result<String, ProjectError> {
    let mut url = String::new();
    for component in exchange.url.base.components() {
        match component {
            Component::Literal(text) | Component::Expression { value: text, .. } => {
                url.push_str(text);
            }
            Component::Variable { id } => {
                url.push('{');
                url.push_str(&variables.resolve(id)?.name);
                url.push('}');
            }
        }
    }

    let mut path = strip_origin(&url).to_owned();
    if path.is_empty() {
        path.push('/');
    }

    let free: Vec<&str> = exchange.free_parameters().map(|p| p.name.as_str()).collect();
    if !free.is_empty() {
        path.push_str("{?");
        path.push_str(&free.join(","));
        path.push('}');
    }

    Ok(path)
}

/// Removes a leading `scheme://host[:port]`, leaving the path.
///
/// Strings without a scheme are returned unchanged.
fn strip_origin(url: &str) -> &str {
    ORIGIN_REGEX.find(url).map_or(url, |m| &url[m.end()..])
}
