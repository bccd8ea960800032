// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Parameter list extraction.
//!
//! Request variables come first, in declaration order, followed by query
//! parameters that are not bound to a variable. A bound query parameter is
//! already described by its variable and is not listed twice.

use crate::exchange::{Exchange, VariableMap};
use crate::projector::ProjectError;
use serde::Serialize;

/// The type tag of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    /// A string value.
    String,
}

impl ParameterType {
    /// Returns the tag as written in API Blueprint.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
        }
    }
}

/// Whether a parameter must be supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Attribution {
    /// The parameter is required.
    Required,
    /// The parameter may be omitted.
    Optional,
}

impl Attribution {
    /// Returns the attribution as written in API Blueprint.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::Optional => "optional",
        }
    }
}

/// A documented URI parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Parameter {
    /// Display name.
    pub name: String,

    /// Type tag.
    #[serde(rename = "type")]
    pub kind: ParameterType,

    /// Example value, fully evaluated.
    pub value: String,

    /// Description; set (possibly empty) for variables only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Required or optional; set for variables only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribution: Option<Attribution>,
}

/// Collects the parameter list for a request.
///
/// # Errors
///
/// Returns an error if a value references an undeclared variable or if
/// variable values form a cycle.
pub fn extract_parameters(
    exchange: &Exchange,
    variables: &VariableMap<'_>,
) -> Result<Vec<Parameter>, ProjectError> {
    let mut params = Vec::with_capacity(exchange.variables.len() + exchange.url.parameters.len());

    for variable in &exchange.variables {
        params.push(Parameter {
            name: variable.name.clone(),
            kind: ParameterType::String,
            value: variables.evaluate(&variable.value)?,
            description: Some(variable.description.clone().unwrap_or_default()),
            attribution: Some(if variable.required {
                Attribution::Required
            } else {
                Attribution::Optional
            }),
        });
    }

    for param in exchange.free_parameters() {
        params.push(Parameter {
            name: param.name.clone(),
            kind: ParameterType::String,
            value: variables.evaluate(&param.value)?,
            description: None,
            attribution: None,
        });
    }

    Ok(params)
}
