// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Projection of a captured exchange into a renderable document model.
//!
//! [`project`] ties the other stages together: it builds the URI template
//! path, collects the parameter list, and normalizes the request and the last
//! captured response. The resulting [`DocumentModel`] is everything the
//! renderer needs; sections that should not appear are `None`.
//!
//! # Example
//!
//! ```
//! use capture2apib::exchange::parse_exchange;
//! use capture2apib::projector::project;
//!
//! let exchange = parse_exchange(r#"{
//!     "method": "GET",
//!     "url": {"base": "https://api.example.com/health"}
//! }"#).unwrap();
//!
//! let model = project(&exchange).unwrap();
//! assert_eq!(model.path, "/health");
//! assert!(model.request.is_none());
//! assert!(model.response.is_none());
//! ```

use crate::exchange::{Exchange, VariableMap};
use crate::normalize::{self, Payload, ResponseProjection};
use crate::parameters::{self, Parameter};
use crate::template;
use serde::Serialize;
use snafu::prelude::*;
use std::fmt;

/// Which side of the exchange a payload belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// The captured request.
    Request,
    /// The captured response.
    Response,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Request => "request",
            Self::Response => "response",
        })
    }
}

/// Error type for projection failures.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ProjectError {
    /// A body labeled JSON by its content type failed to parse.
    #[snafu(display("{side} body is labeled JSON but does not parse: {source}"))]
    MalformedJsonBody {
        /// The side carrying the body.
        side: Side,
        /// The underlying JSON error.
        source: serde_json::Error,
    },

    /// A URL component references a variable the request does not declare.
    #[snafu(display("reference to unknown variable {id:?}"))]
    UnresolvedVariableReference {
        /// The missing variable id.
        id: String,
    },

    /// Variable values reference each other in a loop.
    #[snafu(display("variable {id:?} references itself"))]
    VariableCycle {
        /// The variable id at which the loop was detected.
        id: String,
    },
}

/// Everything needed to render one endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentModel {
    /// The HTTP method.
    pub method: String,

    /// The URI template path, e.g. `/users/{id}{?page}`.
    pub path: String,

    /// Whether the parameter list is non-empty.
    pub has_parameters: bool,

    /// Variable-derived parameters followed by free query parameters.
    pub parameters: Vec<Parameter>,

    /// The request section, or `None` to omit it.
    pub request: Option<Payload>,

    /// The response section, or `None` when no response was captured.
    pub response: Option<ResponseProjection>,
}

/// Builds the document model for a captured exchange.
///
/// # Errors
///
/// Returns an error if a body labeled JSON does not parse, or if the URL
/// references variables the request does not declare.
pub fn project(exchange: &Exchange) -> Result<DocumentModel, ProjectError> {
    let variables = VariableMap::new(&exchange.variables);

    let path = template::build_path(exchange, &variables)?;
    let parameters = parameters::extract_parameters(exchange, &variables)?;
    let request = normalize::normalize_request(&exchange.headers, &exchange.body)?;
    let response = normalize::normalize_response(exchange.last_exchange.as_ref())?;

    tracing::debug!(
        method = %exchange.method,
        %path,
        parameters = parameters.len(),
        request = request.is_some(),
        response = response.is_some(),
        "projected exchange"
    );

    Ok(DocumentModel {
        method: exchange.method.clone(),
        path,
        has_parameters: !parameters.is_empty(),
        parameters,
        request,
        response,
    })
}
