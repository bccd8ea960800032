// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! API Blueprint rendering for projected exchanges.
//!
//! This module turns a [`DocumentModel`] into the markdown of a single API
//! Blueprint action.
//!
//! # Output Format
//!
//! The rendered Markdown includes:
//! - An optional `FORMAT: 1A` metadata line
//! - A `## METHOD /path` heading
//! - A `+ Parameters` list when the request has variables or query parameters
//! - A `+ Request` payload with nested `+ Headers` and `+ Body` sections
//! - A `+ Response <status>` payload of the same shape
//!
//! # Example
//!
//! ```
//! use capture2apib::exchange::parse_exchange;
//! use capture2apib::projector::project;
//! use capture2apib::renderer::{render_document, RenderOptions};
//!
//! let exchange = parse_exchange(r#"{
//!     "method": "GET",
//!     "url": {"base": "https://api.example.com/ping"},
//!     "lastExchange": {
//!         "responseStatusCode": 200,
//!         "responseHeaders": {"Content-Type": "text/plain"},
//!         "responseBody": "pong"
//!     }
//! }"#).unwrap();
//!
//! let markdown = render_document(&project(&exchange).unwrap(), &RenderOptions::default());
//!
//! assert!(markdown.starts_with("## GET /ping\n"));
//! assert!(markdown.contains("+ Response 200 (text/plain)\n\n        pong\n"));
//! ```

use crate::normalize::Payload;
use crate::projector::DocumentModel;
use std::fmt;

/// Identifier under which the generator registers with an API client.
pub const IDENTIFIER: &str = "io.apiary.PawExtensions.APIBlueprintGenerator";

/// Title of the generated document type.
pub const TITLE: &str = "API Blueprint Generator";

/// File extension of rendered documents.
pub const FILE_EXTENSION: &str = "md";

const HEADER_INDENT: &str = "            ";

/// Configuration options for API Blueprint rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Number of heading levels to shift (0-5).
    ///
    /// A value of 0 produces an H2 action heading.
    pub heading_offset: u8,

    /// Whether to start the document with a `FORMAT: 1A` line.
    pub format_header: bool,
}

/// Returns a markdown heading prefix with the given level and offset.
///
/// The heading level is clamped to a maximum of 6 (H6).
fn heading(level: u8, offset: u8) -> String {
    let actual = level.saturating_add(offset).min(6);
    "#".repeat(usize::from(actual))
}

/// Renders a document model as API Blueprint markdown.
#[must_use]
pub fn render_document(model: &DocumentModel, opts: &RenderOptions) -> String {
    Blueprint { model, opts }.to_string()
}

struct Blueprint<'a> {
    model: &'a DocumentModel,
    opts: &'a RenderOptions,
}

impl fmt::Display for Blueprint<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let model = self.model;

        if self.opts.format_header {
            writeln!(f, "FORMAT: 1A\n")?;
        }
        writeln!(
            f,
            "{} {} {}\n",
            heading(2, self.opts.heading_offset),
            model.method,
            model.path
        )?;

        if model.has_parameters {
            writeln!(f, "+ Parameters\n")?;
            for param in &model.parameters {
                write!(f, "    + {}", param.name)?;
                if !param.value.is_empty() {
                    write!(f, ": `{}`", escape_for_inline_code(&param.value))?;
                }
                write!(f, " ({}", param.kind.as_str())?;
                if let Some(attribution) = param.attribution {
                    write!(f, ", {}", attribution.as_str())?;
                }
                f.write_str(")")?;
                if let Some(description) = param.description.as_deref()
                    && !description.is_empty()
                {
                    write!(f, " - {description}")?;
                }
                f.write_str("\n")?;
            }
            f.write_str("\n")?;
        }

        if let Some(request) = &model.request {
            write_payload(f, "Request", request)?;
        }
        if let Some(response) = &model.response {
            write_payload(
                f,
                &format!("Response {}", response.status_code),
                &response.payload,
            )?;
        }

        Ok(())
    }
}

/// Writes a request or response section.
///
/// The body is already indented: 12 spaces when it sits under `+ Body`
/// next to `+ Headers`, 8 spaces when it follows the section directly.
fn write_payload(f: &mut fmt::Formatter<'_>, label: &str, payload: &Payload) -> fmt::Result {
    match &payload.content_type {
        Some(content_type) => writeln!(f, "+ {label} ({content_type})\n")?,
        None => writeln!(f, "+ {label}\n")?,
    }

    if payload.has_headers {
        writeln!(f, "    + Headers\n")?;
        for header in &payload.headers {
            writeln!(f, "{HEADER_INDENT}{}: {}", header.key, header.value)?;
        }
        f.write_str("\n")?;

        if payload.has_body {
            writeln!(f, "    + Body\n")?;
            writeln!(f, "{}\n", payload.body)?;
        }
    } else if payload.has_body {
        writeln!(f, "{}\n", payload.body)?;
    }

    Ok(())
}

/// Replaces backticks so a value can sit inside an inline code span.
fn escape_for_inline_code(s: &str) -> String {
    s.replace('`', "'")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{HeaderEntry, ResponseProjection};
    use crate::parameters::{Attribution, Parameter, ParameterType};

    fn make_model() -> DocumentModel {
        DocumentModel {
            method: "GET".into(),
            path: "/users/{id}".into(),
            has_parameters: false,
            parameters: vec![],
            request: None,
            response: None,
        }
    }

    fn payload(headers: &[(&str, &str)], body: &str) -> Payload {
        Payload {
            headers: headers
                .iter()
                .map(|(k, v)| HeaderEntry {
                    key: (*k).into(),
                    value: (*v).into(),
                })
                .collect(),
            has_headers: !headers.is_empty(),
            body: body.into(),
            has_body: !body.is_empty(),
            is_json: false,
            content_type: None,
        }
    }

    fn default_opts() -> RenderOptions {
        RenderOptions::default()
    }

    #[test]
    fn renders_action_heading() {
        let output = render_document(&make_model(), &default_opts());

        assert_eq!(output, "## GET /users/{id}\n\n");
    }

    #[test]
    fn shifts_heading_level() {
        let opts = RenderOptions {
            heading_offset: 2,
            ..Default::default()
        };
        let output = render_document(&make_model(), &opts);

        assert!(output.starts_with("#### GET"));
    }

    #[test]
    fn clamps_heading_level() {
        assert_eq!(heading(2, 5), "######");
        assert_eq!(heading(2, u8::MAX), "######");
    }

    #[test]
    fn renders_format_header_when_enabled() {
        let opts = RenderOptions {
            format_header: true,
            ..Default::default()
        };
        let output = render_document(&make_model(), &opts);

        assert!(output.starts_with("FORMAT: 1A\n\n## GET"));
    }

    #[test]
    fn renders_parameters() {
        let model = DocumentModel {
            has_parameters: true,
            parameters: vec![
                Parameter {
                    name: "id".into(),
                    kind: ParameterType::String,
                    value: "42".into(),
                    description: Some("User id".into()),
                    attribution: Some(Attribution::Required),
                },
                Parameter {
                    name: "lang".into(),
                    kind: ParameterType::String,
                    value: "en".into(),
                    description: Some(String::new()),
                    attribution: Some(Attribution::Optional),
                },
                Parameter {
                    name: "page".into(),
                    kind: ParameterType::String,
                    value: String::new(),
                    description: None,
                    attribution: None,
                },
            ],
            ..make_model()
        };
        let output = render_document(&model, &default_opts());

        assert!(output.contains(
            "+ Parameters\n\n    + id: `42` (string, required) - User id\n    + lang: `en` (string, optional)\n    + page (string)\n\n"
        ));
    }

    #[test]
    fn omits_parameters_section_when_empty() {
        let output = render_document(&make_model(), &default_opts());

        assert!(!output.contains("+ Parameters"));
    }

    #[test]
    fn renders_headers_and_body_subsections() {
        let model = DocumentModel {
            request: Some(Payload {
                content_type: Some("application/json".into()),
                ..payload(&[("Accept", "*/*")], "            {}")
            }),
            ..make_model()
        };
        let output = render_document(&model, &default_opts());

        assert!(output.contains(
            "+ Request (application/json)\n\n    + Headers\n\n            Accept: */*\n\n    + Body\n\n            {}\n\n"
        ));
    }

    #[test]
    fn renders_body_directly_without_headers() {
        let model = DocumentModel {
            response: Some(ResponseProjection {
                status_code: 404,
                payload: payload(&[], "        not found"),
            }),
            ..make_model()
        };
        let output = render_document(&model, &default_opts());

        assert!(output.contains("+ Response 404\n\n        not found\n\n"));
        assert!(!output.contains("+ Body"));
    }

    #[test]
    fn renders_content_type_only_request() {
        let model = DocumentModel {
            request: Some(Payload {
                content_type: Some("application/json".into()),
                ..payload(&[], "")
            }),
            ..make_model()
        };
        let output = render_document(&model, &default_opts());

        assert!(output.ends_with("+ Request (application/json)\n\n"));
    }

    #[test]
    fn generator_identity() {
        assert_eq!(IDENTIFIER, "io.apiary.PawExtensions.APIBlueprintGenerator");
        assert_eq!(TITLE, "API Blueprint Generator");
        assert_eq!(FILE_EXTENSION, "md");
    }

    #[test]
    fn escapes_backticks_in_parameter_values() {
        assert_eq!(escape_for_inline_code("a`b"), "a'b");
    }
}
