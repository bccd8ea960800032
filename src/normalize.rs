// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Header filtering and body formatting for request and response payloads.
//!
//! Transport and metadata headers are hidden from the displayed header list
//! but still inspected: a `Content-Type` mentioning `json` marks the body as
//! JSON, which is then re-serialized with 4-space indentation. Body lines are
//! indented to sit inside the nested markdown list of an API Blueprint
//! payload: 8 spaces on their own, 12 when a header list precedes them.

use crate::exchange::{CapturedResponse, Headers};
use crate::projector::{MalformedJsonBodySnafu, ProjectError, Side};
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use snafu::prelude::*;

/// Headers excluded from the displayed header list.
pub const DENIED_HEADERS: [&str; 6] = [
    "Content-Type",
    "Connection",
    "Date",
    "Via",
    "Server",
    "Content-Length",
];

const BODY_INDENT: usize = 8;
const HEADERS_EXTRA_INDENT: usize = 4;
const JSON_INDENT: &[u8] = b"    ";
// 2^53: above this an f64 no longer holds every integer exactly.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Returns `true` if the header is hidden from the displayed list.
#[must_use]
pub fn is_denied_header(key: &str) -> bool {
    DENIED_HEADERS.contains(&key)
}

/// Returns `true` if a `Content-Type` value describes a JSON body.
#[must_use]
pub fn is_json_content_type(value: &str) -> bool {
    value.to_ascii_lowercase().contains("json")
}

/// A displayed header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderEntry {
    /// Header name.
    pub key: String,
    /// Header value.
    pub value: String,
}

/// Normalized headers and body of a request or response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Payload {
    /// Displayed headers, in source order.
    pub headers: Vec<HeaderEntry>,

    /// Whether any header is displayed.
    pub has_headers: bool,

    /// The body, re-serialized if JSON and indented line by line.
    pub body: String,

    /// Whether the source body was non-empty.
    pub has_body: bool,

    /// Whether the body was classified as JSON.
    pub is_json: bool,

    /// The raw `Content-Type` header, even though it is not displayed.
    pub content_type: Option<String>,
}

/// Normalized response: status code plus payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseProjection {
    /// HTTP status code.
    pub status_code: u16,

    /// Response headers and body.
    #[serde(flatten)]
    pub payload: Payload,
}

/// Filters headers and formats the body of one side of an exchange.
///
/// # Errors
///
/// Returns [`ProjectError::MalformedJsonBody`] when the content type claims
/// JSON but the body does not parse.
pub fn normalize(headers: &Headers, body: &str, side: Side) -> Result<Payload, ProjectError> {
    let mut visible = Vec::new();
    let mut is_json = false;

    for (key, value) in headers.iter() {
        if is_denied_header(key) {
            if key == "Content-Type" {
                is_json = is_json_content_type(value);
            }
            tracing::trace!(%side, header = key, "hiding transport header");
            continue;
        }
        visible.push(HeaderEntry {
            key: key.to_owned(),
            value: value.to_owned(),
        });
    }

    let has_headers = !visible.is_empty();
    let has_body = !body.is_empty();
    let is_json = has_body && is_json;

    let body = if has_body {
        let text = if is_json {
            reformat_json(body, side)?
        } else {
            body.to_owned()
        };
        let width = if has_headers {
            BODY_INDENT + HEADERS_EXTRA_INDENT
        } else {
            BODY_INDENT
        };
        indent_lines(&text, width)
    } else {
        String::new()
    };

    Ok(Payload {
        headers: visible,
        has_headers,
        body,
        has_body,
        is_json,
        content_type: headers.get("Content-Type").map(str::to_owned),
    })
}

/// Normalizes the request side of an exchange.
///
/// Returns `Ok(None)` when the request section should be omitted: no
/// displayed headers, no body, and no `Content-Type` header at all. A request
/// carrying only a `Content-Type` is kept.
///
/// # Errors
///
/// Returns an error if the body claims to be JSON but does not parse.
pub fn normalize_request(headers: &Headers, body: &str) -> Result<Option<Payload>, ProjectError> {
    let payload = normalize(headers, body, Side::Request)?;
    let has_content_type = headers.get("Content-Type").is_some();

    if payload.has_headers || payload.has_body || has_content_type {
        Ok(Some(payload))
    } else {
        Ok(None)
    }
}

/// Normalizes the last captured response, if there is one.
///
/// # Errors
///
/// Returns an error if the body claims to be JSON but does not parse.
pub fn normalize_response(
    response: Option<&CapturedResponse>,
) -> Result<Option<ResponseProjection>, ProjectError> {
    let Some(response) = response else {
        return Ok(None);
    };

    Ok(Some(ResponseProjection {
        status_code: response.status_code,
        payload: normalize(&response.headers, &response.body, Side::Response)?,
    }))
}

/// Parses a JSON body and re-serializes it with 4-space indentation.
fn reformat_json(body: &str, side: Side) -> Result<String, ProjectError> {
    let mut value: serde_json::Value =
        serde_json::from_str(body).context(MalformedJsonBodySnafu { side })?;
    integralize_numbers(&mut value);

    let mut buf = Vec::new();
    let mut serializer =
        Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(JSON_INDENT));
    value
        .serialize(&mut serializer)
        .context(MalformedJsonBodySnafu { side })?;

    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Rewrites whole-valued floats such as `1.0` or `1e2` as integers, the way
/// JavaScript prints them.
fn integralize_numbers(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::Number(n) => {
            if let Some(f) = n.as_f64()
                && n.is_f64()
                && f.fract() == 0.0
                && f.abs() <= MAX_SAFE_INTEGER
            {
                #[allow(clippy::cast_possible_truncation)]
                let whole = f as i64;
                *n = whole.into();
            }
        }
        serde_json::Value::Array(items) => items.iter_mut().for_each(integralize_numbers),
        serde_json::Value::Object(map) => map.values_mut().for_each(integralize_numbers),
        _ => {}
    }
}

/// Prefixes every line, the first included, with `width` spaces.
///
/// CRLF line endings are folded to LF first.
fn indent_lines(text: &str, width: usize) -> String {
    let indent = " ".repeat(width);
    let text = text.replace("\r\n", "\n");

    let mut out = String::with_capacity(text.len() + width * (text.lines().count() + 1));
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&indent);
        out.push_str(line);
    }
    out
}
