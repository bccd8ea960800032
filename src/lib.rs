// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Convert captured HTTP exchanges to API Blueprint documentation.
//!
//! This crate turns one captured request, together with the last response it
//! received, into the API Blueprint markdown describing that endpoint.
//!
//! # Overview
//!
//! 1. Parse the JSON capture into an [`exchange::Exchange`]
//! 2. Project it into a [`projector::DocumentModel`]: URI template path,
//!    parameter list, normalized request and response payloads
//! 3. Render the model as API Blueprint markdown
//!
//! # Example
//!
//! ```no_run
//! use capture2apib::{exchange, projector, renderer};
//!
//! let json = std::fs::read_to_string("capture.json").unwrap();
//! let capture = exchange::parse_exchange(&json).unwrap();
//! let model = projector::project(&capture).unwrap();
//!
//! let opts = renderer::RenderOptions {
//!     format_header: true,
//!     ..Default::default()
//! };
//!
//! let markdown = renderer::render_document(&model, &opts);
//! println!("{markdown}");
//! ```
//!
//! # Modules
//!
//! - [`exchange`]: capture format, parsing, and variable lookup
//! - [`template`]: URI template path reconstruction
//! - [`parameters`]: parameter list extraction
//! - [`normalize`]: header filtering and body formatting
//! - [`projector`]: assembly of the document model
//! - [`renderer`]: API Blueprint markdown generation

#![deny(missing_docs)]

pub mod exchange;
pub mod normalize;
pub mod parameters;
pub mod projector;
pub mod renderer;
pub mod template;
