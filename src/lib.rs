// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Render SPDX license XML as Markdown or plain text.
//!
//! This crate turns the license files of the SPDX license list
//! (`license-list-XML`) into readable documents, and extracts comment and
//! file-type metadata from editor language configuration.
//!
//! # Overview
//!
//! Converting a license goes through four steps:
//!
//! 1. Parse the XML into an element tree and locate the license
//! 2. Read its metadata (identifier, name, OSI approval, references, notes)
//! 3. Render the license body, dropping optional clauses
//! 4. Assemble front matter and body into the final document
//!
//! Markdown output starts with YAML front matter; plain text output is the
//! body alone.
//!
//! # Example
//!
//! ```
//! use licensedoc::convert;
//! use licensedoc::renderer::RenderOptions;
//!
//! let xml = r#"<SPDXLicenseCollection xmlns="http://www.spdx.org/license">
//!   <license licenseId="MIT" name="MIT License" isOsiApproved="true">
//!     <text><p>Permission is hereby granted.</p></text>
//!   </license>
//! </SPDXLicenseCollection>"#;
//!
//! let markdown = convert(xml, &RenderOptions::default()).unwrap();
//! assert!(markdown.starts_with("---\nspdxID: MIT\n"));
//! assert!(markdown.ends_with("Permission is hereby granted.\n"));
//! ```
//!
//! # Modules
//!
//! - [`parser`]: XML loading and license lookup
//! - [`metadata`]: License attributes, cross references, and notes
//! - [`renderer`]: Markdown and plain-text rendering of the license body
//! - [`front_matter`]: YAML front matter formatting
//! - [`batch`]: Converting many files with per-file outcomes
//! - [`languages`]: Language comment tokens from `languages.toml`

#![deny(missing_docs)]

pub mod batch;
pub mod front_matter;
pub mod languages;
pub mod metadata;
pub mod parser;
pub mod renderer;

use regex::Regex;
use renderer::{OutputMode, RenderOptions, Renderer};
use snafu::prelude::*;
use std::sync::LazyLock;
use tracing::debug;

static EXCESS_BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n(?:[ \t]*\n){2,}").expect("valid blank line pattern"));

/// Errors that prevent a document from being converted.
#[derive(Debug, Snafu)]
pub enum ConvertError {
    /// The input is not well-formed XML.
    #[snafu(display("invalid XML: {source}"))]
    Parse {
        /// Underlying parse error.
        source: parser::ParseError,
    },

    /// The XML has no license or no license text.
    #[snafu(display("unexpected document structure: {source}"))]
    Structure {
        /// Underlying structure error.
        source: parser::StructureError,
    },
}

/// Converts one SPDX license XML document.
///
/// In Markdown mode the result starts with front matter; in text mode it is
/// the body alone. Output always ends with exactly one newline and never
/// contains more than one blank line in a row.
///
/// # Errors
///
/// Returns [`ConvertError`] if the XML is malformed or has no license body.
pub fn convert(xml: &str, opts: &RenderOptions) -> Result<String, ConvertError> {
    let root = parser::parse_xml(xml).context(ParseSnafu)?;
    let doc = parser::LicenseDocument::from_root(root).context(StructureSnafu)?;

    let front_matter = match opts.mode {
        OutputMode::Markdown => {
            let meta = metadata::extract_metadata(&doc);
            debug!(spdx_id = %meta.spdx_id, "extracted license metadata");
            Some(front_matter::format_front_matter(&meta))
        }
        OutputMode::Text => None,
    };

    let body = Renderer::new(opts).render_body(doc.body());
    Ok(assemble(front_matter.as_deref(), &body))
}

/// Joins optional front matter and a rendered body into a final document.
///
/// Leading and trailing blank lines are removed, runs of blank lines are
/// collapsed to one, and the result ends with a single newline.
#[must_use]
pub fn assemble(front_matter: Option<&str>, body: &str) -> String {
    let mut doc = String::new();
    if let Some(front_matter) = front_matter {
        doc.push_str(front_matter.trim());
        doc.push_str("\n\n");
    }
    doc.push_str(body);

    let trimmed = doc.trim_end().trim_start_matches(['\n', '\r']);
    let mut out = EXCESS_BLANK_LINES.replace_all(trimmed, "\n\n").into_owned();
    out.push('\n');
    out
}
