// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! License metadata read from the `<license>` element.

use crate::parser::{Element, LicenseDocument, NodeKind};
use crate::renderer::{OutputMode, RenderOptions, Renderer};
use quick_xml::escape::EscapeError;
use snafu::prelude::*;
use std::fmt;
use tracing::warn;

/// Placeholder for a missing identifier or name.
pub const NOT_AVAILABLE: &str = "N/A";

/// Placeholder for a missing list version.
pub const UNKNOWN_VERSION: &str = "Unknown";

/// Error reading a metadata attribute.
///
/// These are never returned to callers; the affected field falls back to its
/// default and the error is logged.
#[derive(Debug, Snafu)]
pub enum MetadataError {
    /// An attribute value contained an invalid escape sequence.
    #[snafu(display("invalid value for attribute `{name}`"))]
    Attribute {
        /// Attribute name.
        name: String,
        /// Underlying escape error.
        source: EscapeError,
    },
}

/// Whether the license is approved by the Open Source Initiative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OsiApproval {
    /// `isOsiApproved="true"`.
    Approved,
    /// `isOsiApproved="false"`.
    NotApproved,
    /// Missing or any other value.
    #[default]
    Unknown,
}

impl OsiApproval {
    /// Interprets an attribute value, ignoring case.
    #[must_use]
    pub fn from_attribute(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.trim().eq_ignore_ascii_case("true") => Self::Approved,
            Some(v) if v.trim().eq_ignore_ascii_case("false") => Self::NotApproved,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for OsiApproval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Approved => "true",
            Self::NotApproved => "false",
            Self::Unknown => "unknown",
        })
    }
}

/// A single front matter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// A single-line string.
    Text(String),
    /// The OSI approval tri-state.
    OsiApproval(OsiApproval),
    /// An ordered list of strings.
    List(Vec<String>),
    /// Free text that may span several lines.
    Block(String),
}

/// Metadata for one license document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    /// SPDX license identifier, such as `MIT`.
    pub spdx_id: String,
    /// Full license name.
    pub name: String,
    /// OSI approval status.
    pub osi_approved: OsiApproval,
    /// SPDX license list version that first included this license.
    pub list_version_added: String,
    /// Reference URLs, in document order.
    pub cross_refs: Vec<String>,
    /// Notes rendered as plain text, one line per paragraph.
    pub notes: Option<String>,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            spdx_id: NOT_AVAILABLE.to_owned(),
            name: NOT_AVAILABLE.to_owned(),
            osi_approved: OsiApproval::Unknown,
            list_version_added: UNKNOWN_VERSION.to_owned(),
            cross_refs: Vec::new(),
            notes: None,
        }
    }
}

impl Metadata {
    /// Front matter fields in output order.
    ///
    /// `crossRefs` and `notes` are omitted when empty.
    #[must_use]
    pub fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        let mut fields = vec![
            ("spdxID", FieldValue::Text(self.spdx_id.clone())),
            ("name", FieldValue::Text(self.name.clone())),
            ("osiApproved", FieldValue::OsiApproval(self.osi_approved)),
            (
                "listVersionAdded",
                FieldValue::Text(self.list_version_added.clone()),
            ),
        ];
        if !self.cross_refs.is_empty() {
            fields.push(("crossRefs", FieldValue::List(self.cross_refs.clone())));
        }
        if let Some(notes) = &self.notes {
            fields.push(("notes", FieldValue::Block(notes.clone())));
        }
        fields
    }
}

/// Reads the metadata of a license document.
///
/// Never fails: missing attributes take their defaults, and attributes that
/// cannot be unescaped are logged and treated as missing.
#[must_use]
pub fn extract_metadata(doc: &LicenseDocument) -> Metadata {
    let license = doc.license();
    let attr = |name: &str| read_attribute(license, name);

    let notes = doc
        .notes()
        .map(notes_text)
        .filter(|notes| !notes.is_empty());

    Metadata {
        spdx_id: attr("licenseId").unwrap_or_else(|| NOT_AVAILABLE.to_owned()),
        name: attr("name").unwrap_or_else(|| NOT_AVAILABLE.to_owned()),
        osi_approved: OsiApproval::from_attribute(attr("isOsiApproved").as_deref()),
        list_version_added: attr("listVersionAdded")
            .unwrap_or_else(|| UNKNOWN_VERSION.to_owned()),
        cross_refs: doc
            .cross_refs()
            .map(|cross_ref| collapse_whitespace(&cross_ref.text_content()))
            .filter(|url| !url.is_empty())
            .collect(),
        notes,
    }
}

fn read_attribute(element: &Element, name: &str) -> Option<String> {
    match element.attribute(name).context(AttributeSnafu { name }) {
        Ok(value) => value.map(|v| v.trim().to_owned()),
        Err(e) => {
            warn!(error = %e, "ignoring unreadable license attribute");
            None
        }
    }
}

/// Plain-text rendering of `<notes>`: each paragraph on its own line, with
/// whitespace collapsed inside it.
fn notes_text(notes: &Element) -> String {
    let renderer = Renderer::new(&RenderOptions {
        mode: OutputMode::Text,
        ..Default::default()
    });

    let mut lines = vec![renderer.normalize(&notes.text)];
    for child in &notes.children {
        if child.element.kind == NodeKind::Optional {
            continue;
        }
        lines.push(renderer.flatten(&child.element).join("\n"));
        lines.push(renderer.normalize(&child.tail));
    }
    lines.retain(|line| !line.is_empty());
    lines.join("\n")
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
