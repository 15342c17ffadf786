// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Comment tokens and file types from an editor `languages.toml`.
//!
//! The input follows the Helix layout: an array of `[[language]]` tables,
//! each with a `name` and optional `comment-token`, `comment-tokens`,
//! `block-comment-tokens`, and `file-types` keys. The result maps each
//! language name to the subset of those keys it defines.
//!
//! # Example
//!
//! ```
//! use licensedoc::languages::{extract_languages, to_json};
//!
//! let toml = r#"
//! [[language]]
//! name = "rust"
//! comment-token = "//"
//! file-types = ["rs"]
//! "#;
//!
//! let languages = extract_languages(toml).unwrap();
//! assert_eq!(languages["rust"].comment_token.as_deref(), Some("//"));
//! assert!(to_json(&languages).unwrap().contains(r#""file_types": ["#));
//! ```

use indexmap::IndexMap;
use serde::Serialize;
use snafu::prelude::*;
use toml::Value;
use tracing::{debug, info, warn};

/// Errors reading or writing language data.
#[derive(Debug, Snafu)]
pub enum LanguageError {
    /// The input is not valid TOML.
    #[snafu(display("invalid TOML: {source}"))]
    Toml {
        /// Underlying parse error.
        source: toml::de::Error,
    },

    /// The result could not be serialized.
    #[snafu(display("failed to serialize JSON: {source}"))]
    Json {
        /// Underlying serialization error.
        source: serde_json::Error,
    },
}

/// Extracted data for one language.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LanguageData {
    /// The line comment token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment_token: Option<String>,

    /// Block comment delimiters, exactly as written in the input.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_comment_tokens: Option<Value>,

    /// File extensions and names. Glob patterns are not included.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_types: Option<Vec<String>>,
}

impl LanguageData {
    /// Returns `true` if no field was found.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.comment_token.is_none()
            && self.block_comment_tokens.is_none()
            && self.file_types.is_none()
    }
}

/// Language data keyed by name, in input order.
pub type LanguageMap = IndexMap<String, LanguageData>;

/// Extracts language data from `languages.toml` content.
///
/// Malformed entries are skipped with a warning.
///
/// # Errors
///
/// Returns [`LanguageError::Toml`] if the input is not valid TOML.
pub fn extract_languages(toml: &str) -> Result<LanguageMap, LanguageError> {
    let config: toml::Table = toml.parse().context(TomlSnafu)?;
    let mut languages = LanguageMap::new();

    let entries = match config.get("language") {
        Some(Value::Array(entries)) if !entries.is_empty() => entries,
        _ => {
            warn!("no [[language]] entries found");
            return Ok(languages);
        }
    };
    debug!(count = entries.len(), "processing language definitions");

    for entry in entries {
        let Some(table) = entry.as_table() else {
            warn!("skipping non-table entry in language list");
            continue;
        };
        let Some(name) = table
            .get("name")
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
        else {
            warn!("skipping language definition without a name");
            continue;
        };

        let data = language_data(name, table);
        if data.is_empty() {
            info!(language = name, "no comment tokens or file types");
            continue;
        }
        languages.insert(name.to_owned(), data);
    }

    Ok(languages)
}

fn language_data(name: &str, table: &toml::Table) -> LanguageData {
    LanguageData {
        comment_token: comment_token(table),
        block_comment_tokens: table.get("block-comment-tokens").cloned(),
        file_types: file_types(name, table),
    }
}

/// `comment-token` if set, otherwise the first of `comment-tokens`.
fn comment_token(table: &toml::Table) -> Option<String> {
    let raw = table
        .get("comment-token")
        .or_else(|| table.get("comment-tokens"))?;
    match raw {
        Value::String(token) => Some(token.clone()),
        Value::Array(tokens) => tokens.first().and_then(Value::as_str).map(str::to_owned),
        _ => None,
    }
}

fn file_types(name: &str, table: &toml::Table) -> Option<Vec<String>> {
    match table.get("file-types")? {
        Value::Array(entries) => {
            let types: Vec<String> = entries
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect();
            let skipped = entries.len() - types.len();
            if skipped > 0 {
                warn!(
                    language = name,
                    skipped, "skipped non-string file-types entries (e.g. globs)"
                );
            }
            Some(types)
        }
        _ => {
            warn!(language = name, "file-types is not a list, ignoring");
            None
        }
    }
}

/// Serializes language data as JSON indented by four spaces.
///
/// Non-ASCII characters are written as-is.
///
/// # Errors
///
/// Returns [`LanguageError::Json`] if serialization fails.
pub fn to_json(languages: &LanguageMap) -> Result<String, LanguageError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    languages.serialize(&mut ser).context(JsonSnafu)?;
    // serde_json only emits valid UTF-8
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"
[[language]]
name = "rust"
comment-tokens = ["//", "///", "//!"]
block-comment-tokens = [
  { start = "/*", end = "*/" },
  { start = "/**", end = "*/" },
]
file-types = ["rs"]

[[language]]
name = "python"
comment-token = "#"
file-types = ["py", { glob = "SConstruct" }, "pyi"]

[[language]]
name = "json"
file-types = ["json", { glob = ".babelrc" }]

[[language]]
name = "plain"
scope = "text.plain"

[[language]]
comment-token = "--"
"##;

    #[test]
    fn extracts_languages_in_order() {
        let languages = extract_languages(SAMPLE).unwrap();
        let names: Vec<_> = languages.keys().map(String::as_str).collect();
        assert_eq!(names, ["rust", "python", "json"]);
    }

    #[test]
    fn comment_tokens_list_uses_first_entry() {
        let languages = extract_languages(SAMPLE).unwrap();
        assert_eq!(languages["rust"].comment_token.as_deref(), Some("//"));
    }

    #[test]
    fn comment_token_takes_precedence() {
        let toml = r##"
[[language]]
name = "x"
comment-token = "#"
comment-tokens = ["//"]
"##;
        let languages = extract_languages(toml).unwrap();
        assert_eq!(languages["x"].comment_token.as_deref(), Some("#"));
    }

    #[test]
    fn block_comment_tokens_pass_through() {
        let languages = extract_languages(SAMPLE).unwrap();
        let block = languages["rust"].block_comment_tokens.as_ref().unwrap();
        let first = &block.as_array().unwrap()[0];
        assert_eq!(first.get("start").and_then(Value::as_str), Some("/*"));
    }

    #[test]
    fn file_types_keep_only_strings() {
        let languages = extract_languages(SAMPLE).unwrap();
        assert_eq!(
            languages["python"].file_types.as_deref(),
            Some(&["py".to_owned(), "pyi".to_owned()][..])
        );
        assert_eq!(languages["python"].block_comment_tokens, None);
    }

    #[test]
    fn file_types_key_kept_when_all_filtered() {
        let toml = r##"
[[language]]
name = "globby"
file-types = [{ glob = "Makefile" }]
"##;
        let languages = extract_languages(toml).unwrap();
        assert_eq!(languages["globby"].file_types, Some(vec![]));
        assert!(to_json(&languages).unwrap().contains("\"file_types\": []"));
    }

    #[test]
    fn missing_language_array_is_empty() {
        assert!(extract_languages("[other]\nkey = 1\n").unwrap().is_empty());
        assert!(extract_languages("language = []\n").unwrap().is_empty());
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let err = extract_languages("[[language]\nname = ").unwrap_err();
        assert!(matches!(err, LanguageError::Toml { .. }));
    }

    #[test]
    fn json_uses_four_space_indent_and_skips_missing_fields() {
        let toml = r##"
[[language]]
name = "python"
comment-token = "#"
"##;
        let json = to_json(&extract_languages(toml).unwrap()).unwrap();
        assert_eq!(json, "{\n    \"python\": {\n        \"comment_token\": \"#\"\n    }\n}");
    }

    #[test]
    fn block_comment_keys_keep_input_order() {
        let json = to_json(&extract_languages(SAMPLE).unwrap()).unwrap();
        let start = json.find("\"start\"").unwrap();
        let end = json.find("\"end\"").unwrap();
        assert!(start < end, "start should precede end in {json}");
    }

    #[test]
    fn json_keeps_non_ascii() {
        let toml = r##"
[[language]]
name = "ünïcode"
comment-token = "‖"
"##;
        let json = to_json(&extract_languages(toml).unwrap()).unwrap();
        assert!(json.contains("\"ünïcode\""));
        assert!(json.contains("\"‖\""));
    }
}
