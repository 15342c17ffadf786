// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! YAML front matter for Markdown output.
//!
//! The output is a small, fixed subset of YAML: plain or double-quoted
//! scalars, literal blocks for multi-line text, and block sequences of
//! quoted strings.

use crate::metadata::{FieldValue, Metadata};
use std::fmt::Write;

/// Characters that cannot start a plain YAML scalar.
const RESERVED_LEADING: &[char] = &['*', '-', '&', '!', '\\', '[', '{', '>', '|', '%', '@', '`'];

/// Words YAML would read as something other than a string.
const KEYWORDS: &[&str] = &["true", "false", "null", "yes", "no", "on", "off", "~"];

/// Formats metadata as a `---` delimited front matter block.
///
/// The block ends with a newline after the closing `---`.
#[must_use]
pub fn format_front_matter(metadata: &Metadata) -> String {
    format_fields(&metadata.fields())
}

/// Formats arbitrary fields as a front matter block, in the given order.
#[must_use]
pub fn format_fields(fields: &[(&str, FieldValue)]) -> String {
    let mut out = String::from("---\n");
    for (key, value) in fields {
        write_field(&mut out, key, value);
    }
    out.push_str("---\n");
    out
}

fn write_field(out: &mut String, key: &str, value: &FieldValue) {
    match value {
        FieldValue::List(items) if items.is_empty() => {
            writeln!(out, "{key}: []").unwrap();
        }
        FieldValue::List(items) => {
            writeln!(out, "{key}:").unwrap();
            for item in items {
                writeln!(out, "  - {}", quote(item)).unwrap();
            }
        }
        FieldValue::Text(text) | FieldValue::Block(text) => write_string(out, key, text),
        FieldValue::OsiApproval(approval) => {
            writeln!(out, "{key}: {approval}").unwrap();
        }
    }
}

fn write_string(out: &mut String, key: &str, text: &str) {
    if text.contains('\n') {
        writeln!(out, "{key}: |").unwrap();
        for line in text.lines() {
            if line.is_empty() {
                out.push('\n');
            } else {
                writeln!(out, "  {line}").unwrap();
            }
        }
    } else {
        writeln!(out, "{key}: {}", scalar(text)).unwrap();
    }
}

/// A single-line string as a YAML scalar, quoted only when needed.
#[must_use]
pub fn scalar(text: &str) -> String {
    if needs_quotes(text) {
        quote(text)
    } else {
        text.to_owned()
    }
}

fn needs_quotes(text: &str) -> bool {
    text.is_empty()
        || text.contains(": ")
        || text.ends_with(':')
        || text.contains(" #")
        || text.starts_with(RESERVED_LEADING)
        || text.starts_with(char::is_whitespace)
        || text.ends_with(char::is_whitespace)
        || KEYWORDS.iter().any(|k| text.eq_ignore_ascii_case(k))
}

fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::OsiApproval;

    fn field(key: &'static str, value: FieldValue) -> String {
        format_fields(&[(key, value)])
    }

    #[test]
    fn formats_full_metadata() {
        let meta = Metadata {
            spdx_id: "MIT".to_owned(),
            name: "MIT License".to_owned(),
            osi_approved: OsiApproval::Approved,
            list_version_added: "1.0".to_owned(),
            cross_refs: vec!["https://opensource.org/license/mit/".to_owned()],
            notes: Some("First line\nSecond line".to_owned()),
        };
        assert_eq!(
            format_front_matter(&meta),
            "---\n\
             spdxID: MIT\n\
             name: MIT License\n\
             osiApproved: true\n\
             listVersionAdded: 1.0\n\
             crossRefs:\n  - \"https://opensource.org/license/mit/\"\n\
             notes: |\n  First line\n  Second line\n\
             ---\n"
        );
    }

    #[test]
    fn defaults_are_bare() {
        assert_eq!(
            format_front_matter(&Metadata::default()),
            "---\nspdxID: N/A\nname: N/A\nosiApproved: unknown\nlistVersionAdded: Unknown\n---\n"
        );
    }

    #[test]
    fn empty_list_is_inline() {
        assert_eq!(field("crossRefs", FieldValue::List(vec![])), "---\ncrossRefs: []\n---\n");
    }

    #[test]
    fn list_items_are_quoted_and_escaped() {
        let out = field(
            "refs",
            FieldValue::List(vec!["plain".to_owned(), r#"say "hi" \ bye"#.to_owned()]),
        );
        assert_eq!(out, "---\nrefs:\n  - \"plain\"\n  - \"say \\\"hi\\\" \\\\ bye\"\n---\n");
    }

    #[test]
    fn osi_approval_is_lowercase() {
        assert_eq!(
            field("osiApproved", FieldValue::OsiApproval(OsiApproval::Approved)),
            "---\nosiApproved: true\n---\n"
        );
        assert_eq!(
            field("osiApproved", FieldValue::OsiApproval(OsiApproval::NotApproved)),
            "---\nosiApproved: false\n---\n"
        );
    }

    #[test]
    fn quotes_colon_space() {
        assert_eq!(scalar("Note: this"), r#""Note: this""#);
        assert_eq!(scalar("http://example.com"), "http://example.com");
    }

    #[test]
    fn quotes_reserved_leading_characters() {
        for text in ["*star", "-dash", "&amp", "!bang", "\\back", "[list", "{map", ">fold", "|lit", "%pct", "@at", "`tick"] {
            assert!(scalar(text).starts_with('"'), "{text} should be quoted");
        }
    }

    #[test]
    fn quotes_keywords_in_any_case() {
        assert_eq!(scalar("true"), r#""true""#);
        assert_eq!(scalar("No"), r#""No""#);
        assert_eq!(scalar("NULL"), r#""NULL""#);
        assert_eq!(scalar("nothing"), "nothing");
    }

    #[test]
    fn quotes_empty_string() {
        assert_eq!(scalar(""), r#""""#);
    }

    #[test]
    fn escapes_quotes_when_quoting() {
        assert_eq!(scalar(r#"-"quoted""#), r#""-\"quoted\"""#);
    }

    #[test]
    fn multiline_text_uses_literal_block() {
        let out = field("notes", FieldValue::Block("one\n\ntwo: three".to_owned()));
        assert_eq!(out, "---\nnotes: |\n  one\n\n  two: three\n---\n");
    }

    #[test]
    fn single_line_block_is_a_scalar() {
        let out = field("notes", FieldValue::Block("just one line".to_owned()));
        assert_eq!(out, "---\nnotes: just one line\n---\n");
    }
}
