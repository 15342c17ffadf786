// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Rendering of SPDX license bodies as Markdown or plain text.
//!
//! This module walks the element tree produced by [`crate::parser`] and turns
//! each node into a text fragment. Fragments already end with the blank line
//! their kind calls for, so a parent simply concatenates its children.
//!
//! # Output Format
//!
//! | Element                   | Markdown            | Text                       |
//! |---------------------------|---------------------|----------------------------|
//! | `<titleText>`             | `# Title`           | `Title`                    |
//! | `<copyrightText>`         | `**Copyright**`     | `Copyright`                |
//! | `<p>` / unknown           | wrapped paragraph   | wrapped paragraph          |
//! | `<item>`                  | custom bullet       | `-` bullet                 |
//! | `<standardLicenseHeader>` | fenced code block   | `BEGIN`/`END` markers      |
//! | `<br>`                    | `"  \n"`            | `"\n"`                     |
//! | `<optional>`              | dropped             | dropped                    |
//!
//! Placeholders such as `<year>` become `{{year}}` in Markdown and vanish in
//! plain text.
//!
//! # Example
//!
//! ```
//! use licensedoc::parser::{LicenseDocument, parse_xml};
//! use licensedoc::renderer::{OutputMode, RenderOptions, Renderer};
//!
//! let xml = r#"<license><text>
//!     <titleText><p>Demo License</p></titleText>
//!     <p>Copyright &lt;year&gt; holder<optional> (optional words)</optional></p>
//! </text></license>"#;
//! let doc = LicenseDocument::from_root(parse_xml(xml).unwrap()).unwrap();
//!
//! let opts = RenderOptions::default();
//! let markdown = Renderer::new(&opts).render_body(doc.body());
//! assert_eq!(markdown, "# Demo License\n\nCopyright {{year}} holder\n\n");
//!
//! let opts = RenderOptions { mode: OutputMode::Text, ..Default::default() };
//! let text = Renderer::new(&opts).render_body(doc.body());
//! assert_eq!(text, "Demo License\n\nCopyright holder\n\n");
//! ```

use crate::parser::{Child, Element, NodeKind};
use regex::{Captures, Regex};
use snafu::prelude::*;
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Default maximum line width for wrapped text.
pub const DEFAULT_WIDTH: usize = 100;

/// Indentation added per nesting level.
const INDENT_UNIT: &str = "  ";

static ESCAPED_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&lt;([^>]+?)&gt;").expect("valid placeholder pattern"));

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<([^<>]+)>").expect("valid placeholder pattern"));

/// The two supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Markdown with YAML front matter.
    #[default]
    Markdown,
    /// Plain text, body only.
    Text,
}

/// Error returned when parsing an unknown [`OutputMode`] name.
#[derive(Debug, Snafu)]
#[snafu(display("unknown output type `{value}` (expected `markdown` or `text`)"))]
pub struct UnknownOutputMode {
    value: String,
}

impl OutputMode {
    /// File extension used for documents in this mode.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Markdown => "md",
            Self::Text => "txt",
        }
    }

    /// The rendering strategy for this mode.
    #[must_use]
    pub const fn style(self) -> &'static dyn Style {
        match self {
            Self::Markdown => &Markdown,
            Self::Text => &PlainText,
        }
    }
}

impl FromStr for OutputMode {
    type Err = UnknownOutputMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "markdown" | "md" => Ok(Self::Markdown),
            "text" | "txt" => Ok(Self::Text),
            _ => UnknownOutputModeSnafu { value: s }.fail(),
        }
    }
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Markdown => "markdown",
            Self::Text => "text",
        })
    }
}

/// Configuration options for rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Which output format to produce.
    pub mode: OutputMode,

    /// Maximum line width for wrapped paragraphs and list items.
    ///
    /// Lines only exceed this when a single word is longer than the width.
    pub width: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            mode: OutputMode::Markdown,
            width: DEFAULT_WIDTH,
        }
    }
}

/// Format-specific decisions made while rendering.
///
/// One implementation exists per [`OutputMode`]; the renderer consults the
/// style instead of branching on the mode at every node.
pub trait Style: Sync {
    /// Renders a title line, including its trailing blank line.
    fn heading(&self, text: &str, indent: &str) -> String;

    /// Renders a copyright notice, including its trailing blank line.
    fn copyright(&self, lines: &[String], indent: &str) -> String;

    /// Renders boilerplate text verbatim, including its trailing blank line.
    fn code_block(&self, lines: &[String], indent: &str) -> String;

    /// The characters that end a line at a hard break.
    fn hard_break(&self) -> &'static str;

    /// Whether titles and copyright notices wrap to the width like paragraphs.
    fn wraps_notices(&self) -> bool;

    /// Replacement text for a `<name>` placeholder.
    fn placeholder(&self, name: &str) -> String;

    /// The marker written before a list item's text.
    fn bullet<'a>(&self, custom: Option<&'a str>) -> Cow<'a, str>;
}

/// Markdown output style.
#[derive(Debug, Clone, Copy, Default)]
pub struct Markdown;

/// Plain-text output style.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainText;

impl Style for Markdown {
    fn heading(&self, text: &str, indent: &str) -> String {
        format!("{indent}# {text}\n\n")
    }

    fn copyright(&self, lines: &[String], indent: &str) -> String {
        format!("{indent}**{}**\n\n", lines.join(&format!("  \n{indent}")))
    }

    fn code_block(&self, lines: &[String], indent: &str) -> String {
        let mut out = format!("{indent}```\n");
        for line in lines {
            out.push_str(indent);
            out.push_str(line);
            out.push('\n');
        }
        out.push_str(indent);
        out.push_str("```\n\n");
        out
    }

    fn hard_break(&self) -> &'static str {
        "  \n"
    }

    fn wraps_notices(&self) -> bool {
        false
    }

    fn placeholder(&self, name: &str) -> String {
        format!("{{{{{name}}}}}")
    }

    fn bullet<'a>(&self, custom: Option<&'a str>) -> Cow<'a, str> {
        custom.map_or(Cow::Borrowed("-"), Cow::Borrowed)
    }
}

impl Style for PlainText {
    fn heading(&self, text: &str, indent: &str) -> String {
        format!("{indent}{text}\n\n")
    }

    fn copyright(&self, lines: &[String], indent: &str) -> String {
        format!("{indent}{}\n\n", lines.join(&format!("\n{indent}")))
    }

    fn code_block(&self, lines: &[String], indent: &str) -> String {
        let mut out = format!("{indent}--- BEGIN LICENSE HEADER ---\n");
        for line in lines {
            out.push_str(indent);
            out.push_str(line);
            out.push('\n');
        }
        out.push_str(indent);
        out.push_str("--- END LICENSE HEADER ---\n\n");
        out
    }

    fn hard_break(&self) -> &'static str {
        "\n"
    }

    fn wraps_notices(&self) -> bool {
        true
    }

    fn placeholder(&self, _name: &str) -> String {
        String::new()
    }

    fn bullet<'a>(&self, _custom: Option<&'a str>) -> Cow<'a, str> {
        Cow::Borrowed("-")
    }
}

/// Flattened inline text, split at hard breaks.
///
/// Each segment holds whitespace-normalized text; the boundary between two
/// segments is a hard break. Keeping breaks out of the strings means that
/// whitespace collapsing can never swallow them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlineText {
    segments: Vec<String>,
}

impl InlineText {
    /// Appends a normalized fragment to the current segment.
    ///
    /// A single space separates it from preceding text unless that text
    /// already ends in whitespace. Empty fragments are ignored.
    pub fn push_text(&mut self, fragment: &str) {
        if fragment.is_empty() {
            return;
        }
        let current = self.current();
        if !current.is_empty() && !current.ends_with(char::is_whitespace) {
            current.push(' ');
        }
        current.push_str(fragment);
    }

    /// Ends the current segment at a hard break.
    pub fn push_break(&mut self) {
        self.current();
        self.segments.push(String::new());
    }

    /// Appends another flattened text, continuing the current segment.
    pub fn append(&mut self, other: Self) {
        let mut segments = other.segments.into_iter();
        if let Some(first) = segments.next() {
            self.push_text(&first);
        }
        self.segments.extend(segments);
    }

    /// Segments with leading and trailing empty ones removed.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        let start = self
            .segments
            .iter()
            .position(|s| !s.is_empty())
            .unwrap_or(self.segments.len());
        let end = self
            .segments
            .iter()
            .rposition(|s| !s.is_empty())
            .map_or(start, |i| i + 1);
        &self.segments[start..end]
    }

    /// Returns `true` if there is no visible text.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.iter().all(String::is_empty)
    }

    /// Joins the segments with `separator` at each hard break.
    #[must_use]
    pub fn join(&self, separator: &str) -> String {
        self.segments().join(separator)
    }

    fn current(&mut self) -> &mut String {
        if self.segments.is_empty() {
            self.segments.push(String::new());
        }
        let last = self.segments.len() - 1;
        &mut self.segments[last]
    }
}

/// Renders license elements in one output mode.
///
/// Rendering is a pure function of the element, the nesting depth, and the
/// options the renderer was created with.
#[derive(Clone, Copy)]
pub struct Renderer {
    style: &'static dyn Style,
    width: usize,
}

impl fmt::Debug for Renderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Renderer")
            .field("width", &self.width)
            .finish_non_exhaustive()
    }
}

impl Renderer {
    /// Creates a renderer for the given options.
    #[must_use]
    pub const fn new(opts: &RenderOptions) -> Self {
        Self {
            style: opts.mode.style(),
            width: opts.width,
        }
    }

    /// Renders the children of a `<text>` body at the top level.
    ///
    /// Loose text directly inside the body, and text trailing each child,
    /// is rendered as a paragraph. Text trailing an `<optional>` is dropped
    /// along with it.
    #[must_use]
    pub fn render_body(&self, body: &Element) -> String {
        let mut out = self.loose_text(&body.text);
        for Child { element, tail } in &body.children {
            if element.kind == NodeKind::Optional {
                continue;
            }
            out.push_str(&self.render(element, 0));
            out.push_str(&self.loose_text(tail));
        }
        out
    }

    /// Renders one element as a block at the given nesting depth.
    ///
    /// Unrecognized elements are rendered as paragraphs.
    #[must_use]
    pub fn render(&self, element: &Element, depth: usize) -> String {
        let indent = INDENT_UNIT.repeat(depth);
        match element.kind {
            NodeKind::Optional | NodeKind::Break | NodeKind::Alt => String::new(),
            NodeKind::Title => self.title(element, &indent),
            NodeKind::Copyright => self.copyright(element, &indent),
            NodeKind::List => self.list(element, depth),
            NodeKind::Item => self.item(element, depth),
            NodeKind::StandardLicenseHeader => self.standard_header(element, &indent),
            NodeKind::Paragraph | NodeKind::Bullet | NodeKind::Other => {
                self.paragraph(element, &indent)
            }
        }
    }

    /// Flattens an element's text content, including its descendants.
    ///
    /// `<optional>` children and their trailing text are skipped, `<br>`
    /// becomes a hard break, and every other child is flattened recursively.
    #[must_use]
    pub fn flatten(&self, element: &Element) -> InlineText {
        let mut out = InlineText::default();
        out.push_text(&self.normalize(&element.text));
        for child in &element.children {
            self.flatten_child(&mut out, child);
        }
        out
    }

    /// Flattens an element and joins hard breaks with this style's line break.
    #[must_use]
    pub fn inline_text(&self, element: &Element) -> String {
        self.flatten(element).join(self.style.hard_break())
    }

    /// Word-wraps flattened text.
    ///
    /// The first line starts with `first_indent`; every later line, including
    /// those after a hard break, starts with `rest_indent`.
    #[must_use]
    pub fn wrap(&self, text: &InlineText, first_indent: &str, rest_indent: &str) -> String {
        let mut out = String::new();
        let mut indent = first_indent;
        for (i, segment) in text.segments().iter().enumerate() {
            if i > 0 {
                out.push_str(self.style.hard_break());
            }
            out.push_str(&wrap_line(segment, indent, rest_indent, self.width).join("\n"));
            indent = rest_indent;
        }
        out
    }

    fn flatten_child(&self, out: &mut InlineText, child: &Child) {
        match child.element.kind {
            NodeKind::Optional => return,
            NodeKind::Break => out.push_break(),
            _ => out.append(self.flatten(&child.element)),
        }
        out.push_text(&self.normalize(&child.tail));
    }

    /// Rewrites placeholders in a raw text run, then collapses and trims its
    /// whitespace.
    #[must_use]
    pub fn normalize(&self, raw: &str) -> String {
        let replace = |caps: &Captures<'_>| self.style.placeholder(&caps[1]);
        let text = ESCAPED_PLACEHOLDER.replace_all(raw, replace);
        let text = PLACEHOLDER.replace_all(&text, replace);
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    fn loose_text(&self, raw: &str) -> String {
        let mut text = InlineText::default();
        text.push_text(&self.normalize(raw));
        self.block(&text, "")
    }

    fn block(&self, text: &InlineText, indent: &str) -> String {
        if text.is_empty() {
            return String::new();
        }
        format!("{}\n\n", self.wrap(text, indent, indent))
    }

    fn paragraph(&self, element: &Element, indent: &str) -> String {
        self.block(&self.flatten(element), indent)
    }

    fn title(&self, element: &Element, indent: &str) -> String {
        let text = self.flatten(element);
        if text.is_empty() {
            return String::new();
        }
        if self.style.wraps_notices() {
            return self.style.heading(&self.wrap(&text, indent, indent), "");
        }
        self.style.heading(&text.join(" "), indent)
    }

    fn copyright(&self, element: &Element, indent: &str) -> String {
        let text = self.flatten(element);
        if text.is_empty() {
            return String::new();
        }
        if self.style.wraps_notices() {
            return self.style.copyright(&[self.wrap(&text, indent, indent)], "");
        }
        self.style.copyright(text.segments(), indent)
    }

    fn standard_header(&self, element: &Element, indent: &str) -> String {
        let text = self.flatten(element);
        if text.is_empty() {
            return String::new();
        }
        self.style.code_block(text.segments(), indent)
    }

    fn list(&self, element: &Element, depth: usize) -> String {
        element
            .children
            .iter()
            .filter(|child| child.element.kind == NodeKind::Item)
            .map(|child| self.item(&child.element, depth))
            .collect()
    }

    /// Renders a list item: a bulleted, hanging-indented text block followed
    /// by its nested blocks one level deeper.
    ///
    /// An item without text of its own contributes only its nested blocks.
    fn item(&self, element: &Element, depth: usize) -> String {
        let indent = INDENT_UNIT.repeat(depth);
        let mut out = String::new();

        let text = self.item_text(element);
        if !text.is_empty() {
            let marker = element
                .children
                .iter()
                .find(|child| child.element.kind == NodeKind::Bullet)
                .map(|child| self.flatten(&child.element).join(" "))
                .filter(|marker| !marker.is_empty());
            let bullet = self.style.bullet(marker.as_deref());
            let first = format!("{indent}{bullet} ");
            let rest = format!("{indent}{}", " ".repeat(bullet.chars().count() + 1));
            out.push_str(&self.wrap(&text, &first, &rest));
            out.push_str("\n\n");
        }

        for child in &element.children {
            if child.element.kind.is_block() {
                out.push_str(&self.render(&child.element, depth + 1));
            }
        }
        out
    }

    /// The item's own text: direct text, inline children, and the text
    /// trailing its bullet and nested blocks.
    fn item_text(&self, element: &Element) -> InlineText {
        let mut out = InlineText::default();
        out.push_text(&self.normalize(&element.text));
        for child in &element.children {
            let kind = child.element.kind;
            if kind == NodeKind::Bullet || kind.is_block() {
                out.push_text(&self.normalize(&child.tail));
            } else {
                self.flatten_child(&mut out, child);
            }
        }
        out
    }
}

/// Greedily breaks one line of text into lines of at most `width` columns.
///
/// Words are never split, so a word longer than the available space gets a
/// line of its own.
#[must_use]
pub fn wrap_line(text: &str, first_indent: &str, rest_indent: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = first_indent.to_owned();
    let mut line_width = first_indent.chars().count();
    let mut has_word = false;

    for word in text.split_whitespace() {
        let word_width = word.chars().count();
        if has_word && line_width + 1 + word_width > width {
            lines.push(line);
            line = rest_indent.to_owned();
            line_width = rest_indent.chars().count();
            has_word = false;
        }
        if has_word {
            line.push(' ');
            line_width += 1;
        }
        line.push_str(word);
        line_width += word_width;
        has_word = true;
    }

    lines.push(line.trim_end().to_owned());
    lines
}
