// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! XML loading for SPDX license documents.
//!
//! This module turns raw XML into an owned element tree and then locates the
//! parts of an SPDX license record that the rest of the crate cares about:
//! the `<license>` element, its `<text>` body, and the optional `<notes>` and
//! `<crossRefs>` sections.
//!
//! # Format Overview
//!
//! An SPDX license-list XML file looks like:
//!
//! ```xml
//! <SPDXLicenseCollection xmlns="http://www.spdx.org/license">
//!   <license licenseId="MIT" name="MIT License" isOsiApproved="true">
//!     <crossRefs><crossRef>https://opensource.org/license/mit/</crossRef></crossRefs>
//!     <text>
//!       <titleText><p>MIT License</p></titleText>
//!       <p>Permission is hereby granted...</p>
//!     </text>
//!   </license>
//! </SPDXLicenseCollection>
//! ```
//!
//! Elements are looked up in the SPDX namespace first and without a
//! namespace as a fallback, so hand-written files lacking `xmlns` load too.
//!
//! # Example
//!
//! ```
//! use licensedoc::parser::{LicenseDocument, NodeKind, parse_xml};
//!
//! let xml = r#"<license licenseId="MIT"><text><p>Hello</p></text></license>"#;
//! let root = parse_xml(xml).unwrap();
//! let doc = LicenseDocument::from_root(root).unwrap();
//!
//! assert_eq!(doc.body().children[0].element.kind, NodeKind::Paragraph);
//! ```

use quick_xml::NsReader;
use quick_xml::escape::{EscapeError, unescape};
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use snafu::prelude::*;
use std::borrow::Cow;

/// Namespace URI used by the SPDX license-list XML files.
pub const SPDX_NAMESPACE: &str = "http://www.spdx.org/license";

/// Error type for input that is not well-formed XML.
#[derive(Debug, Snafu)]
pub enum ParseError {
    /// The XML reader rejected the input.
    #[snafu(display("malformed XML: {source}"))]
    Xml {
        /// The underlying reader error.
        source: quick_xml::Error,
    },

    /// The input ended while an element was still open.
    #[snafu(display("unexpected end of input: <{name}> is never closed"))]
    UnclosedElement {
        /// Local name of the innermost open element.
        name: String,
    },

    /// The input contained no element at all.
    #[snafu(display("document has no root element"))]
    NoRootElement,

    /// A second top-level element followed the root.
    #[snafu(display("document has more than one root element (found <{name}>)"))]
    MultipleRoots {
        /// Local name of the extra top-level element.
        name: String,
    },
}

/// Error type for well-formed XML that is not an SPDX license record.
#[derive(Debug, Snafu)]
pub enum StructureError {
    /// No `<license>` element at the root or directly beneath it.
    #[snafu(display("no <license> element found (with or without the SPDX namespace)"))]
    MissingLicense,

    /// The `<license>` element has no `<text>` body.
    #[snafu(display("<license> has no <text> body"))]
    MissingBody,
}

/// The closed set of element kinds the renderer understands.
///
/// Kinds are resolved once, when the tree is built, from the element's
/// local name. Anything unrecognized becomes [`NodeKind::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// `<optional>`: conditional clause, never rendered.
    Optional,
    /// `<p>`: a paragraph.
    Paragraph,
    /// `<titleText>`: the license title.
    Title,
    /// `<copyrightText>`: a copyright notice.
    Copyright,
    /// `<list>`: an ordered sequence of items.
    List,
    /// `<item>`: one list entry.
    Item,
    /// `<bullet>`: the custom marker of a list item.
    Bullet,
    /// `<standardLicenseHeader>`: boilerplate reproduction text.
    StandardLicenseHeader,
    /// `<br>`: a hard line break.
    Break,
    /// `<alt>`: replaceable text.
    Alt,
    /// Any other element.
    Other,
}

impl NodeKind {
    /// Resolves a kind from an element's local name.
    #[must_use]
    pub fn from_local_name(name: &str) -> Self {
        match name {
            "optional" => Self::Optional,
            "p" => Self::Paragraph,
            "titleText" => Self::Title,
            "copyrightText" => Self::Copyright,
            "list" => Self::List,
            "item" => Self::Item,
            "bullet" => Self::Bullet,
            "standardLicenseHeader" => Self::StandardLicenseHeader,
            "br" => Self::Break,
            "alt" => Self::Alt,
            _ => Self::Other,
        }
    }

    /// Returns `true` for kinds that render as their own block.
    ///
    /// Inside a list item, block children are rendered as nested content
    /// while everything else contributes to the item's own text.
    #[must_use]
    pub const fn is_block(self) -> bool {
        matches!(
            self,
            Self::Paragraph
                | Self::Title
                | Self::Copyright
                | Self::List
                | Self::Item
                | Self::StandardLicenseHeader
        )
    }
}

/// An XML element with its text, children, and raw attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Local name, without any namespace prefix.
    pub name: String,

    /// Resolved namespace URI, or `None` for unqualified elements.
    pub namespace: Option<String>,

    /// Kind resolved from [`Element::name`].
    pub kind: NodeKind,

    /// Text before the first child element (unescaped).
    pub text: String,

    /// Child elements in document order, each with its trailing text.
    pub children: Vec<Child>,

    /// Attribute values as they appear in the source, still escaped.
    attributes: Vec<(String, String)>,
}

/// A child element together with the text that follows its closing tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Child {
    /// The child element.
    pub element: Element,

    /// Text between this child's end and the next sibling (unescaped).
    pub tail: String,
}

impl Element {
    /// Creates an empty element with the given local name.
    #[must_use]
    pub fn new(name: impl Into<String>, namespace: Option<String>) -> Self {
        let name = name.into();
        Self {
            kind: NodeKind::from_local_name(&name),
            name,
            namespace,
            text: String::new(),
            children: Vec::new(),
            attributes: Vec::new(),
        }
    }

    fn from_start(ns: &ResolveResult<'_>, start: &BytesStart<'_>) -> Result<Self, ParseError> {
        let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
        let namespace = match ns {
            ResolveResult::Bound(Namespace(uri)) => Some(String::from_utf8_lossy(uri).into_owned()),
            _ => None,
        };
        let mut element = Self::new(name, namespace);

        for attr in start.attributes() {
            let attr = attr.map_err(quick_xml::Error::from).context(XmlSnafu)?;
            let key = attr.key.as_ref();
            // Namespace declarations are consumed by the reader.
            if key == b"xmlns" || key.starts_with(b"xmlns:") {
                continue;
            }
            element.attributes.push((
                String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned(),
                String::from_utf8_lossy(&attr.value).into_owned(),
            ));
        }

        Ok(element)
    }

    /// Returns `true` if this element has the given local name and namespace.
    #[must_use]
    pub fn is(&self, namespace: Option<&str>, name: &str) -> bool {
        self.name == name && self.namespace.as_deref() == namespace
    }

    /// Returns the raw (still escaped) value of an attribute.
    #[must_use]
    pub fn raw_attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Returns the unescaped value of an attribute.
    ///
    /// # Errors
    ///
    /// Returns an error if the value contains a malformed or unknown
    /// character reference.
    pub fn attribute(&self, name: &str) -> Result<Option<Cow<'_, str>>, EscapeError> {
        self.raw_attribute(name).map(unescape).transpose()
    }

    /// Finds the first direct child with the given local name and namespace.
    #[must_use]
    pub fn find(&self, namespace: Option<&str>, name: &str) -> Option<&Self> {
        self.children
            .iter()
            .map(|child| &child.element)
            .find(|element| element.is(namespace, name))
    }

    /// Finds a direct child in the SPDX namespace, falling back to an
    /// unqualified child of the same name.
    #[must_use]
    pub fn find_spdx(&self, name: &str) -> Option<&Self> {
        self.find(Some(SPDX_NAMESPACE), name)
            .or_else(|| self.find(None, name))
    }

    /// Iterates over direct children with the given local name, in either
    /// the SPDX namespace or no namespace.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Self> + 'a {
        self.children
            .iter()
            .map(|child| &child.element)
            .filter(move |element| {
                element.name == name
                    && matches!(element.namespace.as_deref(), None | Some(SPDX_NAMESPACE))
            })
    }

    /// Concatenates all text in this subtree, including children's tails.
    #[must_use]
    pub fn text_content(&self) -> String {
        let mut out = self.text.clone();
        for child in &self.children {
            out.push_str(&child.element.text_content());
            out.push_str(&child.tail);
        }
        out
    }

    fn push_text(&mut self, text: &str) {
        match self.children.last_mut() {
            Some(last) => last.tail.push_str(text),
            None => self.text.push_str(text),
        }
    }
}

/// Parses an XML document into its root [`Element`].
///
/// Comments, processing instructions, and the XML declaration are dropped.
/// CDATA sections are kept as text.
///
/// # Errors
///
/// Returns [`ParseError`] if the input is not well-formed XML.
///
/// # Example
///
/// ```
/// use licensedoc::parser::parse_xml;
///
/// let root = parse_xml("<a>one<b/>two</a>").unwrap();
/// assert_eq!(root.text, "one");
/// assert_eq!(root.children[0].tail, "two");
/// ```
pub fn parse_xml(xml: &str) -> Result<Element, ParseError> {
    let mut reader = NsReader::from_str(xml);
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_resolved_event().context(XmlSnafu)? {
            (ns, Event::Start(start)) => stack.push(Element::from_start(&ns, &start)?),
            (ns, Event::Empty(start)) => {
                let element = Element::from_start(&ns, &start)?;
                attach(&mut stack, &mut root, element)?;
            }
            (_, Event::End(_)) => {
                if let Some(element) = stack.pop() {
                    attach(&mut stack, &mut root, element)?;
                }
            }
            (_, Event::Text(text)) => {
                if let Some(open) = stack.last_mut() {
                    open.push_text(&text.unescape().context(XmlSnafu)?);
                }
            }
            (_, Event::CData(data)) => {
                if let Some(open) = stack.last_mut() {
                    open.push_text(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            (_, Event::Eof) => break,
            _ => {}
        }
    }

    if let Some(open) = stack.pop() {
        return UnclosedElementSnafu { name: open.name }.fail();
    }
    root.context(NoRootElementSnafu)
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> Result<(), ParseError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(Child {
            element,
            tail: String::new(),
        });
        return Ok(());
    }
    ensure!(
        root.is_none(),
        MultipleRootsSnafu {
            name: element.name.clone()
        }
    );
    *root = Some(element);
    Ok(())
}

/// A parsed SPDX license record.
///
/// Construction guarantees that a `<license>` element and its `<text>` body
/// are present; everything else is optional.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseDocument {
    license: Element,
    body_index: usize,
}

impl LicenseDocument {
    /// Locates the license record in a parsed document.
    ///
    /// The `<license>` element may be the document root or a direct child of
    /// it (the usual `<SPDXLicenseCollection>` wrapper).
    ///
    /// # Errors
    ///
    /// Returns [`StructureError`] if there is no `<license>` element or it
    /// has no `<text>` body.
    pub fn from_root(root: Element) -> Result<Self, StructureError> {
        let license = if is_license(&root, Some(SPDX_NAMESPACE)) || is_license(&root, None) {
            root
        } else {
            take_license(root).context(MissingLicenseSnafu)?
        };

        let body_index = position_spdx(&license, "text").context(MissingBodySnafu)?;
        Ok(Self {
            license,
            body_index,
        })
    }

    /// The `<license>` element itself.
    #[must_use]
    pub const fn license(&self) -> &Element {
        &self.license
    }

    /// The `<text>` body holding the renderable license text.
    #[must_use]
    pub fn body(&self) -> &Element {
        &self.license.children[self.body_index].element
    }

    /// The optional `<notes>` section.
    #[must_use]
    pub fn notes(&self) -> Option<&Element> {
        self.license.find_spdx("notes")
    }

    /// The `<crossRef>` entries of the optional `<crossRefs>` section.
    pub fn cross_refs(&self) -> impl Iterator<Item = &Element> {
        self.license
            .find_spdx("crossRefs")
            .into_iter()
            .flat_map(|refs| refs.children_named("crossRef"))
    }
}

fn is_license(element: &Element, namespace: Option<&str>) -> bool {
    element.is(namespace, "license")
}

fn take_license(mut root: Element) -> Option<Element> {
    let index = root
        .children
        .iter()
        .position(|child| is_license(&child.element, Some(SPDX_NAMESPACE)))
        .or_else(|| {
            root.children
                .iter()
                .position(|child| is_license(&child.element, None))
        })?;
    Some(root.children.swap_remove(index).element)
}

fn position_spdx(element: &Element, name: &str) -> Option<usize> {
    let find = |namespace: Option<&str>| {
        element
            .children
            .iter()
            .position(|child| child.element.is(namespace, name))
    };
    find(Some(SPDX_NAMESPACE)).or_else(|| find(None))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spdx_wrapped(license: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
            <SPDXLicenseCollection xmlns="http://www.spdx.org/license">{license}</SPDXLicenseCollection>"#
        )
    }

    fn load(xml: &str) -> LicenseDocument {
        LicenseDocument::from_root(parse_xml(xml).unwrap()).unwrap()
    }

    #[test]
    fn parses_text_children_and_tails() {
        let root = parse_xml("<p>before <b>bold</b> after <br/>end</p>").unwrap();

        assert_eq!(root.text, "before ");
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.children[0].element.text, "bold");
        assert_eq!(root.children[0].tail, " after ");
        assert_eq!(root.children[1].element.kind, NodeKind::Break);
        assert_eq!(root.children[1].tail, "end");
    }

    #[test]
    fn unescapes_entities_in_text() {
        let root = parse_xml("<p>&lt;year&gt; &amp; more</p>").unwrap();
        assert_eq!(root.text, "<year> & more");
    }

    #[test]
    fn keeps_cdata_as_text() {
        let root = parse_xml("<p><![CDATA[a < b]]></p>").unwrap();
        assert_eq!(root.text, "a < b");
    }

    #[test]
    fn resolves_default_namespace() {
        let root = parse_xml(&spdx_wrapped("<license/>")).unwrap();
        let license = &root.children[0].element;

        assert_eq!(license.name, "license");
        assert_eq!(license.namespace.as_deref(), Some(SPDX_NAMESPACE));
    }

    #[test]
    fn resolves_prefixed_namespace() {
        let xml = r#"<spdx:license xmlns:spdx="http://www.spdx.org/license" spdx:licenseId="X"/>"#;
        let root = parse_xml(xml).unwrap();

        assert_eq!(root.name, "license");
        assert_eq!(root.namespace.as_deref(), Some(SPDX_NAMESPACE));
        assert_eq!(root.raw_attribute("licenseId"), Some("X"));
    }

    #[test]
    fn skips_namespace_declarations_in_attributes() {
        let root = parse_xml(r#"<a xmlns="urn:x" xmlns:y="urn:y" id="1"/>"#).unwrap();

        assert_eq!(root.raw_attribute("xmlns"), None);
        assert_eq!(root.raw_attribute("y"), None);
        assert_eq!(root.raw_attribute("id"), Some("1"));
    }

    #[test]
    fn attribute_values_are_unescaped_on_demand() {
        let root = parse_xml(r#"<a name="A &amp; B" bad="&nope;"/>"#).unwrap();

        assert_eq!(root.raw_attribute("name"), Some("A &amp; B"));
        assert_eq!(root.attribute("name").unwrap().as_deref(), Some("A & B"));
        assert!(root.attribute("bad").is_err());
        assert!(root.attribute("missing").unwrap().is_none());
    }

    #[test]
    fn resolves_node_kinds_at_parse_time() {
        let root = parse_xml(
            "<text><optional/><p/><titleText/><copyrightText/><list/><item/><bullet/>\
             <standardLicenseHeader/><br/><alt/><mystery/></text>",
        )
        .unwrap();
        let kinds: Vec<_> = root.children.iter().map(|c| c.element.kind).collect();

        assert_eq!(
            kinds,
            vec![
                NodeKind::Optional,
                NodeKind::Paragraph,
                NodeKind::Title,
                NodeKind::Copyright,
                NodeKind::List,
                NodeKind::Item,
                NodeKind::Bullet,
                NodeKind::StandardLicenseHeader,
                NodeKind::Break,
                NodeKind::Alt,
                NodeKind::Other,
            ]
        );
    }

    #[test]
    fn returns_error_for_mismatched_tags() {
        let err = parse_xml("<a><b></a>").unwrap_err();
        assert!(matches!(err, ParseError::Xml { .. }));
    }

    #[test]
    fn returns_error_for_unclosed_element() {
        assert!(parse_xml("<a><b>text").is_err());
    }

    #[test]
    fn returns_error_for_empty_input() {
        let err = parse_xml("   ").unwrap_err();
        assert!(matches!(err, ParseError::NoRootElement));
    }

    #[test]
    fn returns_error_for_multiple_roots() {
        let err = parse_xml("<a/><b/>").unwrap_err();
        assert!(matches!(err, ParseError::MultipleRoots { name } if name == "b"));
    }

    #[test]
    fn locates_license_inside_collection() {
        let doc = load(&spdx_wrapped(
            r#"<license licenseId="MIT"><text><p>Body</p></text></license>"#,
        ));

        assert_eq!(doc.license().raw_attribute("licenseId"), Some("MIT"));
        assert_eq!(doc.body().name, "text");
    }

    #[test]
    fn locates_license_without_namespace() {
        let doc = load("<root><license><text/></license></root>");
        assert_eq!(doc.license().namespace, None);
    }

    #[test]
    fn accepts_license_as_document_root() {
        let doc = load(r#"<license licenseId="0BSD"><text/></license>"#);
        assert_eq!(doc.license().raw_attribute("licenseId"), Some("0BSD"));
    }

    #[test]
    fn rejects_document_without_license() {
        let root = parse_xml("<root><other/></root>").unwrap();
        let err = LicenseDocument::from_root(root).unwrap_err();
        assert!(matches!(err, StructureError::MissingLicense));
    }

    #[test]
    fn rejects_license_without_body() {
        let root = parse_xml("<license><notes>n</notes></license>").unwrap();
        let err = LicenseDocument::from_root(root).unwrap_err();
        assert!(matches!(err, StructureError::MissingBody));
    }

    #[test]
    fn finds_notes_and_cross_refs() {
        let doc = load(&spdx_wrapped(
            r"<license>
                <crossRefs>
                  <crossRef>https://a.example</crossRef>
                  <crossRef>https://b.example</crossRef>
                </crossRefs>
                <notes>Some notes</notes>
                <text/>
              </license>",
        ));

        let refs: Vec<_> = doc.cross_refs().map(Element::text_content).collect();
        assert_eq!(refs, vec!["https://a.example", "https://b.example"]);
        assert_eq!(doc.notes().unwrap().text, "Some notes");
    }

    #[test]
    fn cross_refs_are_empty_when_section_missing() {
        let doc = load("<license><text/></license>");
        assert_eq!(doc.cross_refs().count(), 0);
        assert!(doc.notes().is_none());
    }

    #[test]
    fn text_content_includes_descendants_and_tails() {
        let root = parse_xml("<a>1<b>2<c>3</c>4</b>5</a>").unwrap();
        assert_eq!(root.text_content(), "12345");
    }
}
