//! # Outbound Documents
//!
//! A minimal owned element tree for the few documents the client sends, and
//! a writer that renders one into an [`Arena`] (usually the scratch arena)
//! with an XML declaration in front.

use std::fmt;

use courier_core::Arena;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::Writer;

use super::error::{ProtocolError, ProtocolResult};

/// An element with ordered attributes and children.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Element>,
}

impl Element {
    /// Creates an element without attributes or children.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Builder form of [`push_attribute`](Self::push_attribute).
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.push_attribute(key, value);
        self
    }

    /// Builder form of [`push_child`](Self::push_child).
    #[must_use]
    pub fn with_child(mut self, child: Self) -> Self {
        self.push_child(child);
        self
    }

    /// Appends an attribute.
    pub fn push_attribute(&mut self, key: impl Into<String>, value: impl fmt::Display) {
        self.attributes.push((key.into(), value.to_string()));
    }

    /// Appends a child element.
    pub fn push_child(&mut self, child: Self) {
        self.children.push(child);
    }

    /// Tag name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attributes in insertion order.
    #[must_use]
    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    /// Value of the first attribute called `key`.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Child elements in insertion order.
    #[must_use]
    pub fn children(&self) -> &[Self] {
        &self.children
    }

    /// First child called `name`.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&Self> {
        self.children.iter().find(|c| c.name == name)
    }
}

/// Renders the attribute list alone: `a="1" b="x &amp; y"`.
#[must_use]
pub fn render_attributes(element: &Element) -> String {
    let mut out = String::new();
    for (key, value) in &element.attributes {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(key);
        out.push_str("=\"");
        out.push_str(&quick_xml::escape::escape(value.as_str()));
        out.push('"');
    }
    out
}

/// Appends `<?xml version="1.0" encoding="UTF-8"?>` and `root` to `out`.
///
/// Returns the number of bytes appended. Nothing is appended on error.
///
/// # Errors
///
/// Returns [`ProtocolError::Write`] if the writer rejects an event.
pub fn write_document(root: &Element, out: &mut Arena) -> ProtocolResult<usize> {
    let start = out.size();
    let mut writer = Writer::new(&mut *out);
    let written = writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(write_error)
        .and_then(|()| write_element(&mut writer, root));
    if let Err(err) = written {
        out.resize(start);
        return Err(err);
    }
    Ok(out.size() - start)
}

fn write_element<W: std::io::Write>(writer: &mut Writer<W>, element: &Element) -> ProtocolResult<()> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }
    if element.children.is_empty() {
        return writer.write_event(Event::Empty(start)).map_err(write_error);
    }
    writer.write_event(Event::Start(start)).map_err(write_error)?;
    for child in &element.children {
        write_element(writer, child)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new(element.name.as_str())))
        .map_err(write_error)
}

fn write_error(err: impl fmt::Display) -> ProtocolError {
    ProtocolError::Write(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(root: &Element) -> String {
        let mut arena = Arena::new();
        let written = write_document(root, &mut arena).unwrap();
        assert_eq!(written, arena.size());
        String::from_utf8(arena.as_slice().to_vec()).unwrap()
    }

    #[test]
    fn test_declaration_and_empty_root() {
        let text = render(&Element::new("message").with_attribute("type", "bye"));
        assert_eq!(
            text,
            r#"<?xml version="1.0" encoding="UTF-8"?><message type="bye"/>"#
        );
    }

    #[test]
    fn test_nested_elements() {
        let root = Element::new("message")
            .with_attribute("type", "auth-request")
            .with_child(
                Element::new("authentication")
                    .with_attribute("username", "a1")
                    .with_attribute("password", "1"),
            );
        let text = render(&root);
        assert!(text.ends_with(
            r#"<message type="auth-request"><authentication username="a1" password="1"/></message>"#
        ));
    }

    #[test]
    fn test_attribute_values_are_escaped() {
        let root = Element::new("a").with_attribute("v", r#"x<"y"&z"#);
        let text = render(&root);
        let document = roxmltree::Document::parse(&text).unwrap();
        assert_eq!(document.root_element().attribute("v"), Some(r#"x<"y"&z"#));
    }

    #[test]
    fn test_render_attributes() {
        let param = Element::new("param")
            .with_attribute("item", "tool&1")
            .with_attribute("amount", 3);
        assert_eq!(render_attributes(&param), r#"item="tool&amp;1" amount="3""#);
        assert_eq!(render_attributes(&Element::new("param")), "");
    }

    #[test]
    fn test_lookup_helpers() {
        let root = Element::new("message").with_child(Element::new("action").with_attribute("id", 4));
        assert_eq!(root.child("action").unwrap().attribute("id"), Some("4"));
        assert_eq!(root.child("param"), None);
        assert_eq!(root.attribute("id"), None);
    }

    #[test]
    fn test_appends_after_existing_bytes() {
        let mut arena = Arena::new();
        arena.append(b"frame0\0");
        let written = write_document(&Element::new("m"), &mut arena).unwrap();
        assert_eq!(arena.size(), 7 + written);
        assert!(arena.as_slice()[7..].starts_with(b"<?xml"));
    }
}
