//! Namespace-aware XML element tree
//!
//! SUSHI responses arrive as SOAP envelopes whose payload mixes the SUSHI and
//! COUNTER namespaces under arbitrary prefixes. This module reads a document
//! once with `quick-xml`'s namespace resolver and keeps a small owned tree in
//! which every element carries its resolved namespace URI, so the decoder can
//! match elements by `(namespace, local name)` regardless of prefix.

use crate::types::{DecoderError, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::NsReader;

/// COUNTER report namespace
pub const COUNTER_NS: &str = "http://www.niso.org/schemas/counter";

/// SUSHI envelope namespace
pub const SUSHI_NS: &str = "http://www.niso.org/schemas/sushi";

/// Child node of an element
#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

/// An element with its resolved namespace
#[derive(Debug, Clone, PartialEq)]
pub struct XmlElement {
    /// Namespace URI, `None` when the element is unqualified
    pub namespace: Option<String>,
    /// Local name without prefix
    pub name: String,
    /// Attributes by local name, namespace declarations excluded
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    /// True if this element is `{ns}name`
    pub fn is(&self, ns: &str, name: &str) -> bool {
        self.name == name && self.namespace.as_deref() == Some(ns)
    }

    /// Child elements, in document order
    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(element) => Some(element),
            XmlNode::Text(_) => None,
        })
    }

    /// Child elements named `{ns}name`
    pub fn children_named<'a>(&'a self, ns: &'a str, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.elements().filter(move |e| e.is(ns, name))
    }

    /// First child element named `{ns}name`
    pub fn child(&self, ns: &str, name: &str) -> Option<&XmlElement> {
        self.elements().find(|e| e.is(ns, name))
    }

    /// Follow a path of child element names, all in the same namespace
    pub fn find(&self, ns: &str, path: &[&str]) -> Option<&XmlElement> {
        path.iter()
            .try_fold(self, |element, name| element.child(ns, name))
    }

    /// Attribute value by local name
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Concatenated text of this element and all its descendants
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for node in &self.children {
            match node {
                XmlNode::Text(text) => out.push_str(text),
                XmlNode::Element(element) => element.collect_text(out),
            }
        }
    }

    /// Inner text of the element at `path`, if it exists
    pub fn text_at(&self, ns: &str, path: &[&str]) -> Option<String> {
        self.find(ns, path).map(XmlElement::text)
    }

    /// All descendants named `{ns}name` in document order, this element excluded
    pub fn descendants<'a>(&'a self, ns: &str, name: &str) -> Vec<&'a XmlElement> {
        let mut found = Vec::new();
        self.collect_descendants(ns, name, &mut found);
        found
    }

    fn collect_descendants<'a>(&'a self, ns: &str, name: &str, found: &mut Vec<&'a XmlElement>) {
        for element in self.elements() {
            if element.is(ns, name) {
                found.push(element);
            }
            element.collect_descendants(ns, name, found);
        }
    }
}

/// A parsed XML document
#[derive(Debug, Clone, PartialEq)]
pub struct XmlDocument {
    root: XmlElement,
}

impl XmlDocument {
    /// Parse a document from text
    ///
    /// Whitespace-only text between elements is dropped. Fails on malformed
    /// markup, mismatched end tags or a missing root element.
    pub fn parse(text: &str) -> Result<Self> {
        let mut reader = NsReader::from_str(text);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;

        loop {
            let position = reader.buffer_position();
            let (namespace, event) = match reader.read_resolved_event() {
                Ok((ns, event)) => (resolved_namespace(ns), event),
                Err(e) => {
                    return Err(DecoderError::XmlParse(format!(
                        "{} (near byte {})",
                        e, position
                    )))
                }
            };

            match event {
                Event::Start(start) => {
                    stack.push(open_element(namespace, &start)?);
                }
                Event::Empty(start) => {
                    let element = open_element(namespace, &start)?;
                    attach(element, &mut stack, &mut root)?;
                }
                Event::End(_) => {
                    let element = stack.pop().ok_or_else(|| {
                        DecoderError::XmlParse(format!("unexpected end tag near byte {}", position))
                    })?;
                    attach(element, &mut stack, &mut root)?;
                }
                Event::Text(text) => {
                    let text = text
                        .unescape()
                        .map_err(|e| DecoderError::XmlParse(e.to_string()))?;
                    if let Some(parent) = stack.last_mut() {
                        if !text.is_empty() {
                            parent.children.push(XmlNode::Text(text.into_owned()));
                        }
                    }
                }
                Event::CData(data) => {
                    if let Some(parent) = stack.last_mut() {
                        parent
                            .children
                            .push(XmlNode::Text(String::from_utf8_lossy(&data).into_owned()));
                    }
                }
                Event::Eof => break,
                // Declarations, comments, processing instructions, doctype
                _ => {}
            }
        }

        if let Some(open) = stack.last() {
            return Err(DecoderError::XmlParse(format!(
                "unclosed element <{}> at end of document",
                open.name
            )));
        }

        root.map(|root| Self { root })
            .ok_or_else(|| DecoderError::XmlParse("document has no root element".to_string()))
    }

    pub fn root(&self) -> &XmlElement {
        &self.root
    }

    /// All elements named `{ns}name` anywhere in the document, root included
    pub fn descendants(&self, ns: &str, name: &str) -> Vec<&XmlElement> {
        let mut found = Vec::new();
        if self.root.is(ns, name) {
            found.push(&self.root);
        }
        found.extend(self.root.descendants(ns, name));
        found
    }

    /// First element named `{ns}name` anywhere in the document
    pub fn first(&self, ns: &str, name: &str) -> Option<&XmlElement> {
        self.descendants(ns, name).into_iter().next()
    }
}

fn resolved_namespace(ns: ResolveResult) -> Option<String> {
    match ns {
        ResolveResult::Bound(ns) => Some(String::from_utf8_lossy(ns.as_ref()).into_owned()),
        _ => None,
    }
}

fn open_element(namespace: Option<String>, start: &BytesStart) -> Result<XmlElement> {
    let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();

    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| DecoderError::XmlParse(format!("<{}>: {}", name, e)))?;
        let raw_key = attr.key.as_ref();
        if raw_key == b"xmlns" || raw_key.starts_with(b"xmlns:") {
            continue;
        }
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| DecoderError::XmlParse(format!("<{}>: {}", name, e)))?
            .into_owned();
        attributes.push((key, value));
    }

    Ok(XmlElement {
        namespace,
        name,
        attributes,
        children: Vec::new(),
    })
}

/// Hang a finished element under its parent, or make it the document root
fn attach(
    element: XmlElement,
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(XmlNode::Element(element)),
        None if root.is_none() => *root = Some(element),
        None => {
            return Err(DecoderError::XmlParse(format!(
                "second root element <{}>",
                element.name
            )))
        }
    }
    Ok(())
}
