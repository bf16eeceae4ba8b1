//! XML document trees
//!
//! This module reads XML text with `quick-xml` into a small owned element
//! tree. Both the codec (instance documents) and the XSD reader (schema
//! documents) work on this tree.

use crate::error::{Error, Result};
use crate::names::split_qname;
use crate::namespaces::NamespaceMap;
use indexmap::IndexMap;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// XML Element in the document tree
#[derive(Debug, Clone, Default)]
pub struct Element {
    /// Tag name as written, including any prefix
    pub name: String,
    /// Attributes in document order, keyed by name as written
    pub attributes: IndexMap<String, String>,
    /// Concatenated character data directly inside this element
    pub text: Option<String>,
    /// Child elements
    pub children: Vec<Element>,
    /// Namespace declarations made on this element (prefix "" = default)
    pub namespaces: NamespaceMap,
}

impl Element {
    /// Create a new element
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Get the local name of the element
    pub fn local_name(&self) -> &str {
        split_qname(&self.name).1
    }

    /// Get the prefix of the element, if any
    pub fn prefix(&self) -> Option<&str> {
        split_qname(&self.name).0
    }

    /// Get an attribute value by exact name
    pub fn get_attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Get an attribute by name, falling back to a prefix-insensitive scan
    pub fn find_attribute(&self, name: &str) -> Option<&str> {
        let local = split_qname(name).1;
        self.get_attribute(name).or_else(|| {
            self.attributes
                .iter()
                .find(|(key, _)| split_qname(key).1 == local)
                .map(|(_, value)| value.as_str())
        })
    }

    /// Text content, empty when the element has none
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    /// Add a child element
    pub fn add_child(&mut self, child: Element) {
        self.children.push(child);
    }

    /// Find child elements by local name, in document order
    pub fn find_children<'a>(&'a self, local_name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children
            .iter()
            .filter(move |e| e.local_name() == local_name)
    }

    fn append_text(&mut self, text: &str) {
        match self.text.as_mut() {
            Some(existing) => existing.push_str(text),
            None => self.text = Some(text.to_string()),
        }
    }
}

/// XML Document representation
#[derive(Debug, Default)]
pub struct Document {
    /// Root element of the document
    pub root: Option<Element>,
}

impl Document {
    /// Create a new empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an XML document from a string
    pub fn from_string(xml: &str) -> Result<Self> {
        Self::parse(xml.as_bytes())
    }

    /// Parse an XML document from bytes
    pub fn parse(xml: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(xml);
        reader.trim_text(false);

        let mut doc = Document::new();
        let mut element_stack: Vec<Element> = Vec::new();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    let element = Self::parse_element(&e)?;
                    element_stack.push(element);
                }
                Ok(Event::End(_)) => {
                    if let Some(current) = element_stack.pop() {
                        Self::attach(&mut doc, &mut element_stack, current)?;
                    }
                }
                Ok(Event::Empty(e)) => {
                    let element = Self::parse_element(&e)?;
                    Self::attach(&mut doc, &mut element_stack, element)?;
                }
                Ok(Event::Text(e)) => {
                    if let Some(current) = element_stack.last_mut() {
                        let text = e
                            .unescape()
                            .map_err(|e| Error::Xml(format!("Failed to unescape text: {}", e)))?;
                        current.append_text(&text);
                    }
                }
                Ok(Event::CData(e)) => {
                    if let Some(current) = element_stack.last_mut() {
                        let text = std::str::from_utf8(e.as_ref())
                            .map_err(|e| Error::Xml(format!("Invalid CDATA section: {}", e)))?;
                        current.append_text(text);
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::Xml(format!(
                        "Error parsing XML at position {}: {}",
                        reader.buffer_position(),
                        e
                    )))
                }
                _ => {} // Comments, processing instructions, declarations
            }
            buf.clear();
        }

        if let Some(unclosed) = element_stack.last() {
            return Err(Error::Xml(format!("Unclosed element <{}>", unclosed.name)));
        }

        Ok(doc)
    }

    fn attach(doc: &mut Document, stack: &mut [Element], element: Element) -> Result<()> {
        if let Some(parent) = stack.last_mut() {
            parent.add_child(element);
        } else if doc.root.is_some() {
            return Err(Error::Xml(format!(
                "Unexpected second root element <{}>",
                element.name
            )));
        } else {
            doc.root = Some(element);
        }
        Ok(())
    }

    /// Parse element from BytesStart event
    fn parse_element(start: &BytesStart) -> Result<Element> {
        let name_bytes = start.name();
        let name = std::str::from_utf8(name_bytes.as_ref())
            .map_err(|e| Error::Xml(format!("Invalid element name: {}", e)))?;

        let mut element = Element::new(name);

        for attr_result in start.attributes() {
            let attr = attr_result
                .map_err(|e| Error::Xml(format!("Failed to parse attribute: {}", e)))?;

            let attr_name = std::str::from_utf8(attr.key.as_ref())
                .map_err(|e| Error::Xml(format!("Invalid attribute name: {}", e)))?;

            let attr_value = attr
                .unescape_value()
                .map_err(|e| Error::Xml(format!("Failed to unescape attribute value: {}", e)))?
                .to_string();

            if attr_name == "xmlns" {
                element.namespaces.insert(String::new(), attr_value);
            } else if let Some(prefix) = attr_name.strip_prefix("xmlns:") {
                element.namespaces.insert(prefix.to_string(), attr_value);
            } else {
                element.attributes.insert(attr_name.to_string(), attr_value);
            }
        }

        Ok(element)
    }

    /// Get the root element
    pub fn root(&self) -> Option<&Element> {
        self.root.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_xml() {
        let xml = r#"<root><child>text</child></root>"#;
        let doc = Document::from_string(xml).unwrap();

        let root = doc.root().unwrap();
        assert_eq!(root.local_name(), "root");
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.children[0].local_name(), "child");
        assert_eq!(root.children[0].text(), "text");
    }

    #[test]
    fn test_text_is_kept_verbatim() {
        let xml = "<root><a>  padded &amp; escaped </a><b/></root>";
        let doc = Document::from_string(xml).unwrap();
        let root = doc.root().unwrap();
        assert_eq!(root.children[0].text(), "  padded & escaped ");
        assert_eq!(root.children[1].text(), "");
    }

    #[test]
    fn test_prefixed_names_and_attributes() {
        let xml = r#"<p:root xmlns:p="http://example.com" p:id="7" plain="x"/>"#;
        let doc = Document::from_string(xml).unwrap();

        let root = doc.root().unwrap();
        assert_eq!(root.local_name(), "root");
        assert_eq!(root.prefix(), Some("p"));
        assert_eq!(root.get_attribute("id"), None);
        assert_eq!(root.find_attribute("id"), Some("7"));
        assert_eq!(root.find_attribute("plain"), Some("x"));
        assert_eq!(
            root.namespaces.get("p").map(String::as_str),
            Some("http://example.com")
        );
    }

    #[test]
    fn test_find_children() {
        let xml = r#"<root><child1/><child2/><x:child1 xmlns:x="urn:x"/></root>"#;
        let doc = Document::from_string(xml).unwrap();

        let root = doc.root().unwrap();
        assert_eq!(root.find_children("child1").count(), 2);
    }

    #[test]
    fn test_empty_input_has_no_root() {
        let doc = Document::from_string("<?xml version=\"1.0\"?>").unwrap();
        assert!(doc.root().is_none());
    }

    #[test]
    fn test_mismatched_tags_fail() {
        assert!(matches!(
            Document::from_string("<a><b></a>"),
            Err(Error::Xml(_))
        ));
    }
}
