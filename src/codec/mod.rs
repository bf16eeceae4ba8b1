//! Schema-driven XML codec
//!
//! Converts instance documents to `serde_json::Value` trees and back, using
//! the schema (not the document) to decide the shape of every value:
//!
//! - complex elements become objects; attributes and child elements share
//!   one key space, and the text of a simpleContent type sits under `$`
//! - elements that may repeat always become arrays, even with one item
//! - absent optional members are absent keys, never `null`
//! - scalars follow their built-in kind (numbers, booleans, lists); dates
//!   and everything textual stay strings
//! - a substitute in place of an abstract element is keyed by its own name
//!
//! `parse(build(v))` returns `v` for any value shaped by the schema, and
//! `build(parse(x))` is stable after the first pass.

mod decode;
mod encode;
pub mod scalars;

use serde::Deserialize;
use serde_json::Value;

use crate::error::Result;
use crate::limits::Limits;
use crate::model::Schema;
use crate::walker::Walker;

/// Key holding the text content of a simpleContent type
pub const TEXT_KEY: &str = "$";

/// Options controlling XML output
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BuildOptions {
    /// Write an `<?xml ...?>` declaration
    pub xml_declaration: bool,
    /// Encoding named in the declaration
    pub encoding: String,
    /// Indent nested elements
    pub pretty: bool,
    /// Spaces per indentation level
    pub indent: usize,
    /// Prefix for the target namespace; defaults to the prefix the schema
    /// binds to it, or a default namespace declaration when there is none
    pub namespace_prefix: Option<String>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            xml_declaration: true,
            encoding: "UTF-8".to_string(),
            pretty: true,
            indent: 2,
            namespace_prefix: None,
        }
    }
}

impl BuildOptions {
    /// Create default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Compact output: no declaration, no indentation
    pub fn compact() -> Self {
        Self {
            xml_declaration: false,
            pretty: false,
            ..Self::default()
        }
    }

    /// Set whether the XML declaration is written
    pub fn with_xml_declaration(mut self, enabled: bool) -> Self {
        self.xml_declaration = enabled;
        self
    }

    /// Set the declared encoding
    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = encoding.into();
        self
    }

    /// Set pretty printing
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Set the indentation width
    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    /// Set the target namespace prefix
    pub fn with_namespace_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.namespace_prefix = Some(prefix.into());
        self
    }
}

/// Codec bound to one schema
#[derive(Debug, Clone)]
pub struct Codec<'a> {
    schema: &'a Schema,
    limits: Limits,
}

impl<'a> Codec<'a> {
    /// Create a codec for `schema`
    pub fn new(schema: &'a Schema) -> Self {
        Self {
            schema,
            limits: Limits::default(),
        }
    }

    /// Set processing limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Decode an instance document
    pub fn parse(&self, xml: &str) -> Result<Value> {
        let walker = Walker::with_limits(self.schema, self.limits.clone());
        decode::Decoder::new(&walker).decode(xml)
    }

    /// Encode a value as an instance document
    pub fn build(&self, value: &Value, options: &BuildOptions) -> Result<String> {
        let walker = Walker::with_limits(self.schema, self.limits.clone());
        encode::Encoder::new(&walker, options).encode(value)
    }
}

/// Decode an instance document of `schema`
pub fn parse(schema: &Schema, xml: &str) -> Result<Value> {
    Codec::new(schema).parse(xml)
}

/// Encode `value` as an instance document of `schema`
pub fn build(schema: &Schema, value: &Value, options: &BuildOptions) -> Result<String> {
    Codec::new(schema).build(value, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::model::{Attribute, ComplexType, Element, Particle};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn person_schema() -> Schema {
        Schema::new()
            .with_element(Element::new("person").with_type("PersonType"))
            .with_complex_type(
                ComplexType::new("PersonType")
                    .with_attribute(Attribute::new("id", "xs:string"))
                    .with_sequence(vec![
                        Particle::element(Element::new("firstName").with_type("xs:string")),
                        Particle::element(Element::new("age").with_type("xs:int").optional()),
                        Particle::element(Element::new("email").with_type("xs:string").unbounded()),
                    ]),
            )
    }

    #[test]
    fn test_parse_person() {
        let xml = r#"<person id="p1"><firstName>Ada</firstName><age>36</age><email>a@x.org</email></person>"#;
        let value = parse(&person_schema(), xml).unwrap();
        assert_eq!(
            value,
            json!({"id": "p1", "firstName": "Ada", "age": 36, "email": ["a@x.org"]})
        );
    }

    #[test]
    fn test_build_compact() {
        let value = json!({"firstName": "Ada", "email": ["a", "b"]});
        let xml = build(&person_schema(), &value, &BuildOptions::compact()).unwrap();
        assert_eq!(
            xml,
            "<person><firstName>Ada</firstName><email>a</email><email>b</email></person>"
        );
    }

    #[test]
    fn test_build_pretty_with_declaration() {
        let value = json!({"id": "p1", "firstName": "Ada"});
        let xml = build(&person_schema(), &value, &BuildOptions::default()).unwrap();
        assert_eq!(
            xml,
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<person id=\"p1\">\n  <firstName>Ada</firstName>\n</person>"
        );
    }

    #[test]
    fn test_unknown_root_is_rejected() {
        let err = parse(&person_schema(), "<robot/>").unwrap_err();
        assert!(matches!(err, Error::Document(_)));
    }

    #[test]
    fn test_options_deserialize() {
        let options: BuildOptions =
            serde_json::from_str(r#"{"pretty": false, "namespacePrefix": "ag"}"#).unwrap();
        assert!(!options.pretty);
        assert!(options.xml_declaration);
        assert_eq!(options.namespace_prefix.as_deref(), Some("ag"));
    }
}
