use std::collections::HashSet;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::model::{ComplexType, Element, Schema};
use crate::walker::{ContentScope, Found, TypeRef, Walker};

use super::{scalars, BuildOptions, TEXT_KEY};

pub(crate) struct Encoder<'w, 'a> {
    walker: &'w Walker<'a>,
    options: &'w BuildOptions,
    writer: Writer<Vec<u8>>,
    /// Prefix applied to child elements of a qualified schema
    child_prefix: Option<String>,
}

impl<'w, 'a> Encoder<'w, 'a> {
    pub(crate) fn new(walker: &'w Walker<'a>, options: &'w BuildOptions) -> Self {
        let writer = if options.pretty {
            Writer::new_with_indent(Vec::new(), b' ', options.indent)
        } else {
            Writer::new(Vec::new())
        };
        Self {
            walker,
            options,
            writer,
            child_prefix: None,
        }
    }

    pub(crate) fn encode(mut self, value: &Value) -> Result<String> {
        let options = self.options;
        let root = self.root_declaration(value)?;

        if options.xml_declaration {
            self.write(Event::Decl(BytesDecl::new(
                "1.0",
                Some(options.encoding.as_str()),
                None,
            )))?;
        }

        let (tag, namespace_attr) = self.root_naming(root.item, root.schema);
        self.element(&tag, value, root.item, root.schema, namespace_attr, 0)?;

        String::from_utf8(self.writer.into_inner())
            .map_err(|e| Error::Encode(format!("output is not valid UTF-8: {}", e)))
    }

    /// Pick the top-level element whose members cover the most keys of
    /// `value`; the earliest declaration wins a tie
    fn root_declaration(&self, value: &Value) -> Result<Found<'a, Element>> {
        let candidates: Vec<_> = self.walker.elements().filter(|e| !e.item.is_abstract).collect();
        if candidates.is_empty() {
            return Err(Error::Schema("no top-level element to build from".to_string()));
        }

        let Value::Object(object) = value else {
            for candidate in &candidates {
                if !matches!(
                    self.walker.element_type(candidate.item, candidate.schema)?,
                    TypeRef::Complex(_)
                ) {
                    return Ok(*candidate);
                }
            }
            return Err(Error::Encode(
                "a scalar value needs a top-level element of simple type".to_string(),
            ));
        };

        let mut best: Option<(Found<'a, Element>, usize)> = None;
        let mut tied = 0;
        for candidate in &candidates {
            let TypeRef::Complex(found) = self.walker.element_type(candidate.item, candidate.schema)? else {
                continue;
            };
            let members = self.member_names(found.item, found.schema)?;
            let overlap = object.keys().filter(|key| members.contains(key.as_str())).count();
            match best {
                Some((_, score)) if overlap == score => tied += 1,
                Some((_, score)) if overlap < score => {}
                _ => {
                    best = Some((*candidate, overlap));
                    tied = 0;
                }
            }
        }

        let (chosen, overlap) = best.ok_or_else(|| {
            Error::Encode("an object value needs a top-level element of complex type".to_string())
        })?;
        tracing::debug!(
            "building <{}>: {} of {} key(s) matched, {} other candidate(s) tied",
            chosen.item.effective_name(),
            overlap,
            object.len(),
            tied
        );
        Ok(chosen)
    }

    fn member_names(&self, ct: &'a ComplexType, ctx: &'a Schema) -> Result<HashSet<&'a str>> {
        let mut names: HashSet<&'a str> = self
            .walker
            .complex_attributes(ct, ctx, ContentScope::Inherited)?
            .into_iter()
            .map(|a| a.name)
            .collect();
        names.extend(
            self.walker
                .complex_elements(ct, ctx, ContentScope::Inherited)?
                .into_iter()
                .map(|e| e.name),
        );
        if ct.has_simple_content() {
            names.insert(TEXT_KEY);
        }
        Ok(names)
    }

    /// Root tag and its namespace declaration
    fn root_naming(&mut self, decl: &Element, schema: &Schema) -> (String, Option<(String, String)>) {
        let Some(namespace) = schema.target_namespace.as_deref() else {
            return (decl.effective_name().to_string(), None);
        };
        let options = self.options;
        let prefix = options
            .namespace_prefix
            .as_deref()
            .or_else(|| schema.target_prefix())
            .filter(|p| !p.is_empty());
        match prefix {
            Some(prefix) => {
                if schema.element_form_qualified {
                    self.child_prefix = Some(prefix.to_string());
                }
                (
                    format!("{}:{}", prefix, decl.effective_name()),
                    Some((format!("xmlns:{}", prefix), namespace.to_string())),
                )
            }
            None => (
                decl.effective_name().to_string(),
                Some(("xmlns".to_string(), namespace.to_string())),
            ),
        }
    }

    fn child_tag(&self, name: &str) -> String {
        match &self.child_prefix {
            Some(prefix) => format!("{}:{}", prefix, name),
            None => name.to_string(),
        }
    }

    fn element(
        &mut self,
        tag: &str,
        value: &Value,
        decl: &'a Element,
        ctx: &'a Schema,
        extra: Option<(String, String)>,
        depth: usize,
    ) -> Result<()> {
        self.walker.limits().check_xml_depth(depth)?;
        let mut start = BytesStart::new(tag);
        if let Some((key, uri)) = &extra {
            start.push_attribute((key.as_str(), uri.as_str()));
        }

        match self.walker.element_type(decl, ctx)? {
            TypeRef::Complex(found) => {
                let Value::Object(object) = value else {
                    return Err(Error::Encode(format!(
                        "<{}> has complex type and needs an object value",
                        tag
                    )));
                };
                self.complex(start, object, found.item, found.schema, depth)
            }
            other => {
                let text = scalars::encode(value, self.walker.scalar_of(other)?)?;
                self.write(Event::Start(start))?;
                self.write(Event::Text(BytesText::new(&text)))?;
                self.write(Event::End(BytesEnd::new(tag)))
            }
        }
    }

    fn complex(
        &mut self,
        mut start: BytesStart<'_>,
        object: &Map<String, Value>,
        ct: &'a ComplexType,
        ctx: &'a Schema,
        depth: usize,
    ) -> Result<()> {
        for attribute in self.walker.complex_attributes(ct, ctx, ContentScope::Inherited)? {
            let Some(value) = object.get(attribute.name).filter(|v| !v.is_null()) else {
                continue;
            };
            let scalar = self
                .walker
                .scalar_of(self.walker.attribute_type(attribute.decl, attribute.schema)?)?;
            let text = scalars::encode(value, scalar)?;
            start.push_attribute((attribute.name, text.as_str()));
        }

        let text = match (self.walker.content_scalar(ct, ctx)?, object.get(TEXT_KEY)) {
            (Some(scalar), Some(value)) if !value.is_null() => Some(scalars::encode(value, scalar)?),
            _ => None,
        };

        let mut written = HashSet::new();
        let mut children = Vec::new();
        for member in self.walker.complex_elements(ct, ctx, ContentScope::Inherited)? {
            if !written.insert(member.name) {
                continue;
            }
            match object.get(member.name) {
                None | Some(Value::Null) => {}
                Some(Value::Array(items)) if member.array => {
                    children.extend(items.iter().filter(|v| !v.is_null()).map(|item| (member, item)));
                }
                Some(value) => children.push((member, value)),
            }
        }

        if text.is_none() && children.is_empty() {
            return self.write(Event::Empty(start));
        }

        let end = start.to_end().into_owned();
        self.write(Event::Start(start))?;
        if let Some(text) = &text {
            self.write(Event::Text(BytesText::new(text)))?;
        }
        for (member, value) in children {
            let tag = self.child_tag(member.name);
            self.element(&tag, value, member.decl, member.schema, None, depth + 1)?;
        }
        self.write(Event::End(end))
    }

    fn write(&mut self, event: Event<'_>) -> Result<()> {
        self.writer.write_event(event)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::{build, parse, BuildOptions};
    use crate::model::{Attribute, ComplexType, Element, Particle, Schema};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_root_chosen_by_key_overlap() {
        let schema = Schema::new()
            .with_element(Element::new("cat").with_complex_type(ComplexType::anonymous().with_sequence(vec![
                Particle::element(Element::new("name").with_type("xs:string")),
            ])))
            .with_element(Element::new("dog").with_complex_type(ComplexType::anonymous().with_sequence(vec![
                Particle::element(Element::new("name").with_type("xs:string")),
                Particle::element(Element::new("breed").with_type("xs:string")),
            ])));
        let xml = build(&schema, &json!({"name": "Rex", "breed": "lab"}), &BuildOptions::compact()).unwrap();
        assert_eq!(xml, "<dog><name>Rex</name><breed>lab</breed></dog>");

        // tie goes to the first declaration
        let xml = build(&schema, &json!({"name": "Tom"}), &BuildOptions::compact()).unwrap();
        assert_eq!(xml, "<cat><name>Tom</name></cat>");
    }

    #[test]
    fn test_prefixed_qualified_namespace() {
        let schema = Schema::new()
            .with_target_namespace("http://www.sap.com/abapxml")
            .with_prefix("asx", "http://www.sap.com/abapxml")
            .qualified()
            .with_element(Element::new("abap").with_complex_type(
                ComplexType::anonymous()
                    .with_attribute(Attribute::new("version", "xs:string"))
                    .with_sequence(vec![Particle::element(Element::new("values").with_type("xs:string"))]),
            ));
        let value = json!({"version": "1.0", "values": "x"});
        let xml = build(&schema, &value, &BuildOptions::compact()).unwrap();
        assert_eq!(
            xml,
            r#"<asx:abap xmlns:asx="http://www.sap.com/abapxml" version="1.0"><asx:values>x</asx:values></asx:abap>"#
        );
        assert_eq!(parse(&schema, &xml).unwrap(), value);
    }

    #[test]
    fn test_default_namespace_without_prefix() {
        let schema = Schema::new()
            .with_target_namespace("urn:plain")
            .with_element(Element::new("item").with_type("xs:string"));
        let xml = build(&schema, &json!("a & b"), &BuildOptions::compact()).unwrap();
        assert_eq!(xml, r#"<item xmlns="urn:plain">a &amp; b</item>"#);
        assert_eq!(parse(&schema, &xml).unwrap(), json!("a & b"));
    }

    #[test]
    fn test_empty_complex_value_is_self_closing() {
        let schema = Schema::new().with_element(Element::new("flags").with_complex_type(
            ComplexType::anonymous()
                .with_sequence(vec![Particle::element(Element::new("on").with_type("xs:boolean").optional())]),
        ));
        let xml = build(&schema, &json!({}), &BuildOptions::compact()).unwrap();
        assert_eq!(xml, "<flags/>");
        assert_eq!(parse(&schema, &xml).unwrap(), json!({}));
    }

    #[test]
    fn test_wrong_shape_is_an_encode_error() {
        let schema = Schema::new()
            .with_element(Element::new("box").with_complex_type(ComplexType::anonymous().with_sequence(vec![
                Particle::element(Element::new("inner").with_complex_type(ComplexType::anonymous())),
            ])));
        let err = build(&schema, &json!({"inner": 5}), &BuildOptions::compact()).unwrap_err();
        assert!(matches!(err, crate::error::Error::Encode(_)));
    }
}
