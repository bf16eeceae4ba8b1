use serde_json::{Map, Value};

use crate::documents::{Document, Element as Node};
use crate::error::{Error, Result};
use crate::model::{ComplexType, Element, Schema};
use crate::walker::{ContentScope, Found, TypeRef, Walker};

use super::{scalars, TEXT_KEY};

pub(crate) struct Decoder<'w, 'a> {
    walker: &'w Walker<'a>,
}

impl<'w, 'a> Decoder<'w, 'a> {
    pub(crate) fn new(walker: &'w Walker<'a>) -> Self {
        Self { walker }
    }

    pub(crate) fn decode(&self, xml: &str) -> Result<Value> {
        self.walker.limits().check_xml_size(xml.len())?;
        let document = Document::from_string(xml)?;
        let root = document
            .root()
            .ok_or_else(|| Error::Document("document has no root element".to_string()))?;
        let decl = self.root_declaration(root.local_name()).ok_or_else(|| {
            Error::Document(format!(
                "root element <{}> matches no top-level element declaration",
                root.name
            ))
        })?;
        tracing::debug!("decoding <{}> as element '{}'", root.name, decl.item.effective_name());
        self.element(root, decl.item, decl.schema, 0)
    }

    /// Exact name first, then a case-insensitive match
    fn root_declaration(&self, name: &str) -> Option<Found<'a, Element>> {
        let candidates: Vec<_> = self.walker.elements().filter(|e| !e.item.is_abstract).collect();
        candidates
            .iter()
            .find(|e| e.item.effective_name() == name)
            .or_else(|| candidates.iter().find(|e| e.item.effective_name().eq_ignore_ascii_case(name)))
            .copied()
    }

    fn element(&self, node: &Node, decl: &'a Element, ctx: &'a Schema, depth: usize) -> Result<Value> {
        self.walker.limits().check_xml_depth(depth)?;
        match self.walker.element_type(decl, ctx)? {
            TypeRef::Complex(found) => self.complex(node, found.item, found.schema, depth),
            other => Ok(scalars::decode(node.text(), self.walker.scalar_of(other)?)),
        }
    }

    fn complex(&self, node: &Node, ct: &'a ComplexType, ctx: &'a Schema, depth: usize) -> Result<Value> {
        let mut object = Map::new();

        for attribute in self.walker.complex_attributes(ct, ctx, ContentScope::Inherited)? {
            let Some(text) = node.find_attribute(attribute.name) else {
                continue;
            };
            let scalar = self
                .walker
                .scalar_of(self.walker.attribute_type(attribute.decl, attribute.schema)?)?;
            object.insert(attribute.name.to_string(), scalars::decode(text, scalar));
        }

        if let Some(scalar) = self.walker.content_scalar(ct, ctx)? {
            object.insert(TEXT_KEY.to_string(), scalars::decode(node.text(), scalar));
        }

        for member in self.walker.complex_elements(ct, ctx, ContentScope::Inherited)? {
            if object.contains_key(member.name) {
                continue;
            }
            let mut children = node.find_children(member.name);
            if member.array {
                let items = children
                    .map(|child| self.element(child, member.decl, member.schema, depth + 1))
                    .collect::<Result<Vec<_>>>()?;
                if !items.is_empty() {
                    object.insert(member.name.to_string(), Value::Array(items));
                }
            } else if let Some(child) = children.next() {
                let value = self.element(child, member.decl, member.schema, depth + 1)?;
                object.insert(member.name.to_string(), value);
            }
        }

        Ok(Value::Object(object))
    }
}
