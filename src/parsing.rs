//! XSD Document Parsing
//!
//! This module reads XSD source text into a [`Schema`]. It performs no I/O:
//! `xs:import` and `xs:include` become unbound [`SchemaLink`]s that a loader
//! binds once the referenced documents are parsed. QNames are kept as written
//! and resolved later against the schema's prefix table.

use crate::documents::{Document, Element as Node};
use crate::error::{Error, ParseError, Result};
use crate::model::{
    parse_occurs, Attribute, AttributeGroup, AttributeUse, ComplexType, Compositor, ContentKind,
    Derivation, DerivationMethod, Element, Group, GroupRef, List, ModelGroup, Occurs, Particle,
    Restriction, Schema, SchemaLink, SimpleType, SimpleVariety, Union, Wildcard,
};

/// XSD element local names
mod xsd_elements {
    pub const SCHEMA: &str = "schema";
    pub const ELEMENT: &str = "element";
    pub const COMPLEX_TYPE: &str = "complexType";
    pub const SIMPLE_TYPE: &str = "simpleType";
    pub const ATTRIBUTE: &str = "attribute";
    pub const ATTRIBUTE_GROUP: &str = "attributeGroup";
    pub const GROUP: &str = "group";
    pub const SEQUENCE: &str = "sequence";
    pub const CHOICE: &str = "choice";
    pub const ALL: &str = "all";
    pub const ANNOTATION: &str = "annotation";
    pub const IMPORT: &str = "import";
    pub const INCLUDE: &str = "include";
    pub const RESTRICTION: &str = "restriction";
    pub const EXTENSION: &str = "extension";
    pub const LIST: &str = "list";
    pub const UNION: &str = "union";
    pub const COMPLEX_CONTENT: &str = "complexContent";
    pub const SIMPLE_CONTENT: &str = "simpleContent";
    pub const ANY: &str = "any";
    pub const ANY_ATTRIBUTE: &str = "anyAttribute";
    pub const ENUMERATION: &str = "enumeration";
}

/// XSD attribute names
mod xsd_attrs {
    pub const NAME: &str = "name";
    pub const TYPE: &str = "type";
    pub const REF: &str = "ref";
    pub const TARGET_NAMESPACE: &str = "targetNamespace";
    pub const ELEMENT_FORM_DEFAULT: &str = "elementFormDefault";
    pub const ABSTRACT: &str = "abstract";
    pub const SUBSTITUTION_GROUP: &str = "substitutionGroup";
    pub const MIN_OCCURS: &str = "minOccurs";
    pub const MAX_OCCURS: &str = "maxOccurs";
    pub const MIXED: &str = "mixed";
    pub const BASE: &str = "base";
    pub const VALUE: &str = "value";
    pub const ITEM_TYPE: &str = "itemType";
    pub const MEMBER_TYPES: &str = "memberTypes";
    pub const USE: &str = "use";
    pub const DEFAULT: &str = "default";
    pub const FIXED: &str = "fixed";
    pub const NAMESPACE: &str = "namespace";
    pub const SCHEMA_LOCATION: &str = "schemaLocation";
}

/// Parse XSD source text into a schema
pub fn parse_schema(text: &str) -> Result<Schema> {
    let doc = Document::from_string(text)?;
    let root = doc
        .root()
        .ok_or_else(|| Error::Parse(ParseError::new("Empty document")))?;

    if root.local_name() != xsd_elements::SCHEMA {
        return Err(Error::Parse(ParseError::new(format!(
            "Expected xs:schema root element, got {}",
            root.local_name()
        ))));
    }

    let mut schema = Schema::new();
    schema.namespaces = root.namespaces.clone();
    schema.target_namespace = root
        .get_attribute(xsd_attrs::TARGET_NAMESPACE)
        .map(str::to_string);
    schema.element_form_qualified =
        root.get_attribute(xsd_attrs::ELEMENT_FORM_DEFAULT) == Some("qualified");

    for child in &root.children {
        parse_schema_child(&mut schema, child)?;
    }

    tracing::debug!(
        "parsed schema '{}': {} element(s), {} complex type(s), {} simple type(s)",
        schema.label(),
        schema.elements.len(),
        schema.complex_types.len(),
        schema.simple_types.len()
    );
    Ok(schema)
}

/// Parse XSD source text and record the file it came from
pub fn parse_schema_file_contents(text: &str, filename: impl Into<String>) -> Result<Schema> {
    let filename = filename.into();
    let mut schema = parse_schema(text).map_err(|err| match err {
        Error::Parse(parse) => Error::Parse(parse.with_location(filename.clone())),
        other => other,
    })?;
    schema.filename = Some(filename);
    Ok(schema)
}

fn parse_schema_child(schema: &mut Schema, elem: &Node) -> Result<()> {
    match elem.local_name() {
        xsd_elements::ELEMENT => {
            let element = parse_element(elem)?;
            let name = required_name(elem, "Global element")?;
            insert_global(&mut schema.elements, name, element, "element");
        }
        xsd_elements::COMPLEX_TYPE => {
            let name = required_name(elem, "Global complexType")?;
            let complex_type = parse_complex_type(elem)?;
            insert_global(&mut schema.complex_types, name, complex_type, "complex type");
        }
        xsd_elements::SIMPLE_TYPE => {
            let name = required_name(elem, "Global simpleType")?;
            let simple_type = parse_simple_type(elem)?;
            insert_global(&mut schema.simple_types, name, simple_type, "simple type");
        }
        xsd_elements::ATTRIBUTE => {
            let name = required_name(elem, "Global attribute")?;
            let attribute = parse_attribute(elem)?;
            insert_global(&mut schema.attributes, name, attribute, "attribute");
        }
        xsd_elements::ATTRIBUTE_GROUP => {
            let name = required_name(elem, "Global attributeGroup")?;
            let group = parse_attribute_group(elem)?;
            insert_global(&mut schema.attribute_groups, name, group, "attribute group");
        }
        xsd_elements::GROUP => {
            let name = required_name(elem, "Global group")?;
            let group = parse_group(elem)?;
            insert_global(&mut schema.groups, name, group, "group");
        }
        xsd_elements::IMPORT => schema.imports.push(SchemaLink::new(
            elem.get_attribute(xsd_attrs::NAMESPACE).map(str::to_string),
            elem.get_attribute(xsd_attrs::SCHEMA_LOCATION).map(str::to_string),
        )),
        xsd_elements::INCLUDE => schema.includes.push(SchemaLink::new(
            None,
            elem.get_attribute(xsd_attrs::SCHEMA_LOCATION).map(str::to_string),
        )),
        xsd_elements::ANNOTATION => {}
        other => tracing::debug!("skipping unsupported schema child <{}>", other),
    }
    Ok(())
}

fn required_name(elem: &Node, what: &str) -> Result<String> {
    elem.get_attribute(xsd_attrs::NAME)
        .map(str::to_string)
        .ok_or_else(|| Error::Parse(ParseError::new(format!("{} missing 'name' attribute", what))))
}

fn insert_global<T>(table: &mut indexmap::IndexMap<String, T>, name: String, item: T, kind: &str) {
    if table.contains_key(&name) {
        tracing::warn!("duplicate {} '{}' ignored; the first declaration is kept", kind, name);
        return;
    }
    table.insert(name, item);
}

fn parse_occurs_attrs(elem: &Node) -> Result<Occurs> {
    let min = elem.get_attribute(xsd_attrs::MIN_OCCURS);
    let max = elem.get_attribute(xsd_attrs::MAX_OCCURS);
    parse_occurs(min, max).ok_or_else(|| {
        Error::Parse(ParseError::new(format!(
            "Invalid occurrence bounds minOccurs={:?} maxOccurs={:?} on <{}>",
            min.unwrap_or("1"),
            max.unwrap_or("1"),
            elem.name
        )))
    })
}

fn is_true(elem: &Node, attr: &str) -> bool {
    matches!(elem.get_attribute(attr), Some("true") | Some("1"))
}

/// Element declaration, global or local, or an element reference
fn parse_element(elem: &Node) -> Result<Element> {
    let mut element = Element {
        name: elem.get_attribute(xsd_attrs::NAME).map(str::to_string),
        reference: elem.get_attribute(xsd_attrs::REF).map(str::to_string),
        type_name: elem.get_attribute(xsd_attrs::TYPE).map(str::to_string),
        is_abstract: is_true(elem, xsd_attrs::ABSTRACT),
        substitution_group: elem
            .get_attribute(xsd_attrs::SUBSTITUTION_GROUP)
            .map(str::to_string),
        occurs: parse_occurs_attrs(elem)?,
        ..Default::default()
    };

    if element.name.is_none() && element.reference.is_none() {
        return Err(Error::Parse(ParseError::new(
            "Element declaration needs a 'name' or 'ref' attribute",
        )));
    }

    for child in &elem.children {
        match child.local_name() {
            xsd_elements::COMPLEX_TYPE => {
                element.complex_type = Some(Box::new(parse_complex_type(child)?));
            }
            xsd_elements::SIMPLE_TYPE => {
                element.simple_type = Some(Box::new(parse_simple_type(child)?));
            }
            _ => {}
        }
    }
    Ok(element)
}

fn parse_complex_type(elem: &Node) -> Result<ComplexType> {
    let mut complex_type = ComplexType {
        name: elem.get_attribute(xsd_attrs::NAME).map(str::to_string),
        mixed: is_true(elem, xsd_attrs::MIXED),
        is_abstract: is_true(elem, xsd_attrs::ABSTRACT),
        ..Default::default()
    };

    for child in &elem.children {
        match child.local_name() {
            xsd_elements::COMPLEX_CONTENT => {
                complex_type.mixed |= is_true(child, xsd_attrs::MIXED);
                parse_derivation(&mut complex_type, child, ContentKind::Complex)?;
            }
            xsd_elements::SIMPLE_CONTENT => {
                parse_derivation(&mut complex_type, child, ContentKind::Simple)?;
            }
            _ => parse_type_member(&mut complex_type, child)?,
        }
    }
    Ok(complex_type)
}

/// complexContent / simpleContent wrapper holding one restriction or extension
fn parse_derivation(complex_type: &mut ComplexType, wrapper: &Node, content: ContentKind) -> Result<()> {
    let Some(step) = wrapper.children.iter().find(|c| {
        matches!(
            c.local_name(),
            xsd_elements::RESTRICTION | xsd_elements::EXTENSION
        )
    }) else {
        return Err(Error::Parse(ParseError::new(format!(
            "<{}> needs a restriction or extension",
            wrapper.name
        ))));
    };

    let method = DerivationMethod::from_tag(step.local_name()).unwrap_or_default();
    let base = step.get_attribute(xsd_attrs::BASE).ok_or_else(|| {
        Error::Parse(ParseError::new(format!(
            "<{}> missing 'base' attribute",
            step.name
        )))
    })?;
    complex_type.derivation = Some(Derivation {
        content,
        method,
        base: base.to_string(),
    });

    for child in &step.children {
        parse_type_member(complex_type, child)?;
    }
    Ok(())
}

/// Content model, attribute, attribute group or wildcard of a complex type
fn parse_type_member(complex_type: &mut ComplexType, elem: &Node) -> Result<()> {
    match elem.local_name() {
        xsd_elements::SEQUENCE | xsd_elements::CHOICE | xsd_elements::ALL => {
            complex_type.content = Some(parse_model_group(elem)?);
        }
        xsd_elements::GROUP => {
            let reference = parse_group_ref(elem)?;
            complex_type.content = Some(ModelGroup::sequence(vec![Particle::Group(reference)]));
        }
        xsd_elements::ATTRIBUTE => complex_type.attributes.push(parse_attribute(elem)?),
        xsd_elements::ATTRIBUTE_GROUP => {
            if let Some(reference) = elem.get_attribute(xsd_attrs::REF) {
                complex_type.attribute_groups.push(reference.to_string());
            }
        }
        xsd_elements::ANY_ATTRIBUTE => complex_type.any_attribute = true,
        _ => {}
    }
    Ok(())
}

fn parse_model_group(elem: &Node) -> Result<ModelGroup> {
    let compositor = Compositor::from_tag(elem.local_name()).unwrap_or_default();
    let mut model = ModelGroup::new(compositor);
    model.occurs = parse_occurs_attrs(elem)?;

    for child in &elem.children {
        let particle = match child.local_name() {
            xsd_elements::ELEMENT => Particle::Element(parse_element(child)?),
            xsd_elements::GROUP => Particle::Group(parse_group_ref(child)?),
            xsd_elements::SEQUENCE | xsd_elements::CHOICE | xsd_elements::ALL => {
                Particle::Model(parse_model_group(child)?)
            }
            xsd_elements::ANY => Particle::Any(Wildcard {
                namespace: child.get_attribute(xsd_attrs::NAMESPACE).map(str::to_string),
                occurs: parse_occurs_attrs(child)?,
            }),
            _ => continue,
        };
        model.particles.push(particle);
    }
    Ok(model)
}

fn parse_group_ref(elem: &Node) -> Result<GroupRef> {
    let reference = elem.get_attribute(xsd_attrs::REF).ok_or_else(|| {
        Error::Parse(ParseError::new("Group reference missing 'ref' attribute"))
    })?;
    Ok(GroupRef {
        reference: reference.to_string(),
        occurs: parse_occurs_attrs(elem)?,
    })
}

fn parse_group(elem: &Node) -> Result<Group> {
    let model = elem
        .children
        .iter()
        .find(|c| {
            matches!(
                c.local_name(),
                xsd_elements::SEQUENCE | xsd_elements::CHOICE | xsd_elements::ALL
            )
        })
        .map(parse_model_group)
        .transpose()?
        .unwrap_or_default();
    Ok(Group {
        name: elem.get_attribute(xsd_attrs::NAME).map(str::to_string),
        model,
    })
}

fn parse_simple_type(elem: &Node) -> Result<SimpleType> {
    let name = elem.get_attribute(xsd_attrs::NAME).map(str::to_string);

    for child in &elem.children {
        let variety = match child.local_name() {
            xsd_elements::RESTRICTION => SimpleVariety::Restriction(Restriction {
                base: child.get_attribute(xsd_attrs::BASE).map(str::to_string),
                simple_type: inline_simple_type(child)?,
                enumeration: child
                    .find_children(xsd_elements::ENUMERATION)
                    .filter_map(|e| e.get_attribute(xsd_attrs::VALUE))
                    .map(str::to_string)
                    .collect(),
            }),
            xsd_elements::LIST => SimpleVariety::List(List {
                item_type: child.get_attribute(xsd_attrs::ITEM_TYPE).map(str::to_string),
                simple_type: inline_simple_type(child)?,
            }),
            xsd_elements::UNION => SimpleVariety::Union(Union {
                member_types: child
                    .get_attribute(xsd_attrs::MEMBER_TYPES)
                    .map(|members| members.split_whitespace().map(str::to_string).collect())
                    .unwrap_or_default(),
                simple_types: child
                    .find_children(xsd_elements::SIMPLE_TYPE)
                    .map(parse_simple_type)
                    .collect::<Result<Vec<_>>>()?,
            }),
            _ => continue,
        };
        return Ok(SimpleType { name, variety });
    }

    Err(Error::Parse(ParseError::new(format!(
        "simpleType '{}' has no restriction, list or union",
        name.as_deref().unwrap_or("(anonymous)")
    ))))
}

fn inline_simple_type(elem: &Node) -> Result<Option<Box<SimpleType>>> {
    elem.find_children(xsd_elements::SIMPLE_TYPE)
        .next()
        .map(|st| parse_simple_type(st).map(Box::new))
        .transpose()
}

fn parse_attribute(elem: &Node) -> Result<Attribute> {
    let use_mode = match elem.get_attribute(xsd_attrs::USE) {
        Some("required") => AttributeUse::Required,
        Some("prohibited") => AttributeUse::Prohibited,
        _ => AttributeUse::Optional,
    };
    let attribute = Attribute {
        name: elem.get_attribute(xsd_attrs::NAME).map(str::to_string),
        reference: elem.get_attribute(xsd_attrs::REF).map(str::to_string),
        type_name: elem.get_attribute(xsd_attrs::TYPE).map(str::to_string),
        simple_type: inline_simple_type(elem)?,
        use_mode,
        default: elem.get_attribute(xsd_attrs::DEFAULT).map(str::to_string),
        fixed: elem.get_attribute(xsd_attrs::FIXED).map(str::to_string),
    };
    if attribute.name.is_none() && attribute.reference.is_none() {
        return Err(Error::Parse(ParseError::new(
            "Attribute declaration needs a 'name' or 'ref' attribute",
        )));
    }
    Ok(attribute)
}

fn parse_attribute_group(elem: &Node) -> Result<AttributeGroup> {
    let mut group = AttributeGroup {
        name: elem.get_attribute(xsd_attrs::NAME).map(str::to_string),
        ..Default::default()
    };
    for child in &elem.children {
        match child.local_name() {
            xsd_elements::ATTRIBUTE => group.attributes.push(parse_attribute(child)?),
            xsd_elements::ATTRIBUTE_GROUP => {
                if let Some(reference) = child.get_attribute(xsd_attrs::REF) {
                    group.attribute_groups.push(reference.to_string());
                }
            }
            _ => {}
        }
    }
    Ok(group)
}
