//! Shared schemas for the integration tests.
//!
//! Each builder returns a fresh schema so tests never share state. Not every
//! test binary uses every fixture.
#![allow(dead_code)]

use std::sync::Arc;

use serde_json::Value;
use xmlschema_bind::model::{
    Attribute, ComplexType, Element, ModelGroup, Particle, Schema, SchemaRef, SimpleType,
};
use xmlschema_bind::parsing::parse_schema;

pub const COMMON_NAMESPACE: &str = "urn:common";
pub const ABAPGIT_NAMESPACE: &str = "urn:abapgit";

/// `person` → `PersonType { @id, firstName, lastName }`
pub fn person_schema() -> Schema {
    Schema::new()
        .with_element(Element::new("person").with_type("PersonType"))
        .with_complex_type(
            ComplexType::new("PersonType")
                .with_attribute(Attribute::new("id", "xs:string"))
                .with_sequence(vec![
                    Particle::element(Element::new("firstName").with_type("xs:string")),
                    Particle::element(Element::new("lastName").with_type("xs:string")),
                ]),
        )
}

/// `order` with a nested customer record and repeated lines
pub fn order_schema() -> Schema {
    Schema::new()
        .with_element(Element::new("order").with_type("OrderType"))
        .with_complex_type(
            ComplexType::new("OrderType")
                .with_attribute(Attribute::new("number", "xs:int").required())
                .with_sequence(vec![
                    Particle::element(Element::new("placed").with_type("xs:date")),
                    Particle::element(Element::new("customer").with_type("CustomerType")),
                    Particle::element(Element::new("line").with_type("LineType").unbounded()),
                    Particle::element(Element::new("note").with_type("xs:string").optional()),
                ]),
        )
        .with_complex_type(ComplexType::new("CustomerType").with_sequence(vec![
            Particle::element(Element::new("name").with_type("xs:string")),
            Particle::element(Element::new("vip").with_type("xs:boolean").optional()),
        ]))
        .with_complex_type(
            ComplexType::new("LineType")
                .with_attribute(Attribute::new("sku", "xs:string").required())
                .with_sequence(vec![
                    Particle::element(Element::new("quantity").with_type("xs:positiveInteger")),
                    Particle::element(Element::new("price").with_type("PriceType")),
                ]),
        )
        .with_complex_type(
            ComplexType::new("PriceType")
                .with_simple_content("xs:decimal")
                .with_attribute(Attribute::new("currency", "xs:string")),
        )
}

/// Three-level extension chain `Base` → `Named` → `Product`
pub fn extension_schema() -> Schema {
    Schema::new()
        .with_element(Element::new("product").with_type("Product"))
        .with_complex_type(
            ComplexType::new("Base")
                .with_attribute(Attribute::new("id", "xs:string").required())
                .with_sequence(vec![Particle::element(Element::new("created").with_type("xs:dateTime"))]),
        )
        .with_complex_type(
            ComplexType::new("Named")
                .extending("Base")
                .with_sequence(vec![Particle::element(Element::new("title").with_type("xs:string"))]),
        )
        .with_complex_type(
            ComplexType::new("Product")
                .extending("Named")
                .with_attribute(Attribute::new("active", "xs:boolean"))
                .with_sequence(vec![
                    Particle::element(Element::new("weight").with_type("xs:double")),
                    Particle::element(Element::new("tag").with_type("xs:string").unbounded()),
                ]),
        )
}

/// `shape` holding one of `circle` or `square`
pub fn choice_schema() -> Schema {
    Schema::new()
        .with_element(Element::new("shape").with_complex_type(ComplexType::anonymous().with_choice(vec![
            Particle::element(Element::new("circle").with_complex_type(
                ComplexType::anonymous()
                    .with_sequence(vec![Particle::element(Element::new("radius").with_type("xs:decimal"))]),
            )),
            Particle::element(Element::new("square").with_complex_type(
                ComplexType::anonymous()
                    .with_sequence(vec![Particle::element(Element::new("side").with_type("xs:decimal"))]),
            )),
        ])))
}

/// Flags of every boolean spelling plus a list and an enumeration
pub fn settings_schema() -> Schema {
    Schema::new()
        .with_simple_type(SimpleType::enumeration("Mode", "xs:string", ["fast", "safe"]))
        .with_simple_type(SimpleType::list("Ports", "xs:unsignedShort"))
        .with_element(Element::new("settings").with_complex_type(
            ComplexType::anonymous()
                .with_attribute(Attribute::new("enabled", "xs:boolean"))
                .with_sequence(vec![
                    Particle::element(Element::new("debug").with_type("xs:boolean")),
                    Particle::element(Element::new("verbose").with_type("xs:boolean").optional()),
                    Particle::element(Element::new("mode").with_type("Mode")),
                    Particle::element(Element::new("ports").with_type("Ports").optional()),
                ]),
        ))
}

/// Qualified schema with a bound prefix
pub fn namespaced_schema() -> Schema {
    Schema::new()
        .with_target_namespace("http://example.com/acme")
        .with_prefix("acme", "http://example.com/acme")
        .qualified()
        .with_element(Element::new("invoice").with_complex_type(
            ComplexType::anonymous()
                .with_attribute(Attribute::new("currency", "xs:string"))
                .with_sequence(vec![
                    Particle::element(Element::new("total").with_type("xs:decimal")),
                    Particle::element(Element::new("item").with_type("xs:string").unbounded()),
                ]),
        ))
}

/// Types shared by the abapGit object schemas
pub fn common_schema() -> SchemaRef {
    Schema::new()
        .with_target_namespace(COMMON_NAMESPACE)
        .with_filename("common.xsd")
        .with_complex_type(ComplexType::new("TextType").with_sequence(vec![
            Particle::element(Element::new("language").with_type("xs:language")),
            Particle::element(Element::new("text").with_type("xs:string")),
        ]))
        .into_ref()
}

/// Package document with an abstract `Schema` element substituted by the
/// object kinds `DEVC` and `CLAS`
pub fn abapgit_schema() -> Schema {
    Schema::new()
        .with_target_namespace(ABAPGIT_NAMESPACE)
        .with_filename("abapgit.xsd")
        .with_prefix("c", COMMON_NAMESPACE)
        .with_import(common_schema())
        .with_element(Element::new("abapGit").with_type("PackageType"))
        .with_element(Element::new("Schema").as_abstract())
        .with_element(Element::new("DEVC").with_type("DevcType").substitutes_for("Schema"))
        .with_element(Element::new("CLAS").with_type("ClasType").substitutes_for("Schema"))
        .with_complex_type(
            ComplexType::new("DevcType")
                .with_sequence(vec![Particle::element(Element::new("CTEXT").with_type("c:TextType"))]),
        )
        .with_complex_type(ComplexType::new("ClasType").with_sequence(vec![
            Particle::element(Element::new("CLSNAME").with_type("xs:string")),
            Particle::element(Element::new("EXPOSURE").with_type("xs:int").optional()),
        ]))
        .with_complex_type(
            ComplexType::new("ObjectsType")
                .with_content(ModelGroup::sequence(vec![Particle::element(Element::reference("Schema"))])),
        )
        .with_complex_type(
            ComplexType::new("RootType")
                .with_sequence(vec![Particle::element(Element::new("objects").with_type("ObjectsType"))]),
        )
        .with_complex_type(
            ComplexType::new("PackageType")
                .with_attribute(Attribute::new("version", "xs:string"))
                .with_sequence(vec![Particle::element(Element::new("root").with_type("RootType"))]),
        )
        .with_complex_type(
            ComplexType::new("Unrelated")
                .with_sequence(vec![Particle::element(Element::new("name").with_type("xs:string"))]),
        )
}

pub const COMMON_XSD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
           targetNamespace="urn:common" elementFormDefault="qualified">
  <xs:complexType name="Audit">
    <xs:sequence>
      <xs:element name="createdBy" type="xs:string"/>
      <xs:element name="createdOn" type="xs:date"/>
    </xs:sequence>
  </xs:complexType>
  <xs:simpleType name="Status">
    <xs:restriction base="xs:string">
      <xs:enumeration value="open"/>
      <xs:enumeration value="closed"/>
    </xs:restriction>
  </xs:simpleType>
</xs:schema>"#;

pub const TICKETS_XSD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
           xmlns:c="urn:common" xmlns:t="urn:tickets"
           targetNamespace="urn:tickets">
  <xs:import namespace="urn:common" schemaLocation="common.xsd"/>
  <xs:element name="tickets">
    <xs:complexType>
      <xs:sequence>
        <xs:element name="ticket" type="t:Ticket" maxOccurs="unbounded"/>
      </xs:sequence>
    </xs:complexType>
  </xs:element>
  <xs:complexType name="Item">
    <xs:sequence>
      <xs:element name="audit" type="c:Audit"/>
    </xs:sequence>
    <xs:attribute name="id" type="xs:long" use="required"/>
  </xs:complexType>
  <xs:complexType name="Ticket">
    <xs:complexContent>
      <xs:extension base="t:Item">
        <xs:sequence>
          <xs:element name="summary" type="xs:string"/>
          <xs:element name="status" type="c:Status"/>
          <xs:group ref="t:Labels" minOccurs="0"/>
        </xs:sequence>
        <xs:attribute name="urgent" type="xs:boolean"/>
      </xs:extension>
    </xs:complexContent>
  </xs:complexType>
  <xs:group name="Labels">
    <xs:sequence>
      <xs:element name="label" type="xs:string" maxOccurs="unbounded"/>
    </xs:sequence>
  </xs:group>
</xs:schema>"#;

/// The tickets document with its import bound to the parsed common schema
pub fn tickets_schema() -> Schema {
    let common = Arc::new(parse_schema(COMMON_XSD).expect("common.xsd parses"));
    let tickets = parse_schema(TICKETS_XSD).expect("tickets.xsd parses");
    tickets.imports[0].bind(common).expect("import binds once");
    tickets
}

/// True when `key` appears as an object key anywhere in `value`
pub fn contains_key(value: &Value, key: &str) -> bool {
    match value {
        Value::Object(map) => map.contains_key(key) || map.values().any(|v| contains_key(v, key)),
        Value::Array(items) => items.iter().any(|v| contains_key(v, key)),
        _ => false,
    }
}
