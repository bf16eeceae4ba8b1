//! Schema documents and the links between them
//!
//! A [`Schema`] holds one document's global components in ordered,
//! name-keyed tables. Imports and includes are [`SchemaLink`]s that a loader
//! binds once to a shared [`SchemaRef`]; binding after construction is what
//! allows mutually importing schemas to form a cycle.

use std::fmt;
use std::sync::{Arc, OnceLock};

use indexmap::IndexMap;
use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

use super::attributes::{Attribute, AttributeGroup};
use super::complex_types::ComplexType;
use super::elements::Element;
use super::groups::Group;
use super::simple_types::SimpleType;
use crate::error::{Error, Result};
use crate::namespaces::{prefix_for, NamespaceMap};

/// Shared, immutable handle to a schema
pub type SchemaRef = Arc<Schema>;

/// Identity of a schema value, used for visited sets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaId(usize);

/// Global components that carry their own name
pub trait Named {
    /// Component name, if declared
    fn component_name(&self) -> Option<&str>;
    /// Set the component name (used when ingesting name-keyed maps)
    fn set_component_name(&mut self, name: String);
}

macro_rules! impl_named {
    ($($ty:ty),*) => {
        $(impl Named for $ty {
            fn component_name(&self) -> Option<&str> {
                self.name.as_deref()
            }

            fn set_component_name(&mut self, name: String) {
                self.name = Some(name);
            }
        })*
    };
}

impl_named!(Element, ComplexType, SimpleType, Group, AttributeGroup, Attribute);

/// Parsed schema document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    /// Target namespace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_namespace: Option<String>,
    /// Source file name, for diagnostics and external grouping
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Namespace prefix declarations (prefix "" = default namespace)
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub namespaces: NamespaceMap,
    /// `elementFormDefault="qualified"`
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub element_form_qualified: bool,
    /// Top-level element declarations
    #[serde(
        rename = "element",
        default,
        skip_serializing_if = "IndexMap::is_empty",
        serialize_with = "serialize_named",
        deserialize_with = "deserialize_named"
    )]
    pub elements: IndexMap<String, Element>,
    /// Named complex types
    #[serde(
        rename = "complexType",
        default,
        skip_serializing_if = "IndexMap::is_empty",
        serialize_with = "serialize_named",
        deserialize_with = "deserialize_named"
    )]
    pub complex_types: IndexMap<String, ComplexType>,
    /// Named simple types
    #[serde(
        rename = "simpleType",
        default,
        skip_serializing_if = "IndexMap::is_empty",
        serialize_with = "serialize_named",
        deserialize_with = "deserialize_named"
    )]
    pub simple_types: IndexMap<String, SimpleType>,
    /// Named model groups
    #[serde(
        rename = "group",
        default,
        skip_serializing_if = "IndexMap::is_empty",
        serialize_with = "serialize_named",
        deserialize_with = "deserialize_named"
    )]
    pub groups: IndexMap<String, Group>,
    /// Named attribute groups
    #[serde(
        rename = "attributeGroup",
        default,
        skip_serializing_if = "IndexMap::is_empty",
        serialize_with = "serialize_named",
        deserialize_with = "deserialize_named"
    )]
    pub attribute_groups: IndexMap<String, AttributeGroup>,
    /// Global attribute declarations
    #[serde(
        rename = "attribute",
        default,
        skip_serializing_if = "IndexMap::is_empty",
        serialize_with = "serialize_named",
        deserialize_with = "deserialize_named"
    )]
    pub attributes: IndexMap<String, Attribute>,
    /// `<xs:import>` links
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub imports: Vec<SchemaLink>,
    /// `<xs:include>` links
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub includes: Vec<SchemaLink>,
}

impl Schema {
    /// Create an empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Deserialize a schema from its JSON model form
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize the schema to pretty JSON; links are written as references
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Identity of this schema value
    pub fn id(&self) -> SchemaId {
        SchemaId(self as *const Schema as usize)
    }

    /// Wrap the schema in a shared handle
    pub fn into_ref(self) -> SchemaRef {
        Arc::new(self)
    }

    /// Label used to group components of this schema: namespace, else filename
    pub fn label(&self) -> &str {
        self.target_namespace
            .as_deref()
            .or(self.filename.as_deref())
            .unwrap_or("")
    }

    /// Prefix bound to the target namespace, if any
    pub fn target_prefix(&self) -> Option<&str> {
        self.target_namespace
            .as_deref()
            .and_then(|ns| prefix_for(&self.namespaces, ns))
    }

    /// Bound import targets
    pub fn imported_schemas(&self) -> impl Iterator<Item = &SchemaRef> {
        self.imports.iter().filter_map(SchemaLink::schema)
    }

    /// Bound include targets
    pub fn included_schemas(&self) -> impl Iterator<Item = &SchemaRef> {
        self.includes.iter().filter_map(SchemaLink::schema)
    }

    /// Check if the schema declares no global components
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
            && self.complex_types.is_empty()
            && self.simple_types.is_empty()
            && self.groups.is_empty()
            && self.attribute_groups.is_empty()
            && self.attributes.is_empty()
    }

    /// Set the target namespace
    pub fn with_target_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.target_namespace = Some(namespace.into());
        self
    }

    /// Set the file name
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Declare a namespace prefix
    pub fn with_prefix(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        self.namespaces.insert(prefix.into(), uri.into());
        self
    }

    /// Set `elementFormDefault="qualified"`
    pub fn qualified(mut self) -> Self {
        self.element_form_qualified = true;
        self
    }

    /// Add a top-level element
    pub fn with_element(mut self, element: Element) -> Self {
        insert_named(&mut self.elements, element);
        self
    }

    /// Add a named complex type
    pub fn with_complex_type(mut self, complex_type: ComplexType) -> Self {
        insert_named(&mut self.complex_types, complex_type);
        self
    }

    /// Add a named simple type
    pub fn with_simple_type(mut self, simple_type: SimpleType) -> Self {
        insert_named(&mut self.simple_types, simple_type);
        self
    }

    /// Add a named model group
    pub fn with_group(mut self, group: Group) -> Self {
        insert_named(&mut self.groups, group);
        self
    }

    /// Add a named attribute group
    pub fn with_attribute_group(mut self, group: AttributeGroup) -> Self {
        insert_named(&mut self.attribute_groups, group);
        self
    }

    /// Add a global attribute
    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        insert_named(&mut self.attributes, attribute);
        self
    }

    /// Add a bound import link
    pub fn with_import(mut self, schema: SchemaRef) -> Self {
        self.imports.push(SchemaLink::to(schema));
        self
    }

    /// Add a bound include link
    pub fn with_include(mut self, schema: SchemaRef) -> Self {
        self.includes.push(SchemaLink::to(schema));
        self
    }
}

fn insert_named<T: Named>(table: &mut IndexMap<String, T>, component: T) {
    let name = component.component_name().unwrap_or_default().to_string();
    table.insert(name, component);
}

/// Import or include link, bound at most once to a parsed schema
#[derive(Clone, Default)]
pub struct SchemaLink {
    /// Namespace attribute of the import
    pub namespace: Option<String>,
    /// schemaLocation attribute
    pub location: Option<String>,
    target: OnceLock<SchemaRef>,
}

impl SchemaLink {
    /// Create an unbound link
    pub fn new(namespace: Option<String>, location: Option<String>) -> Self {
        Self {
            namespace,
            location,
            target: OnceLock::new(),
        }
    }

    /// Create a link already bound to a schema
    pub fn to(schema: SchemaRef) -> Self {
        let link = Self::new(schema.target_namespace.clone(), schema.filename.clone());
        let _ = link.target.set(schema);
        link
    }

    /// Bind the link to its parsed schema
    pub fn bind(&self, schema: SchemaRef) -> Result<()> {
        self.target.set(schema).map_err(|_| {
            Error::Schema(format!(
                "link to '{}' is already bound",
                self.location.as_deref().unwrap_or("<unknown>")
            ))
        })
    }

    /// The bound schema, if any
    pub fn schema(&self) -> Option<&SchemaRef> {
        self.target.get()
    }

    /// Check if the link has been bound
    pub fn is_bound(&self) -> bool {
        self.target.get().is_some()
    }
}

impl fmt::Debug for SchemaLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaLink")
            .field("namespace", &self.namespace)
            .field("location", &self.location)
            .field("bound", &self.is_bound())
            .finish()
    }
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct LinkReference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    schema_location: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LinkRepr {
    Reference(LinkReference),
    Parsed(Box<Schema>),
}

impl Serialize for SchemaLink {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        LinkReference {
            namespace: self.namespace.clone(),
            schema_location: self.location.clone(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SchemaLink {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Ok(match LinkRepr::deserialize(deserializer)? {
            LinkRepr::Reference(reference) => {
                SchemaLink::new(reference.namespace, reference.schema_location)
            }
            LinkRepr::Parsed(schema) => SchemaLink::to(Arc::new(*schema)),
        })
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NamedRepr<T> {
    List(Vec<T>),
    Map(IndexMap<String, T>),
}

/// Accept a named collection either as an array of named entries or as a
/// name-keyed map, normalizing both to one ordered map
fn deserialize_named<'de, D, T>(deserializer: D) -> std::result::Result<IndexMap<String, T>, D::Error>
where
    D: Deserializer<'de>,
    T: Named + Deserialize<'de>,
{
    match NamedRepr::<T>::deserialize(deserializer)? {
        NamedRepr::List(items) => {
            let mut table = IndexMap::with_capacity(items.len());
            for item in items {
                let name = item
                    .component_name()
                    .ok_or_else(|| de::Error::custom("global component without a name"))?
                    .to_string();
                table.entry(name).or_insert(item);
            }
            Ok(table)
        }
        NamedRepr::Map(map) => Ok(map
            .into_iter()
            .map(|(key, mut item)| {
                if item.component_name().is_none() {
                    item.set_component_name(key.clone());
                }
                (key, item)
            })
            .collect()),
    }
}

fn serialize_named<S, T>(table: &IndexMap<String, T>, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
    T: Serialize,
{
    serializer.collect_seq(table.values())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_and_map_collections_normalize() {
        let as_array = r#"{
            "complexType": [{"name": "A"}, {"name": "B"}]
        }"#;
        let as_map = r#"{
            "complexType": {"A": {}, "B": {"mixed": true}}
        }"#;

        let a = Schema::from_json(as_array).unwrap();
        let b = Schema::from_json(as_map).unwrap();
        assert_eq!(a.complex_types.keys().collect::<Vec<_>>(), vec!["A", "B"]);
        assert_eq!(b.complex_types.keys().collect::<Vec<_>>(), vec!["A", "B"]);
        assert_eq!(b.complex_types["A"].name.as_deref(), Some("A"));
        assert!(b.complex_types["B"].mixed);
    }

    #[test]
    fn test_unnamed_array_entry_is_rejected() {
        let err = Schema::from_json(r#"{"element": [{"type": "T"}]}"#).unwrap_err();
        assert!(err.to_string().starts_with("JSON error:"));
    }

    #[test]
    fn test_links_from_json() {
        let json = r#"{
            "imports": [
                {"namespace": "urn:common", "schemaLocation": "common.xsd"},
                {"targetNamespace": "urn:nested", "complexType": [{"name": "N"}]}
            ]
        }"#;
        let schema = Schema::from_json(json).unwrap();
        assert!(!schema.imports[0].is_bound());
        assert_eq!(schema.imports[0].location.as_deref(), Some("common.xsd"));

        let nested = schema.imports[1].schema().unwrap();
        assert_eq!(nested.target_namespace.as_deref(), Some("urn:nested"));
        assert_eq!(schema.imported_schemas().count(), 1);
    }

    #[test]
    fn test_link_binds_once() {
        let link = SchemaLink::new(None, Some("a.xsd".to_string()));
        let target = Schema::new().into_ref();
        assert!(link.bind(target.clone()).is_ok());
        assert!(link.bind(target).is_err());
    }

    #[test]
    fn test_to_json_writes_link_references() {
        let common = Schema::new()
            .with_target_namespace("urn:common")
            .with_filename("common.xsd")
            .into_ref();
        let schema = Schema::new().with_import(common);
        let json: serde_json::Value = serde_json::from_str(&schema.to_json().unwrap()).unwrap();
        assert_eq!(
            json["imports"][0],
            serde_json::json!({"namespace": "urn:common", "schemaLocation": "common.xsd"})
        );
    }

    #[test]
    fn test_target_prefix() {
        let schema = Schema::new()
            .with_target_namespace("http://example.com/p")
            .with_prefix("xs", crate::namespaces::XSD_NAMESPACE)
            .with_prefix("p", "http://example.com/p");
        assert_eq!(schema.target_prefix(), Some("p"));
    }
}
