//! Attribute declarations and attribute groups

use serde::{Deserialize, Serialize};

use super::simple_types::SimpleType;
use crate::names::local_name;

/// Attribute use mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeUse {
    /// May be absent
    #[default]
    Optional,
    /// Must be present
    Required,
    /// Removed by a restriction
    Prohibited,
}

/// XSD attribute declaration or attribute reference
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attribute {
    /// Attribute name (None for references)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Referenced global attribute
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// Named simple type
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    /// Anonymous simple type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simple_type: Option<Box<SimpleType>>,
    /// Use mode
    #[serde(rename = "use", default)]
    pub use_mode: AttributeUse,
    /// Default value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    /// Fixed value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed: Option<String>,
}

impl Attribute {
    /// Create an attribute of a named type
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            type_name: Some(type_name.into()),
            ..Default::default()
        }
    }

    /// Create a reference to a global attribute
    pub fn reference(target: impl Into<String>) -> Self {
        Self {
            reference: Some(target.into()),
            ..Default::default()
        }
    }

    /// Mark the attribute required
    pub fn required(mut self) -> Self {
        self.use_mode = AttributeUse::Required;
        self
    }

    /// Mark the attribute prohibited
    pub fn prohibited(mut self) -> Self {
        self.use_mode = AttributeUse::Prohibited;
        self
    }

    /// Name used in instances: own name, else the referenced local name
    pub fn effective_name(&self) -> &str {
        match (&self.name, &self.reference) {
            (Some(name), _) => name,
            (None, Some(reference)) => local_name(reference),
            (None, None) => "",
        }
    }

    /// Check if the attribute must be present
    pub fn is_required(&self) -> bool {
        self.use_mode == AttributeUse::Required
    }
}

/// Named, reusable collection of attributes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeGroup {
    /// Group name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Attributes declared directly in the group
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Attribute>,
    /// Nested attribute group references
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attribute_groups: Vec<String>,
}

impl AttributeGroup {
    /// Create a named attribute group
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// Add an attribute
    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Add a nested attribute group reference
    pub fn with_attribute_group(mut self, reference: impl Into<String>) -> Self {
        self.attribute_groups.push(reference.into());
        self
    }
}
