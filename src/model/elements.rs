//! Element declarations
//!
//! One struct covers top-level declarations, local declarations inside a
//! content model and `ref` particles. Occurrence bounds are only meaningful
//! when the element sits in a content model.

use serde::{Deserialize, Serialize};

use super::complex_types::ComplexType;
use super::particles::Occurs;
use super::simple_types::SimpleType;
use crate::names::local_name;

/// XSD element declaration or element reference
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    /// Element name (None for pure references)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Referenced top-level element (`ref="..."`)
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// Named type (`type="..."`)
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    /// Anonymous complex type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complex_type: Option<Box<ComplexType>>,
    /// Anonymous simple type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simple_type: Option<Box<SimpleType>>,
    /// Abstract elements never appear literally in instances
    #[serde(rename = "abstract", default, skip_serializing_if = "std::ops::Not::not")]
    pub is_abstract: bool,
    /// Head element this element may substitute for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub substitution_group: Option<String>,
    /// Occurrence bounds when used as a particle
    #[serde(flatten)]
    pub occurs: Occurs,
}

impl Element {
    /// Create a named element declaration
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// Create a reference to a top-level element
    pub fn reference(target: impl Into<String>) -> Self {
        Self {
            reference: Some(target.into()),
            ..Default::default()
        }
    }

    /// Set the named type
    pub fn with_type(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    /// Set an anonymous complex type
    pub fn with_complex_type(mut self, complex_type: ComplexType) -> Self {
        self.complex_type = Some(Box::new(complex_type));
        self
    }

    /// Set an anonymous simple type
    pub fn with_simple_type(mut self, simple_type: SimpleType) -> Self {
        self.simple_type = Some(Box::new(simple_type));
        self
    }

    /// Mark the element abstract
    pub fn as_abstract(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Declare the head element this element substitutes for
    pub fn substitutes_for(mut self, head: impl Into<String>) -> Self {
        self.substitution_group = Some(head.into());
        self
    }

    /// Set occurrence bounds
    pub fn with_occurs(mut self, min: u32, max: Option<u32>) -> Self {
        self.occurs = Occurs::new(min, max);
        self
    }

    /// Shorthand for minOccurs="0"
    pub fn optional(mut self) -> Self {
        self.occurs.min = 0;
        self
    }

    /// Shorthand for maxOccurs="unbounded"
    pub fn unbounded(mut self) -> Self {
        self.occurs.max = None;
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

    /// Check if the element carries its own anonymous type
    pub fn has_inline_type(&self) -> bool {
        self.complex_type.is_some() || self.simple_type.is_some()
    }
}
