//! Complex type definitions
//!
//! A complex type owns its content model and attributes directly. When it is
//! derived from a base, [`Derivation`] records how; the members stored on the
//! type are the ones the derivation step itself declares (the extension's
//! additions or the restriction's redeclarations).
//!
//! Reference: https://www.w3.org/TR/xmlschema11-1/#Complex_Type_Definitions

use serde::{Deserialize, Serialize};

use super::attributes::Attribute;
use super::groups::{ModelGroup, Particle};

/// Derivation method for complex types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DerivationMethod {
    /// Type derived by extension
    #[default]
    Extension,
    /// Type derived by restriction
    Restriction,
}

impl DerivationMethod {
    /// Parse from tag name
    pub fn from_tag(s: &str) -> Option<Self> {
        match s {
            "restriction" => Some(Self::Restriction),
            "extension" => Some(Self::Extension),
            _ => None,
        }
    }
}

impl std::fmt::Display for DerivationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Restriction => write!(f, "restriction"),
            Self::Extension => write!(f, "extension"),
        }
    }
}

/// Whether the derivation sits in complexContent or simpleContent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ContentKind {
    /// `<xs:complexContent>`
    #[default]
    #[serde(rename = "complexContent")]
    Complex,
    /// `<xs:simpleContent>`
    #[serde(rename = "simpleContent")]
    Simple,
}

/// Base-type derivation of a complex type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Derivation {
    /// complexContent or simpleContent
    #[serde(rename = "kind", default)]
    pub content: ContentKind,
    /// extension or restriction
    #[serde(default)]
    pub method: DerivationMethod,
    /// Base type name
    pub base: String,
}

/// XSD complex type definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplexType {
    /// Type name (None for anonymous types)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Content model declared by this type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<ModelGroup>,
    /// Attributes declared by this type
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Attribute>,
    /// Attribute group references
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attribute_groups: Vec<String>,
    /// Derivation from a base type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derivation: Option<Derivation>,
    /// Mixed content flag
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub mixed: bool,
    /// `<xs:anyAttribute>` present
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub any_attribute: bool,
    /// Abstract type flag
    #[serde(rename = "abstract", default, skip_serializing_if = "std::ops::Not::not")]
    pub is_abstract: bool,
}

impl ComplexType {
    /// Create a named complex type
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// Create an anonymous complex type
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Set the content model
    pub fn with_content(mut self, content: ModelGroup) -> Self {
        self.content = Some(content);
        self
    }

    /// Set a sequence content model
    pub fn with_sequence(self, particles: Vec<Particle>) -> Self {
        self.with_content(ModelGroup::sequence(particles))
    }

    /// Set a choice content model
    pub fn with_choice(self, particles: Vec<Particle>) -> Self {
        self.with_content(ModelGroup::choice(particles))
    }

    /// Add an attribute
    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Add an attribute group reference
    pub fn with_attribute_group(mut self, reference: impl Into<String>) -> Self {
        self.attribute_groups.push(reference.into());
        self
    }

    /// Derive by complexContent extension
    pub fn extending(mut self, base: impl Into<String>) -> Self {
        self.derivation = Some(Derivation {
            content: ContentKind::Complex,
            method: DerivationMethod::Extension,
            base: base.into(),
        });
        self
    }

    /// Derive by complexContent restriction
    pub fn restricting(mut self, base: impl Into<String>) -> Self {
        self.derivation = Some(Derivation {
            content: ContentKind::Complex,
            method: DerivationMethod::Restriction,
            base: base.into(),
        });
        self
    }

    /// Derive by simpleContent extension of a scalar base
    pub fn with_simple_content(mut self, base: impl Into<String>) -> Self {
        self.derivation = Some(Derivation {
            content: ContentKind::Simple,
            method: DerivationMethod::Extension,
            base: base.into(),
        });
        self
    }

    /// Base type name, if derived
    pub fn base(&self) -> Option<&str> {
        self.derivation.as_ref().map(|d| d.base.as_str())
    }

    /// Check if the type carries a complexContent derivation
    pub fn has_complex_content(&self) -> bool {
        matches!(
            self.derivation,
            Some(Derivation {
                content: ContentKind::Complex,
                ..
            })
        )
    }

    /// Check if the type carries a simpleContent derivation
    pub fn has_simple_content(&self) -> bool {
        matches!(
            self.derivation,
            Some(Derivation {
                content: ContentKind::Simple,
                ..
            })
        )
    }

    /// Derivation method of a complexContent derivation
    pub fn complex_method(&self) -> Option<DerivationMethod> {
        match &self.derivation {
            Some(d) if d.content == ContentKind::Complex => Some(d.method),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Element;

    #[test]
    fn test_derivation_helpers() {
        let ct = ComplexType::new("Child").extending("Parent");
        assert_eq!(ct.base(), Some("Parent"));
        assert!(ct.has_complex_content());
        assert_eq!(ct.complex_method(), Some(DerivationMethod::Extension));

        let sc = ComplexType::new("Price").with_simple_content("xs:decimal");
        assert!(sc.has_simple_content());
        assert_eq!(sc.complex_method(), None);
    }

    #[test]
    fn test_json_round_shape() {
        let ct = ComplexType::new("Child")
            .restricting("Parent")
            .with_sequence(vec![Particle::element(Element::new("a"))]);
        let json = serde_json::to_value(&ct).unwrap();
        assert_eq!(json["derivation"]["kind"], "complexContent");
        assert_eq!(json["derivation"]["method"], "restriction");
        let back: ComplexType = serde_json::from_value(json).unwrap();
        assert_eq!(back, ct);
    }
}
