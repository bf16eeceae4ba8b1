//! Simple type definitions
//!
//! Simple types refine scalars: an enumeration (restriction with a closed
//! literal set), a restriction of a base, a union of member types, or a
//! whitespace-separated list of an item type.

use serde::{Deserialize, Serialize};

/// XSD simple type definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimpleType {
    /// Type name (None for anonymous types)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// How the type is derived
    #[serde(flatten)]
    pub variety: SimpleVariety,
}

/// Derivation variety of a simple type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimpleVariety {
    /// `<xs:restriction>`, possibly with enumeration facets
    Restriction(Restriction),
    /// `<xs:union>`
    Union(Union),
    /// `<xs:list>`
    List(List),
}

impl Default for SimpleVariety {
    fn default() -> Self {
        Self::Restriction(Restriction::default())
    }
}

/// Restriction of a base simple type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Restriction {
    /// Base type name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    /// Anonymous base type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simple_type: Option<Box<SimpleType>>,
    /// Enumeration facet values in declaration order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enumeration: Vec<String>,
}

/// Union of member types
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Union {
    /// Named member types in declaration order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub member_types: Vec<String>,
    /// Anonymous member types, after the named ones
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub simple_types: Vec<SimpleType>,
}

/// List of an item type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct List {
    /// Named item type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_type: Option<String>,
    /// Anonymous item type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simple_type: Option<Box<SimpleType>>,
}

impl SimpleType {
    /// Create a restriction of a base type
    pub fn restriction(name: impl Into<String>, base: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            variety: SimpleVariety::Restriction(Restriction {
                base: Some(base.into()),
                ..Default::default()
            }),
        }
    }

    /// Create an enumeration over a base type
    pub fn enumeration<I, S>(name: impl Into<String>, base: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: Some(name.into()),
            variety: SimpleVariety::Restriction(Restriction {
                base: Some(base.into()),
                simple_type: None,
                enumeration: values.into_iter().map(Into::into).collect(),
            }),
        }
    }

    /// Create a union of named member types
    pub fn union<I, S>(name: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: Some(name.into()),
            variety: SimpleVariety::Union(Union {
                member_types: members.into_iter().map(Into::into).collect(),
                simple_types: Vec::new(),
            }),
        }
    }

    /// Create a list of a named item type
    pub fn list(name: impl Into<String>, item_type: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            variety: SimpleVariety::List(List {
                item_type: Some(item_type.into()),
                simple_type: None,
            }),
        }
    }

    /// Enumeration values, when the type is a closed literal set
    pub fn enumeration_values(&self) -> Option<&[String]> {
        match &self.variety {
            SimpleVariety::Restriction(r) if !r.enumeration.is_empty() => Some(&r.enumeration),
            _ => None,
        }
    }
}
