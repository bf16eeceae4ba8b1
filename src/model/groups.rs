//! Model groups and particles
//!
//! This module implements the content models of complex types:
//! - xs:sequence - ordered content
//! - xs:choice - alternative content
//! - xs:all - unordered content
//!
//! Reference: https://www.w3.org/TR/xmlschema11-1/#Model_Groups

use serde::{Deserialize, Serialize};

use super::elements::Element;
use super::particles::Occurs;

/// Model group compositor type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compositor {
    /// Ordered sequence of particles
    #[default]
    Sequence,
    /// One of multiple alternatives
    Choice,
    /// Unordered set of particles
    All,
}

impl Compositor {
    /// Parse from element tag name
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "sequence" => Some(Self::Sequence),
            "choice" => Some(Self::Choice),
            "all" => Some(Self::All),
            _ => None,
        }
    }
}

impl std::fmt::Display for Compositor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sequence => write!(f, "sequence"),
            Self::Choice => write!(f, "choice"),
            Self::All => write!(f, "all"),
        }
    }
}

/// A particle in a model group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Particle {
    /// Local element declaration or element reference
    Element(Element),
    /// Named group reference
    Group(GroupRef),
    /// Nested model group
    Model(ModelGroup),
    /// Wildcard (xs:any)
    Any(Wildcard),
}

impl Particle {
    /// Wrap an element declaration or reference
    pub fn element(element: Element) -> Self {
        Self::Element(element)
    }

    /// Reference a named group
    pub fn group(reference: impl Into<String>) -> Self {
        Self::Group(GroupRef {
            reference: reference.into(),
            occurs: Occurs::once(),
        })
    }

    /// Get the occurrence constraints
    pub fn occurs(&self) -> Occurs {
        match self {
            Self::Element(e) => e.occurs,
            Self::Group(g) => g.occurs,
            Self::Model(m) => m.occurs,
            Self::Any(a) => a.occurs,
        }
    }
}

/// Reference to a named model group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupRef {
    /// Referenced group name
    #[serde(rename = "ref")]
    pub reference: String,
    /// Occurrence bounds applied to every inlined particle
    #[serde(flatten)]
    pub occurs: Occurs,
}

impl GroupRef {
    /// Set occurrence bounds
    pub fn with_occurs(mut self, min: u32, max: Option<u32>) -> Self {
        self.occurs = Occurs::new(min, max);
        self
    }
}

/// Element wildcard
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Wildcard {
    /// Namespace constraint as written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Occurrence bounds
    #[serde(flatten)]
    pub occurs: Occurs,
}

/// Sequence, choice or all group of particles
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelGroup {
    /// Compositor
    #[serde(default)]
    pub compositor: Compositor,
    /// Particles in declaration order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub particles: Vec<Particle>,
    /// Occurrence bounds of the group itself
    #[serde(flatten)]
    pub occurs: Occurs,
}

impl ModelGroup {
    /// Create an empty group
    pub fn new(compositor: Compositor) -> Self {
        Self {
            compositor,
            ..Default::default()
        }
    }

    /// Create a sequence of particles
    pub fn sequence(particles: Vec<Particle>) -> Self {
        Self {
            compositor: Compositor::Sequence,
            particles,
            occurs: Occurs::once(),
        }
    }

    /// Create a choice of particles
    pub fn choice(particles: Vec<Particle>) -> Self {
        Self {
            compositor: Compositor::Choice,
            particles,
            occurs: Occurs::once(),
        }
    }

    /// Create an all group
    pub fn all(particles: Vec<Particle>) -> Self {
        Self {
            compositor: Compositor::All,
            particles,
            occurs: Occurs::once(),
        }
    }

    /// Set occurrence bounds
    pub fn with_occurs(mut self, min: u32, max: Option<u32>) -> Self {
        self.occurs = Occurs::new(min, max);
        self
    }

    /// Check if the group has no particles
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }
}

/// Named model group definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Group {
    /// Group name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// The group's content
    #[serde(default)]
    pub model: ModelGroup,
}

impl Group {
    /// Create a named group
    pub fn new(name: impl Into<String>, model: ModelGroup) -> Self {
        Self {
            name: Some(name.into()),
            model,
        }
    }
}
