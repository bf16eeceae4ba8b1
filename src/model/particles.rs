//! Particle occurrence bounds
//!
//! Occurrence constraints (minOccurs, maxOccurs) for elements, model groups
//! and group references.
//!
//! Reference: https://www.w3.org/TR/xmlschema11-1/#p

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// Occurrence bounds for a particle (minOccurs, maxOccurs)
/// None for max means unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Occurs {
    /// Minimum number of occurrences (default 1)
    #[serde(
        rename = "minOccurs",
        default = "default_bound",
        deserialize_with = "deserialize_min",
        skip_serializing_if = "is_one"
    )]
    pub min: u32,
    /// Maximum number of occurrences (None = unbounded, default 1)
    #[serde(
        rename = "maxOccurs",
        default = "default_max",
        deserialize_with = "deserialize_max",
        serialize_with = "serialize_max",
        skip_serializing_if = "is_single"
    )]
    pub max: Option<u32>,
}

impl Occurs {
    /// Create new occurrence bounds
    pub fn new(min: u32, max: Option<u32>) -> Self {
        Self { min, max }
    }

    /// Default occurrence (1, 1)
    pub fn once() -> Self {
        Self { min: 1, max: Some(1) }
    }

    /// Optional occurrence (0, 1)
    pub fn optional() -> Self {
        Self { min: 0, max: Some(1) }
    }

    /// Zero or more (0, unbounded)
    pub fn zero_or_more() -> Self {
        Self { min: 0, max: None }
    }

    /// One or more (1, unbounded)
    pub fn one_or_more() -> Self {
        Self { min: 1, max: None }
    }

    /// Check if this particle can be empty (minOccurs == 0)
    pub fn is_emptiable(&self) -> bool {
        self.min == 0
    }

    /// Check if particle has maxOccurs == 1
    pub fn is_single(&self) -> bool {
        self.max == Some(1)
    }

    /// Check if the particle needs an array representation (maxOccurs != 1)
    pub fn is_multiple(&self) -> bool {
        !self.is_single()
    }

    /// Bounds of a particle nested inside a container with `outer` bounds
    ///
    /// A group reference's own occurrence multiplies onto every particle it
    /// inlines: `(0..1)` around `(1..1)` yields `(0..1)`, `(1..n)` around
    /// `(1..1)` yields `(1..n)`.
    pub fn within(&self, outer: &Occurs) -> Occurs {
        let max = match (self.max, outer.max) {
            (Some(inner), Some(outer)) => Some(inner.saturating_mul(outer)),
            _ => None,
        };
        Occurs::new(self.min.saturating_mul(outer.min), max)
    }
}

impl Default for Occurs {
    fn default() -> Self {
        Self::once()
    }
}

/// Parse minOccurs/maxOccurs attribute values as written in XSD source
pub fn parse_occurs(min_occurs: Option<&str>, max_occurs: Option<&str>) -> Option<Occurs> {
    let min = match min_occurs {
        Some(s) => s.trim().parse::<u32>().ok()?,
        None => 1,
    };
    let max = match max_occurs.map(str::trim) {
        Some("unbounded") => None,
        Some(s) => Some(s.parse::<u32>().ok()?),
        None => Some(1),
    };
    Some(Occurs::new(min, max))
}

fn default_bound() -> u32 {
    1
}

fn default_max() -> Option<u32> {
    Some(1)
}

fn is_one(value: &u32) -> bool {
    *value == 1
}

fn is_single(value: &Option<u32>) -> bool {
    *value == Some(1)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Bound {
    Number(u32),
    Text(String),
}

fn deserialize_min<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    match Bound::deserialize(deserializer)? {
        Bound::Number(n) => Ok(n),
        Bound::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("invalid minOccurs '{}'", s))),
    }
}

fn deserialize_max<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    match Bound::deserialize(deserializer)? {
        Bound::Number(n) => Ok(Some(n)),
        Bound::Text(s) if s.trim() == "unbounded" => Ok(None),
        Bound::Text(s) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("invalid maxOccurs '{}'", s))),
    }
}

fn serialize_max<S: Serializer>(value: &Option<u32>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(n) => serializer.serialize_u32(*n),
        None => serializer.serialize_str("unbounded"),
    }
}
