//! Schema model
//!
//! In-memory representation of schema documents: complex and simple types,
//! element and attribute declarations, model groups, attribute groups and the
//! import/include links between documents. All components deserialize from
//! the JSON model form and are built with `with_*` constructors in code.

pub mod attributes;
pub mod builtins;
pub mod complex_types;
pub mod elements;
pub mod groups;
pub mod particles;
pub mod schema;
pub mod simple_types;

pub use attributes::{Attribute, AttributeGroup, AttributeUse};
pub use builtins::{builtin_kind, ScalarKind};
pub use complex_types::{ComplexType, ContentKind, Derivation, DerivationMethod};
pub use elements::Element;
pub use groups::{Compositor, Group, GroupRef, ModelGroup, Particle, Wildcard};
pub use particles::{parse_occurs, Occurs};
pub use schema::{Named, Schema, SchemaId, SchemaLink, SchemaRef};
pub use simple_types::{List, Restriction, SimpleType, SimpleVariety, Union};
