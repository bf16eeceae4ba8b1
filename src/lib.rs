//! # xmlschema-bind
//!
//! Schema resolution, TypeScript type generation and a schema-driven XML
//! codec for families of cross-referencing XML Schema documents.
//!
//! ## Features
//!
//! - Schema model buildable in code, from JSON or from XSD source text
//! - Lazy walker over types, elements and attributes across imports/includes
//! - Resolver producing one self-contained schema (merged documents, flattened
//!   derivations, expanded substitution groups)
//! - TypeScript generator with local/external tracking and generic
//!   propagation for substitution groups
//! - XML ⇄ `serde_json::Value` codec with exact round trips
//!
//! ## Example
//!
//! ```rust,ignore
//! use xmlschema_bind::{codec, parsing, resolver};
//!
//! let schema = parsing::parse_schema(&xsd_text)?;
//! let resolved = resolver::merge_all(&schema)?;
//!
//! let value = codec::parse(&resolved, &xml_text)?;
//! let xml = codec::build(&resolved, &value, &codec::BuildOptions::default())?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Foundation
pub mod error;
pub mod limits;

// Utilities
pub mod documents;
pub mod names;
pub mod namespaces;

// Schema model and traversal
pub mod model;
pub mod parsing;
pub mod walker;

// Transformations
pub mod codec;
pub mod generator;
pub mod resolver;

// Re-exports for convenience
pub use codec::{build, parse, BuildOptions, Codec};
pub use error::{Error, Result};
pub use generator::{generate, GeneratedModule, GeneratorOptions, TypeGenerator};
pub use limits::Limits;
pub use model::{Schema, SchemaLink, SchemaRef};
pub use parsing::parse_schema;
pub use resolver::{merge_all, merge_includes, resolve, ResolveOptions, Resolver};
pub use walker::Walker;

/// Version of the xmlschema-bind library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// XSD 1.0 namespace
pub const XSD_1_0_NAMESPACE: &str = namespaces::XSD_NAMESPACE;
