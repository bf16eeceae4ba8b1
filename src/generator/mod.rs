//! TypeScript type generation
//!
//! The generator walks a schema and emits one TypeScript definition per
//! named component:
//!
//! - enumerations become literal unions, unions become alternations, lists
//!   become array types and other restrictions map onto their base
//! - complex types become interfaces; a named base becomes `extends`, or
//!   `extends Omit<Base, ...>` when a restriction redeclares members
//! - elements with an inline type get a definition named after the element
//! - every abstract element with substitutes gets a `<Name>Values` record
//!   keyed by the substitutes' element names
//!
//! With dependency tracking enabled, only components local to the schema
//! (the schema and its includes) are emitted. Referenced names from imported
//! schemas are reported per namespace, and types that reach an abstract
//! element reference become generic over the placeholder parameter.

mod emit;
pub mod generics;

use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::Result;
use crate::limits::Limits;
use crate::model::Schema;
use crate::walker::Walker;

pub use generics::DependencyGraph;

/// Generator configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GeneratorOptions {
    /// Emit only local types, track externals and generic types
    pub track_dependencies: bool,
    /// Name of the substitution placeholder parameter
    pub type_parameter: String,
    /// Render `import type` statements for externals
    pub emit_imports: bool,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            track_dependencies: false,
            type_parameter: "T".to_string(),
            emit_imports: false,
        }
    }
}

impl GeneratorOptions {
    /// Create default options (one self-contained output, no generics)
    pub fn new() -> Self {
        Self::default()
    }

    /// Options for one output unit per schema with cross-unit references
    pub fn tracking() -> Self {
        Self {
            track_dependencies: true,
            emit_imports: true,
            ..Self::default()
        }
    }

    /// Set dependency tracking
    pub fn with_track_dependencies(mut self, enabled: bool) -> Self {
        self.track_dependencies = enabled;
        self
    }

    /// Set the placeholder parameter name
    pub fn with_type_parameter(mut self, name: impl Into<String>) -> Self {
        self.type_parameter = name.into();
        self
    }

    /// Set whether imports are rendered
    pub fn with_emit_imports(mut self, enabled: bool) -> Self {
        self.emit_imports = enabled;
        self
    }
}

/// Output of one generator run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedModule {
    /// TypeScript source text
    pub source: String,
    /// Names defined in `source`, in emission order
    pub locals: Vec<String>,
    /// Names referenced from other schemas, keyed by namespace (or filename)
    pub externals: IndexMap<String, BTreeSet<String>>,
    /// Types generic over the placeholder parameter
    pub generic_types: BTreeSet<String>,
}

impl GeneratedModule {
    /// Check if a name is defined locally
    pub fn defines(&self, name: &str) -> bool {
        self.locals.iter().any(|local| local == name)
    }
}

/// TypeScript generator
#[derive(Debug, Clone, Default)]
pub struct TypeGenerator {
    options: GeneratorOptions,
    limits: Limits,
}

impl TypeGenerator {
    /// Create a generator
    pub fn new(options: GeneratorOptions) -> Self {
        Self {
            options,
            limits: Limits::default(),
        }
    }

    /// Set processing limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Generator options
    pub fn options(&self) -> &GeneratorOptions {
        &self.options
    }

    /// Generate definitions for `schema`
    pub fn generate(&self, schema: &Schema) -> Result<GeneratedModule> {
        let walker = Walker::with_limits(schema, self.limits.clone());
        emit::Emitter::new(&walker, &self.options).run()
    }
}

/// Generate definitions for `schema` with the given options
pub fn generate(schema: &Schema, options: &GeneratorOptions) -> Result<GeneratedModule> {
    TypeGenerator::new(options.clone()).generate(schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Attribute, ComplexType, Element, Particle, SimpleType};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_person_interface() {
        let schema = Schema::new()
            .with_element(Element::new("person").with_type("PersonType"))
            .with_complex_type(
                ComplexType::new("PersonType")
                    .with_attribute(Attribute::new("id", "xs:string"))
                    .with_sequence(vec![
                        Particle::element(Element::new("firstName").with_type("xs:string")),
                        Particle::element(Element::new("lastName").with_type("xs:string")),
                        Particle::element(Element::new("age").with_type("xs:int").optional()),
                        Particle::element(Element::new("nick").with_type("xs:string").unbounded()),
                    ]),
            );
        let module = generate(&schema, &GeneratorOptions::default()).unwrap();
        assert_eq!(
            module.source,
            "export interface PersonType {\n  id?: string;\n  firstName: string;\n  lastName: string;\n  age?: number;\n  nick: string[];\n}\n"
        );
        assert_eq!(module.locals, vec!["PersonType"]);
    }

    #[test]
    fn test_simple_types() {
        let schema = Schema::new()
            .with_simple_type(SimpleType::enumeration("Color", "xs:string", ["red", "green"]))
            .with_simple_type(SimpleType::union("Id", ["xs:int", "xs:string"]))
            .with_simple_type(SimpleType::list("Colors", "Color"))
            .with_simple_type(SimpleType::restriction("Code", "xs:token"));
        let module = generate(&schema, &GeneratorOptions::default()).unwrap();
        assert_eq!(
            module.source,
            "export type Color = 'red' | 'green';\n\n\
             export type Id = number | string;\n\n\
             export type Colors = Color[];\n\n\
             export type Code = string;\n"
        );
    }

    #[test]
    fn test_extension_and_restriction() {
        let schema = Schema::new()
            .with_complex_type(ComplexType::new("Base").with_sequence(vec![
                Particle::element(Element::new("a").with_type("xs:string")),
                Particle::element(Element::new("b").with_type("xs:string")),
            ]))
            .with_complex_type(
                ComplexType::new("Wide")
                    .extending("Base")
                    .with_sequence(vec![Particle::element(Element::new("c").with_type("xs:int"))]),
            )
            .with_complex_type(
                ComplexType::new("Narrow")
                    .restricting("Base")
                    .with_sequence(vec![Particle::element(Element::new("b").optional())]),
            );
        let module = generate(&schema, &GeneratorOptions::default()).unwrap();
        assert!(module.source.contains("export interface Wide extends Base {\n  c: number;\n}"));
        assert!(module
            .source
            .contains("export interface Narrow extends Omit<Base, 'b'> {\n  b?: string;\n}"));
    }

    #[test]
    fn test_simple_content_and_wildcard() {
        let schema = Schema::new()
            .with_complex_type(
                ComplexType::new("Price")
                    .with_simple_content("xs:decimal")
                    .with_attribute(Attribute::new("currency", "xs:string").required()),
            )
            .with_complex_type(ComplexType::new("Open").with_sequence(vec![Particle::Any(Default::default())]));
        let module = generate(&schema, &GeneratorOptions::default()).unwrap();
        assert!(module
            .source
            .contains("export interface Price {\n  $: number;\n  currency: string;\n}"));
        assert!(module
            .source
            .contains("export interface Open {\n  [key: string]: unknown;\n}"));
    }

    #[test]
    fn test_non_tracking_expands_substitutes() {
        let schema = Schema::new()
            .with_element(Element::new("Schema").as_abstract())
            .with_element(Element::new("DEVC").with_type("DevcType").substitutes_for("Schema"))
            .with_element(Element::new("CLAS").with_type("ClasType").substitutes_for("Schema"))
            .with_complex_type(ComplexType::new("DevcType"))
            .with_complex_type(ComplexType::new("ClasType"))
            .with_complex_type(
                ComplexType::new("Objects")
                    .with_sequence(vec![Particle::element(Element::reference("Schema"))]),
            );
        let module = generate(&schema, &GeneratorOptions::default()).unwrap();
        assert!(module
            .source
            .contains("export interface Objects {\n  DEVC?: DevcType;\n  CLAS?: ClasType;\n}"));
        assert!(module
            .source
            .contains("export interface SchemaValues {\n  DEVC: DevcType;\n  CLAS: ClasType;\n}"));
        assert!(module.generic_types.is_empty());
    }

    #[test]
    fn test_anonymous_types_inline() {
        let schema = Schema::new().with_element(Element::new("order").with_complex_type(
            ComplexType::anonymous().with_sequence(vec![Particle::element(
                Element::new("line").unbounded().with_complex_type(
                    ComplexType::anonymous()
                        .with_sequence(vec![Particle::element(Element::new("sku").with_type("xs:string"))]),
                ),
            )]),
        ));
        let module = generate(&schema, &GeneratorOptions::default()).unwrap();
        assert_eq!(
            module.source,
            "export interface order {\n  line: {\n    sku: string;\n  }[];\n}\n"
        );
    }
}
