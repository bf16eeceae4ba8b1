//! TypeScript rendering
//!
//! The emitter renders one definition per named component and keeps the
//! bookkeeping the generator reports: which names were emitted locally,
//! which external names each namespace must provide, and which types are
//! generic over the substitution placeholder.

use std::collections::{BTreeSet, HashSet};

use indexmap::IndexMap;

use super::generics::DependencyGraph;
use super::{GeneratedModule, GeneratorOptions};
use crate::error::Result;
use crate::model::{
    AttributeUse, ComplexType, DerivationMethod, Element, ScalarKind, Schema, SimpleType,
    SimpleVariety,
};
use crate::names::{property_key, string_literal, type_identifier};
use crate::namespaces::module_name;
use crate::walker::{ContentScope, Found, TypeRef, Walker};

const INDENT: &str = "  ";

/// Abstract element a type references directly
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct HeadRef {
    name: String,
    external: bool,
    label: String,
}

/// Rendered pieces of a complex type
#[derive(Debug, Default)]
struct Shape {
    extends: Option<String>,
    members: Vec<String>,
    single_placeholder: bool,
    array_placeholder: bool,
}

pub(crate) struct Emitter<'w, 'a> {
    walker: &'w Walker<'a>,
    options: &'w GeneratorOptions,
    type_argument: String,
    generic: BTreeSet<String>,
    heads: IndexMap<String, BTreeSet<HeadRef>>,
    externals: IndexMap<String, BTreeSet<String>>,
    locals: Vec<String>,
    emitted: HashSet<String>,
    definitions: Vec<String>,
}

impl<'w, 'a> Emitter<'w, 'a> {
    pub(crate) fn new(walker: &'w Walker<'a>, options: &'w GeneratorOptions) -> Self {
        Self {
            walker,
            options,
            type_argument: options.type_parameter.clone(),
            generic: BTreeSet::new(),
            heads: IndexMap::new(),
            externals: IndexMap::new(),
            locals: Vec::new(),
            emitted: HashSet::new(),
            definitions: Vec::new(),
        }
    }

    pub(crate) fn run(mut self) -> Result<GeneratedModule> {
        if self.options.track_dependencies {
            let (graph, seeds) = self.dependency_graph()?;
            self.generic = graph.propagate(seeds);
        }

        let simple_types: Vec<_> = self.walker.simple_types().filter(|f| self.wanted(f.external)).collect();
        for found in simple_types {
            if let Some(name) = &found.item.name {
                let ident = type_identifier(name);
                let body = self.simple_expr(found.item, found.schema)?;
                self.define(ident.clone(), format!("export type {} = {};", ident, body));
            }
        }

        let complex_types: Vec<_> = self.walker.complex_types().filter(|f| self.wanted(f.external)).collect();
        for found in complex_types {
            if let Some(name) = &found.item.name {
                let ident = type_identifier(name);
                let definition = self.complex_definition(&ident, found.item, found.schema)?;
                self.define(ident, definition);
            }
        }

        let elements: Vec<_> = self.walker.elements().filter(|f| self.wanted(f.external)).collect();
        for found in &elements {
            let ident = type_identifier(found.item.effective_name());
            if let Some(ct) = found.item.complex_type.as_deref() {
                let definition = self.complex_definition(&ident, ct, found.schema)?;
                self.define(ident, definition);
            } else if let Some(st) = found.item.simple_type.as_deref() {
                let body = self.simple_expr(st, found.schema)?;
                self.define(ident.clone(), format!("export type {} = {};", ident, body));
            }
        }

        for found in &elements {
            if found.item.is_abstract {
                self.values_record(*found)?;
            }
        }
        if self.options.track_dependencies {
            self.owner_aliases();
        }

        Ok(self.finish())
    }

    fn wanted(&self, external: bool) -> bool {
        !(self.options.track_dependencies && external)
    }

    fn define(&mut self, ident: String, definition: String) {
        if !self.emitted.insert(ident.clone()) {
            tracing::warn!("type name '{}' is already defined, skipping", ident);
            return;
        }
        self.locals.push(ident);
        self.definitions.push(definition);
    }

    fn finish(self) -> GeneratedModule {
        let mut source = String::new();
        if self.options.emit_imports {
            for (namespace, names) in &self.externals {
                let names: Vec<&str> = names.iter().map(String::as_str).collect();
                source.push_str(&format!(
                    "import type {{ {} }} from './{}';\n",
                    names.join(", "),
                    module_name(namespace)
                ));
            }
            if !self.externals.is_empty() {
                source.push('\n');
            }
        }
        source.push_str(&self.definitions.join("\n\n"));
        if !self.definitions.is_empty() {
            source.push('\n');
        }

        tracing::debug!(
            "generated {} definition(s), {} external namespace(s), {} generic type(s)",
            self.locals.len(),
            self.externals.len(),
            self.generic.len()
        );

        GeneratedModule {
            source,
            locals: self.locals,
            externals: self.externals,
            generic_types: self.generic,
        }
    }

    // Dependency tracking

    fn dependency_graph(&mut self) -> Result<(DependencyGraph, Vec<String>)> {
        let mut graph = DependencyGraph::new();
        let mut seeds = Vec::new();

        let mut definitions: Vec<(String, Found<'a, ComplexType>)> = self
            .walker
            .complex_types()
            .filter_map(|f| f.item.name.as_deref().map(|n| (type_identifier(n), f)))
            .collect();
        for found in self.walker.elements() {
            if let Some(ct) = found.item.complex_type.as_deref() {
                let ident = type_identifier(found.item.effective_name());
                definitions.push((
                    ident,
                    Found {
                        item: ct,
                        schema: found.schema,
                        external: found.external,
                    },
                ));
            }
        }

        for (ident, found) in definitions {
            graph.add_node(ident.clone());
            let mut deps = BTreeSet::new();
            let mut heads = BTreeSet::new();
            self.collect_dependencies(found.item, found.schema, &mut deps, &mut heads)?;
            for dep in deps {
                graph.add_edge(ident.clone(), dep);
            }
            if !heads.is_empty() {
                seeds.push(ident.clone());
                self.heads.entry(ident).or_default().extend(heads);
            }
        }
        Ok((graph, seeds))
    }

    fn collect_dependencies(
        &self,
        ct: &'a ComplexType,
        ctx: &'a Schema,
        deps: &mut BTreeSet<String>,
        heads: &mut BTreeSet<HeadRef>,
    ) -> Result<()> {
        if let Some(base) = ct.base() {
            if let Some(name) = self.named_type(self.walker.resolve_type(base, ctx)?) {
                deps.insert(name);
            }
        }
        for attribute in self.walker.complex_attributes(ct, ctx, ContentScope::Own)? {
            if let Some(name) = self.named_type(self.walker.attribute_type(attribute.decl, attribute.schema)?) {
                deps.insert(name);
            }
        }
        for walked in self.walker.complex_elements(ct, ctx, ContentScope::Own)? {
            if let Some(head) = walked.substitutes {
                let found = self.walker.find_element(head, ctx);
                heads.insert(HeadRef {
                    name: head.to_string(),
                    external: found.map(|f| f.external).unwrap_or(false),
                    label: found.map(|f| f.schema.label().to_string()).unwrap_or_default(),
                });
                continue;
            }
            if let Some(ident) = self.global_inline_ident(walked.decl, walked.schema) {
                deps.insert(ident);
                continue;
            }
            match self.walker.element_type(walked.decl, walked.schema)? {
                TypeRef::Complex(found) if found.item.name.is_none() => {
                    self.collect_dependencies(found.item, found.schema, deps, heads)?;
                }
                other => {
                    if let Some(name) = self.named_type(other) {
                        deps.insert(name);
                    }
                }
            }
        }
        Ok(())
    }

    fn named_type(&self, type_ref: TypeRef<'a>) -> Option<String> {
        match type_ref {
            TypeRef::Complex(found) => found.item.name.as_deref().map(type_identifier),
            TypeRef::Simple(found) => found.item.name.as_deref().map(type_identifier),
            TypeRef::Builtin(_) => None,
        }
    }

    /// Identifier of a top-level element's own inline type
    fn global_inline_ident(&self, decl: &'a Element, schema: &'a Schema) -> Option<String> {
        if !decl.has_inline_type() {
            return None;
        }
        let name = decl.name.as_deref()?;
        schema
            .elements
            .get(name)
            .filter(|global| std::ptr::eq(*global, decl))
            .map(|_| type_identifier(name))
    }

    // References

    fn reference(&mut self, name: &str, schema: &Schema, external: bool) -> String {
        let ident = type_identifier(name);
        if self.options.track_dependencies && external {
            self.externals
                .entry(schema.label().to_string())
                .or_default()
                .insert(ident.clone());
        }
        if self.generic.contains(&ident) {
            format!("{}<{}>", ident, self.type_argument)
        } else {
            ident
        }
    }

    fn type_expr(&mut self, type_ref: TypeRef<'a>, depth: usize) -> Result<String> {
        match type_ref {
            TypeRef::Builtin(kind) => Ok(kind.ts_type().to_string()),
            TypeRef::Simple(found) => match &found.item.name {
                Some(name) => Ok(self.reference(name, found.schema, found.external)),
                None => self.simple_expr(found.item, found.schema),
            },
            TypeRef::Complex(found) => match &found.item.name {
                Some(name) => Ok(self.reference(name, found.schema, found.external)),
                None => self.object_expr(found.item, found.schema, depth),
            },
        }
    }

    // Simple types

    fn simple_expr(&mut self, st: &'a SimpleType, ctx: &'a Schema) -> Result<String> {
        if let Some(values) = st.enumeration_values() {
            let kind = self.walker.simple_scalar(st, ctx)?.kind;
            let literals: Vec<String> = values.iter().map(|v| enum_literal(v, kind)).collect();
            return Ok(literals.join(" | "));
        }
        match &st.variety {
            SimpleVariety::Restriction(restriction) => {
                if let Some(inner) = restriction.simple_type.as_deref() {
                    self.simple_expr(inner, ctx)
                } else if let Some(base) = &restriction.base {
                    let base = self.walker.resolve_type(base, ctx)?;
                    self.type_expr(base, 0)
                } else {
                    Ok(ScalarKind::String.ts_type().to_string())
                }
            }
            SimpleVariety::Union(union) => {
                let mut members: Vec<String> = Vec::new();
                for member in &union.member_types {
                    let resolved = self.walker.resolve_type(member, ctx)?;
                    members.push(self.type_expr(resolved, 0)?);
                }
                for inline in &union.simple_types {
                    members.push(self.simple_expr(inline, ctx)?);
                }
                let mut seen = HashSet::new();
                members.retain(|m| seen.insert(m.clone()));
                if members.is_empty() {
                    return Ok(ScalarKind::String.ts_type().to_string());
                }
                Ok(members.join(" | "))
            }
            SimpleVariety::List(list) => {
                let item = if let Some(inner) = list.simple_type.as_deref() {
                    self.simple_expr(inner, ctx)?
                } else if let Some(item_type) = &list.item_type {
                    let resolved = self.walker.resolve_type(item_type, ctx)?;
                    self.type_expr(resolved, 0)?
                } else {
                    ScalarKind::String.ts_type().to_string()
                };
                Ok(array_of(&item))
            }
        }
    }

    // Complex types

    fn complex_definition(&mut self, ident: &str, ct: &'a ComplexType, ctx: &'a Schema) -> Result<String> {
        let shape = self.shape(ct, ctx, 0)?;
        if self.generic.contains(ident) {
            let parts = self.intersection(shape, 0);
            return Ok(format!(
                "export type {}<{}> = {};",
                ident, self.options.type_parameter, parts
            ));
        }
        let block = render_block(&shape.members, 0);
        Ok(match shape.extends {
            Some(base) => format!("export interface {} extends {} {}", ident, base, block),
            None => format!("export interface {} {}", ident, block),
        })
    }

    fn object_expr(&mut self, ct: &'a ComplexType, ctx: &'a Schema, depth: usize) -> Result<String> {
        let shape = self.shape(ct, ctx, depth)?;
        Ok(self.intersection(shape, depth))
    }

    /// Join base, members and placeholders into one intersection type
    fn intersection(&self, shape: Shape, depth: usize) -> String {
        let mut parts = Vec::new();
        let has_extends = shape.extends.is_some();
        if let Some(base) = shape.extends {
            parts.push(base);
        }
        if !shape.members.is_empty() || !has_extends {
            parts.push(render_block(&shape.members, depth));
        }
        let t = &self.type_argument;
        if shape.single_placeholder {
            parts.push(format!("Partial<{}>", t));
        }
        if shape.array_placeholder {
            parts.push(format!("{{ [K in keyof {}]?: {}[K][] }}", t, t));
        }
        parts.join(" & ")
    }

    fn shape(&mut self, ct: &'a ComplexType, ctx: &'a Schema, depth: usize) -> Result<Shape> {
        let mut shape = Shape::default();
        let mut names: HashSet<String> = HashSet::new();
        let mut scope = ContentScope::Own;
        let mut redeclared: Option<Vec<&'a str>> = None;

        if let Some(derivation) = &ct.derivation {
            match self.walker.resolve_type(&derivation.base, ctx)? {
                TypeRef::Complex(base) => {
                    let base_ref = self.type_expr(TypeRef::Complex(base), depth)?;
                    if derivation.method == DerivationMethod::Restriction {
                        let own = self.own_member_names(ct, ctx)?;
                        if own.is_empty() {
                            shape.extends = Some(base_ref);
                        } else {
                            let omitted: Vec<String> = own.iter().map(|n| string_literal(n)).collect();
                            shape.extends = Some(format!("Omit<{}, {}>", base_ref, omitted.join(" | ")));
                            scope = ContentScope::Inherited;
                            redeclared = Some(own);
                        }
                    } else {
                        shape.extends = Some(base_ref);
                    }
                }
                scalar if ct.has_simple_content() => {
                    let text = self.type_expr(scalar, depth + 1)?;
                    names.insert("$".to_string());
                    shape.members.push(format!("$: {};", text));
                }
                _ => {}
            }
        }
        let keep = |name: &str| redeclared.as_ref().map_or(true, |own| own.iter().any(|n| *n == name));

        for attribute in self.walker.complex_attributes(ct, ctx, scope)? {
            if attribute.use_mode == AttributeUse::Prohibited || !keep(attribute.name) {
                continue;
            }
            if !names.insert(attribute.name.to_string()) {
                continue;
            }
            let type_ref = self.walker.attribute_type(attribute.decl, attribute.schema)?;
            let ty = self.type_expr(type_ref, depth + 1)?;
            shape.members.push(member(attribute.name, attribute.is_optional(), &ty));
        }

        for walked in self.walker.complex_elements(ct, ctx, scope)? {
            if !keep(walked.name) {
                continue;
            }
            if walked.substitutes.is_some() && self.options.track_dependencies {
                if walked.array {
                    shape.array_placeholder = true;
                } else {
                    shape.single_placeholder = true;
                }
                continue;
            }
            if !names.insert(walked.name.to_string()) {
                continue;
            }
            let ty = match self.global_inline_ident(walked.decl, walked.schema) {
                Some(ident) => {
                    let external = self.walker.is_external(walked.schema);
                    self.reference(&ident, walked.schema, external)
                }
                None => {
                    let type_ref = self.walker.element_type(walked.decl, walked.schema)?;
                    self.type_expr(type_ref, depth + 1)?
                }
            };
            let ty = if walked.array { array_of(&ty) } else { ty };
            let optional = walked.optional || walked.substitutes.is_some();
            shape.members.push(member(walked.name, optional, &ty));
        }

        if ct.any_attribute || self.walker.has_wildcard(ct, ctx, ContentScope::Own)? {
            shape.members.push("[key: string]: unknown;".to_string());
        }
        Ok(shape)
    }

    /// Member names a restriction declares itself, prohibited attributes included
    fn own_member_names(&self, ct: &'a ComplexType, ctx: &'a Schema) -> Result<Vec<&'a str>> {
        let mut names: Vec<&'a str> = Vec::new();
        for attribute in self.walker.complex_attributes(ct, ctx, ContentScope::Own)? {
            if !names.contains(&attribute.name) {
                names.push(attribute.name);
            }
        }
        for walked in self.walker.complex_elements(ct, ctx, ContentScope::Own)? {
            if !names.contains(&walked.name) {
                names.push(walked.name);
            }
        }
        Ok(names)
    }

    // Substitution records

    fn values_record(&mut self, head: Found<'a, Element>) -> Result<()> {
        let substitutes = self.walker.substitutes(head.item);
        if substitutes.is_empty() {
            return Ok(());
        }
        let head_ident = type_identifier(head.item.effective_name());
        let record = format!("{}Values", head_ident);

        let previous = std::mem::replace(&mut self.type_argument, record.clone());
        let mut members = Vec::with_capacity(substitutes.len());
        for found in &substitutes {
            let ty = match self.global_inline_ident(found.item, found.schema) {
                Some(ident) => self.reference(&ident, found.schema, found.external),
                None => {
                    let type_ref = self.walker.element_type(found.item, found.schema)?;
                    self.type_expr(type_ref, 1)?
                }
            };
            members.push(member(found.item.effective_name(), false, &ty));
        }
        self.type_argument = previous;

        let definition = format!("export interface {} {}", record, render_block(&members, 0));
        self.define(record, definition);
        Ok(())
    }

    fn owner_aliases(&mut self) {
        let owners: Vec<(String, BTreeSet<HeadRef>)> = self
            .heads
            .iter()
            .filter(|(owner, _)| self.emitted.contains(owner.as_str()))
            .map(|(owner, heads)| (owner.clone(), heads.clone()))
            .collect();

        for (owner, heads) in owners {
            for head in heads {
                let head_ident = type_identifier(&head.name);
                let record = format!("{}Values", head_ident);
                if head.external {
                    self.externals.entry(head.label.clone()).or_default().insert(record.clone());
                }
                let alias = format!("{}{}", owner, head_ident);
                let definition = format!("export type {} = {}<{}>;", alias, owner, record);
                self.define(alias, definition);
            }
        }
    }
}

fn member(name: &str, optional: bool, ty: &str) -> String {
    format!("{}{}: {};", property_key(name), if optional { "?" } else { "" }, ty)
}

fn array_of(item: &str) -> String {
    if item.contains(" | ") || item.contains(" & ") {
        format!("({})[]", item)
    } else {
        format!("{}[]", item)
    }
}

fn enum_literal(value: &str, kind: ScalarKind) -> String {
    let bare = match kind {
        ScalarKind::Boolean => value == "true" || value == "false",
        kind if kind.is_numeric() => value.parse::<f64>().map(f64::is_finite).unwrap_or(false),
        _ => false,
    };
    if bare {
        value.to_string()
    } else {
        string_literal(value)
    }
}

fn render_block(members: &[String], depth: usize) -> String {
    if members.is_empty() {
        return "{}".to_string();
    }
    let inner = INDENT.repeat(depth + 1);
    let mut out = String::from("{\n");
    for line in members {
        out.push_str(&inner);
        out.push_str(line);
        out.push('\n');
    }
    out.push_str(&INDENT.repeat(depth));
    out.push('}');
    out
}
