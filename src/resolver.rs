//! Schema resolution
//!
//! The resolver turns a schema and everything it links to into one
//! self-contained [`Schema`]:
//!
//! 1. component tables are collected across enabled import/include edges,
//!    the first declaration of a name winning and prefix maps unioned
//! 2. complexContent derivations are flattened base first, over chains of
//!    any length, and the derivation wrapper is dropped
//! 3. particles that reference an abstract element are replaced by one
//!    particle per concrete substitute, each carrying the reference's
//!    occurrence bounds
//! 4. the result is assembled from the tables
//!
//! With `roots_only`, referenced elements leave the top level, so references
//! to them are replaced by copies of their declarations. A recursive
//! reference cannot be copied out and keeps its element at the top level.
//!
//! Inputs are never modified; every call returns a new schema.

use std::collections::{HashSet, VecDeque};

use serde::Deserialize;

use crate::error::{ComponentKind, Error, Result};
use crate::limits::Limits;
use crate::model::{
    ComplexType, Compositor, DerivationMethod, Element, ModelGroup, Occurs, Particle, Schema,
    SchemaLink,
};
use crate::names::local_name;
use crate::namespaces::union_into;
use crate::walker::{ContentScope, Found, Walker};

/// Resolver configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResolveOptions {
    /// Pull the components of imported schemas into the result
    pub merge_imports: bool,
    /// Pull the components of included schemas into the result
    pub merge_includes: bool,
    /// Merge complexContent derivations into their derived types
    pub flatten_extensions: bool,
    /// Replace abstract element references with their substitutes
    pub expand_substitutions: bool,
    /// Keep import/include links of merged edges in the result
    pub retain_links: bool,
    /// Keep only document roots among the top-level elements
    pub roots_only: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            merge_imports: true,
            merge_includes: true,
            flatten_extensions: true,
            expand_substitutions: true,
            retain_links: false,
            roots_only: false,
        }
    }
}

impl ResolveOptions {
    /// Create options with every resolution step enabled
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether imports are merged
    pub fn with_merge_imports(mut self, enabled: bool) -> Self {
        self.merge_imports = enabled;
        self
    }

    /// Set whether includes are merged
    pub fn with_merge_includes(mut self, enabled: bool) -> Self {
        self.merge_includes = enabled;
        self
    }

    /// Set whether derivations are flattened
    pub fn with_flatten_extensions(mut self, enabled: bool) -> Self {
        self.flatten_extensions = enabled;
        self
    }

    /// Set whether substitution groups are expanded
    pub fn with_expand_substitutions(mut self, enabled: bool) -> Self {
        self.expand_substitutions = enabled;
        self
    }

    /// Set whether merged links are kept in the output
    pub fn with_retain_links(mut self, enabled: bool) -> Self {
        self.retain_links = enabled;
        self
    }

    /// Set whether top-level elements are filtered to document roots
    pub fn with_roots_only(mut self, enabled: bool) -> Self {
        self.roots_only = enabled;
        self
    }
}

/// Resolve a schema with the given options
pub fn resolve(schema: &Schema, options: &ResolveOptions) -> Result<Schema> {
    Resolver::new(options.clone()).resolve(schema)
}

/// Inline included schemas only; imports are kept as links
pub fn merge_includes(schema: &Schema) -> Result<Schema> {
    let options = ResolveOptions {
        merge_imports: false,
        merge_includes: true,
        flatten_extensions: false,
        expand_substitutions: false,
        retain_links: false,
        roots_only: false,
    };
    resolve(schema, &options)
}

/// Merge imports and includes, keeping only true document roots as
/// top-level elements
pub fn merge_all(schema: &Schema) -> Result<Schema> {
    resolve(schema, &ResolveOptions::default().with_roots_only(true))
}

/// Schema resolver
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    options: ResolveOptions,
    limits: Limits,
}

impl Resolver {
    /// Create a resolver
    pub fn new(options: ResolveOptions) -> Self {
        Self {
            options,
            limits: Limits::default(),
        }
    }

    /// Set the processing limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Resolver options
    pub fn options(&self) -> &ResolveOptions {
        &self.options
    }

    /// Resolve `schema` into a new self-contained schema
    pub fn resolve(&self, schema: &Schema) -> Result<Schema> {
        let merged = self.collect(schema)?;
        let walker = Walker::with_limits(&merged, self.limits.clone());

        if self.options.expand_substitutions {
            check_substitution_heads(&walker)?;
        }
        let referenced = if self.options.roots_only {
            referenced_elements(&merged)
        } else {
            HashSet::new()
        };

        let mut out = Schema {
            target_namespace: merged.target_namespace.clone(),
            filename: merged.filename.clone(),
            namespaces: merged.namespaces.clone(),
            element_form_qualified: merged.element_form_qualified,
            imports: merged.imports.clone(),
            includes: merged.includes.clone(),
            simple_types: merged.simple_types.clone(),
            attribute_groups: merged.attribute_groups.clone(),
            attributes: merged.attributes.clone(),
            ..Default::default()
        };

        for (name, ct) in &merged.complex_types {
            let resolved = self.complex_type(ct, &merged, &walker, &mut Vec::new())?;
            out.complex_types.insert(name.clone(), resolved);
        }

        for (name, element) in &merged.elements {
            if self.options.roots_only && (element.is_abstract || referenced.contains(name.as_str())) {
                tracing::trace!("dropping non-root element '{}'", name);
                continue;
            }
            let resolved = self.element(element, &merged, &walker, &mut Vec::new())?;
            out.elements.insert(name.clone(), resolved);
        }

        for (name, group) in &merged.groups {
            let mut resolved = group.clone();
            resolved.model = self.model(&group.model, &merged, &walker, &mut Vec::new())?;
            out.groups.insert(name.clone(), resolved);
        }

        if self.options.roots_only {
            self.restore_referenced(&merged, &walker, &mut out)?;
        }

        let kept: HashSet<String> = out.elements.keys().cloned().collect();
        for element in out.elements.values_mut() {
            let orphaned = element
                .substitution_group
                .as_deref()
                .is_some_and(|head| !kept.contains(local_name(head)));
            if orphaned && self.options.expand_substitutions {
                element.substitution_group = None;
            }
        }

        tracing::debug!(
            "resolved schema '{}': {} complex types, {} simple types, {} elements",
            out.label(),
            out.complex_types.len(),
            out.simple_types.len(),
            out.elements.len()
        );
        Ok(out)
    }

    /// Bring back top-level elements that are still referenced after
    /// inlining, which happens only for recursive references
    fn restore_referenced<'a>(&self, merged: &'a Schema, walker: &Walker<'a>, out: &mut Schema) -> Result<()> {
        loop {
            let missing: Vec<String> = referenced_elements(out)
                .into_iter()
                .filter(|name| !out.elements.contains_key(*name) && merged.elements.contains_key(*name))
                .map(str::to_string)
                .collect();
            if missing.is_empty() {
                return Ok(());
            }
            for name in missing {
                if let Some(element) = merged.elements.get(&name) {
                    tracing::trace!("keeping recursively referenced element '{}'", name);
                    let resolved = self.element(element, merged, walker, &mut Vec::new())?;
                    out.elements.insert(name, resolved);
                }
            }
        }
    }

    /// Collect tables across enabled edges into one schema
    ///
    /// Edges that are not merged survive as links on the result so that
    /// references into them still resolve.
    fn collect(&self, schema: &Schema) -> Result<Schema> {
        let mut merged = Schema {
            target_namespace: schema.target_namespace.clone(),
            filename: schema.filename.clone(),
            element_form_qualified: schema.element_form_qualified,
            ..Default::default()
        };
        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([schema]);

        while let Some(current) = queue.pop_front() {
            if !visited.insert(current.id()) {
                continue;
            }
            self.limits.check_schemas(visited.len())?;

            for (name, item) in &current.elements {
                merged.elements.entry(name.clone()).or_insert_with(|| item.clone());
            }
            for (name, item) in &current.complex_types {
                merged.complex_types.entry(name.clone()).or_insert_with(|| item.clone());
            }
            for (name, item) in &current.simple_types {
                merged.simple_types.entry(name.clone()).or_insert_with(|| item.clone());
            }
            for (name, item) in &current.groups {
                merged.groups.entry(name.clone()).or_insert_with(|| item.clone());
            }
            for (name, item) in &current.attribute_groups {
                merged.attribute_groups.entry(name.clone()).or_insert_with(|| item.clone());
            }
            for (name, item) in &current.attributes {
                merged.attributes.entry(name.clone()).or_insert_with(|| item.clone());
            }
            union_into(&mut merged.namespaces, &current.namespaces);

            for link in &current.includes {
                if let Some(target) = self.follow(link, self.options.merge_includes, &mut merged.includes) {
                    queue.push_back(target);
                }
            }
            for link in &current.imports {
                if let Some(target) = self.follow(link, self.options.merge_imports, &mut merged.imports) {
                    queue.push_back(target);
                }
            }
        }

        tracing::debug!(
            "collected {} schema(s) into '{}'",
            visited.len(),
            merged.label()
        );
        Ok(merged)
    }

    /// Decide what happens to one link: merged edges yield their target,
    /// other edges are kept as links
    fn follow<'s>(&self, link: &'s SchemaLink, merge: bool, kept: &mut Vec<SchemaLink>) -> Option<&'s Schema> {
        let retain = !merge || self.options.retain_links;
        if retain && !kept.iter().any(|k| same_link(k, link)) {
            kept.push(link.clone());
        }
        if !merge {
            return None;
        }
        match link.schema() {
            Some(target) => Some(target.as_ref()),
            None => {
                tracing::warn!(
                    "link to '{}' is not bound, its components are not merged",
                    link.location.as_deref().or(link.namespace.as_deref()).unwrap_or("<unknown>")
                );
                None
            }
        }
    }

    fn complex_type<'a>(
        &self,
        ct: &'a ComplexType,
        ctx: &'a Schema,
        walker: &Walker<'a>,
        inlining: &mut Vec<String>,
    ) -> Result<ComplexType> {
        if self.options.flatten_extensions && ct.derivation.is_some() {
            let chain = walker.derivation_chain(ct, ctx)?;
            if chain.len() > 1 {
                return self.flatten(&chain, walker, inlining);
            }
        }
        let mut out = ct.clone();
        out.content = ct
            .content
            .as_ref()
            .map(|model| self.model(model, ctx, walker, inlining))
            .transpose()?;
        Ok(out)
    }

    /// Merge a derivation chain (derived type first) into one underived type
    fn flatten<'a>(
        &self,
        chain: &[Found<'a, ComplexType>],
        walker: &Walker<'a>,
        inlining: &mut Vec<String>,
    ) -> Result<ComplexType> {
        let Some(&Found { item: ct, schema: ctx, .. }) = chain.first() else {
            return Err(Error::Schema("empty derivation chain".to_string()));
        };
        let mut content: Option<ModelGroup> = None;
        let mut any_attribute = false;

        for step in chain.iter().rev() {
            let own = step
                .item
                .content
                .as_ref()
                .map(|model| self.model(model, step.schema, walker, inlining))
                .transpose()?;
            any_attribute |= step.item.any_attribute;
            content = match step.item.complex_method() {
                Some(DerivationMethod::Restriction) => restrict(content, own),
                _ => extend(content, own),
            };
        }

        let attributes = walker
            .complex_attributes(ct, ctx, ContentScope::Inherited)?
            .into_iter()
            .map(|walked| {
                let mut decl = walked.decl.clone();
                decl.name = Some(walked.name.to_string());
                decl.reference = None;
                decl.use_mode = walked.use_mode;
                decl
            })
            .collect();

        let derivation = chain
            .last()
            .filter(|root| root.item.has_simple_content())
            .and_then(|root| root.item.derivation.clone());

        tracing::trace!(
            "flattened '{}' over {} derivation step(s)",
            ct.name.as_deref().unwrap_or("<anonymous>"),
            chain.len() - 1
        );

        Ok(ComplexType {
            name: ct.name.clone(),
            content,
            attributes,
            attribute_groups: Vec::new(),
            derivation,
            mixed: ct.mixed,
            any_attribute,
            is_abstract: ct.is_abstract,
        })
    }

    fn element<'a>(
        &self,
        element: &'a Element,
        ctx: &'a Schema,
        walker: &Walker<'a>,
        inlining: &mut Vec<String>,
    ) -> Result<Element> {
        let mut out = element.clone();
        if let Some(ct) = element.complex_type.as_deref() {
            out.complex_type = Some(Box::new(self.complex_type(ct, ctx, walker, inlining)?));
        }
        Ok(out)
    }

    /// Rewrite a content model; with `roots_only`, references to concrete
    /// elements are replaced by copies of their declarations, since the
    /// referenced elements are not kept at the top level
    fn model<'a>(
        &self,
        model: &'a ModelGroup,
        ctx: &'a Schema,
        walker: &Walker<'a>,
        inlining: &mut Vec<String>,
    ) -> Result<ModelGroup> {
        let mut particles = Vec::with_capacity(model.particles.len());
        for particle in &model.particles {
            match particle {
                Particle::Element(element) => match &element.reference {
                    Some(reference) if self.options.expand_substitutions || self.options.roots_only => {
                        let target = walker
                            .find_element(reference, ctx)
                            .ok_or_else(|| Error::missing(ComponentKind::Element, reference))?;
                        if target.item.is_abstract && self.options.expand_substitutions {
                            let substitutes = walker.substitutes(target.item);
                            tracing::debug!(
                                "expanding '{}' into {} substitute(s)",
                                reference,
                                substitutes.len()
                            );
                            for found in substitutes {
                                let mut concrete = self.element(found.item, found.schema, walker, inlining)?;
                                concrete.substitution_group = None;
                                concrete.occurs = element.occurs;
                                particles.push(Particle::Element(concrete));
                            }
                        } else if self.options.roots_only
                            && !target.item.is_abstract
                            && !inlining.iter().any(|name| name == reference)
                        {
                            tracing::trace!("inlining reference to '{}'", reference);
                            inlining.push(reference.clone());
                            let inlined = self.element(target.item, target.schema, walker, inlining);
                            inlining.pop();
                            let mut inlined = inlined?;
                            inlined.substitution_group = None;
                            inlined.occurs = element.occurs;
                            particles.push(Particle::Element(inlined));
                        } else {
                            particles.push(particle.clone());
                        }
                    }
                    _ => particles.push(Particle::Element(self.element(element, ctx, walker, inlining)?)),
                },
                Particle::Model(nested) => {
                    particles.push(Particle::Model(self.model(nested, ctx, walker, inlining)?))
                }
                Particle::Group(_) | Particle::Any(_) => particles.push(particle.clone()),
            }
        }
        Ok(ModelGroup {
            compositor: model.compositor,
            particles,
            occurs: model.occurs,
        })
    }
}

fn same_link(a: &SchemaLink, b: &SchemaLink) -> bool {
    match (a.schema(), b.schema()) {
        (Some(x), Some(y)) => x.id() == y.id(),
        _ => a.namespace == b.namespace && a.location == b.location,
    }
}

/// Every substitutionGroup must name an existing element
fn check_substitution_heads(walker: &Walker<'_>) -> Result<()> {
    for found in walker.elements() {
        let Some(head) = &found.item.substitution_group else {
            continue;
        };
        let target = walker
            .find_element(head, found.schema)
            .ok_or_else(|| Error::missing(ComponentKind::Element, head))?;
        if !target.item.is_abstract {
            tracing::warn!(
                "element '{}' substitutes for non-abstract '{}'",
                found.item.effective_name(),
                head
            );
        }
    }
    Ok(())
}

fn is_plain_sequence(model: &ModelGroup) -> bool {
    model.compositor == Compositor::Sequence && model.occurs == Occurs::once()
}

/// Append the derived content after the base content
fn extend(base: Option<ModelGroup>, own: Option<ModelGroup>) -> Option<ModelGroup> {
    match (base, own) {
        (None, own) => own,
        (base, None) => base,
        (Some(mut base), Some(own)) if is_plain_sequence(&base) => {
            if is_plain_sequence(&own) {
                base.particles.extend(own.particles);
            } else {
                base.particles.push(Particle::Model(own));
            }
            Some(base)
        }
        (Some(base), Some(own)) => Some(ModelGroup::sequence(vec![
            Particle::Model(base),
            Particle::Model(own),
        ])),
    }
}

/// Apply a restriction's redeclarations to the base content
fn restrict(base: Option<ModelGroup>, own: Option<ModelGroup>) -> Option<ModelGroup> {
    let Some(own) = own else {
        return base;
    };
    let mut base = base.unwrap_or_else(|| ModelGroup::sequence(Vec::new()));
    let mut redeclared = Vec::new();
    element_particles(&own, &mut redeclared);

    for decl in redeclared {
        let narrows_only = decl.reference.is_none() && decl.type_name.is_none() && !decl.has_inline_type();
        match find_element_mut(&mut base, decl.effective_name()) {
            Some(slot) if narrows_only => slot.occurs = decl.occurs,
            Some(slot) => *slot = decl.clone(),
            None if narrows_only => {}
            None => base.particles.push(Particle::Element(decl.clone())),
        }
    }
    Some(base)
}

fn element_particles<'m>(model: &'m ModelGroup, out: &mut Vec<&'m Element>) {
    for particle in &model.particles {
        match particle {
            Particle::Element(element) => out.push(element),
            Particle::Model(nested) => element_particles(nested, out),
            _ => {}
        }
    }
}

fn find_element_mut<'m>(model: &'m mut ModelGroup, name: &str) -> Option<&'m mut Element> {
    for particle in &mut model.particles {
        match particle {
            Particle::Element(element) if element.effective_name() == name => return Some(element),
            Particle::Model(nested) => {
                if let Some(found) = find_element_mut(nested, name) {
                    return Some(found);
                }
            }
            _ => {}
        }
    }
    None
}

/// Local names of every element referenced by `ref` anywhere in the schema
fn referenced_elements(schema: &Schema) -> HashSet<&str> {
    fn visit_model<'s>(model: &'s ModelGroup, out: &mut HashSet<&'s str>) {
        for particle in &model.particles {
            match particle {
                Particle::Element(element) => {
                    if let Some(reference) = &element.reference {
                        out.insert(local_name(reference));
                    }
                    if let Some(ct) = element.complex_type.as_deref() {
                        visit_type(ct, out);
                    }
                }
                Particle::Model(nested) => visit_model(nested, out),
                _ => {}
            }
        }
    }

    fn visit_type<'s>(ct: &'s ComplexType, out: &mut HashSet<&'s str>) {
        if let Some(model) = &ct.content {
            visit_model(model, out);
        }
    }

    let mut out = HashSet::new();
    for ct in schema.complex_types.values() {
        visit_type(ct, &mut out);
    }
    for group in schema.groups.values() {
        visit_model(&group.model, &mut out);
    }
    for element in schema.elements.values() {
        if let Some(ct) = element.complex_type.as_deref() {
            visit_type(ct, &mut out);
        }
    }
    out
}
