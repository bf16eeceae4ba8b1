//! Schema traversal
//!
//! The [`Walker`] hides the structural variance of a schema graph behind a
//! small set of lookups and iterations:
//!
//! - every schema reachable through bound imports and includes (worklist plus
//!   visited set, so cyclic graphs terminate)
//! - global components across that graph, the nearer schema winning on name
//!   collisions
//! - the resolved elements of a content model, with group references inlined,
//!   occurrence bounds multiplied through and abstract references replaced by
//!   their concrete substitutes
//! - the resolved attributes of a complex type, with attribute groups, global
//!   attribute references and inherited attributes merged
//!
//! All results borrow from the schema graph; nothing is copied.

use std::collections::{HashSet, VecDeque};

use indexmap::IndexMap;

use crate::error::{ComponentKind, Error, Result};
use crate::limits::Limits;
use crate::model::{
    builtin_kind, Attribute, AttributeGroup, AttributeUse, ComplexType, Compositor,
    DerivationMethod, Element, Group, ModelGroup, Occurs, Particle, ScalarKind, Schema, SchemaId,
    SimpleType, SimpleVariety,
};
use crate::names::{local_name, split_qname};
use crate::namespaces::refers_to_xsd;

/// A schema reached during traversal
#[derive(Debug, Clone, Copy)]
pub struct Reached<'a> {
    /// The schema
    pub schema: &'a Schema,
    /// Whether the schema lies outside the root's include closure
    pub external: bool,
}

/// A global component together with the schema that declares it
#[derive(Debug)]
pub struct Found<'a, T> {
    /// The component
    pub item: &'a T,
    /// Schema the component was found in; references inside the component
    /// resolve in this schema's context
    pub schema: &'a Schema,
    /// Whether the declaring schema was reached through an import
    pub external: bool,
}

impl<T> Clone for Found<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Found<'_, T> {}

/// Which members of a complex type a walk covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentScope {
    /// Only the members the type itself declares
    Own,
    /// Base-first merge over the whole derivation chain
    #[default]
    Inherited,
}

/// The type an element or attribute is declared with
#[derive(Debug, Clone, Copy)]
pub enum TypeRef<'a> {
    /// A complex type, named or anonymous
    Complex(Found<'a, ComplexType>),
    /// A simple type, named or anonymous
    Simple(Found<'a, SimpleType>),
    /// A built-in XSD type
    Builtin(ScalarKind),
}

/// Scalar shape of a simple value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScalarType {
    /// Kind of each value
    pub kind: ScalarKind,
    /// Whitespace-separated list of values
    pub list: bool,
}

impl ScalarType {
    /// A single value of the given kind
    pub fn of(kind: ScalarKind) -> Self {
        Self { kind, list: false }
    }
}

/// One element of a resolved content model
#[derive(Debug, Clone, Copy)]
pub struct WalkedElement<'a> {
    /// Name the element carries in instance documents
    pub name: &'a str,
    /// Declaration: the local declaration, the referenced global element or
    /// the concrete substitute
    pub decl: &'a Element,
    /// Schema the declaration belongs to
    pub schema: &'a Schema,
    /// Effective occurrence bounds at this position
    pub occurs: Occurs,
    /// Compositor of the group the particle sits in
    pub source: Compositor,
    /// May be absent (minOccurs 0 or inside a choice)
    pub optional: bool,
    /// Repeats (maxOccurs other than 1)
    pub array: bool,
    /// Abstract head this entry substitutes for
    pub substitutes: Option<&'a str>,
}

/// One attribute of a resolved complex type
#[derive(Debug, Clone, Copy)]
pub struct WalkedAttribute<'a> {
    /// Attribute name
    pub name: &'a str,
    /// Declaration (the global one for references)
    pub decl: &'a Attribute,
    /// Schema the declaration belongs to
    pub schema: &'a Schema,
    /// Use mode at the point of use
    pub use_mode: AttributeUse,
}

impl WalkedAttribute<'_> {
    /// Check if the attribute may be absent
    pub fn is_optional(&self) -> bool {
        self.use_mode != AttributeUse::Required
    }
}

/// Lazy traversal over a schema and everything it links to
#[derive(Debug, Clone)]
pub struct Walker<'a> {
    root: &'a Schema,
    limits: Limits,
    locals: HashSet<SchemaId>,
}

impl<'a> Walker<'a> {
    /// Create a walker rooted at `schema`
    pub fn new(schema: &'a Schema) -> Self {
        Self::with_limits(schema, Limits::default())
    }

    /// Create a walker with explicit limits
    pub fn with_limits(schema: &'a Schema, limits: Limits) -> Self {
        let mut locals = HashSet::new();
        let mut queue = vec![schema];
        while let Some(current) = queue.pop() {
            if locals.insert(current.id()) {
                queue.extend(current.included_schemas().map(|s| s.as_ref()));
            }
        }
        Self {
            root: schema,
            limits,
            locals,
        }
    }

    /// The root schema
    pub fn root(&self) -> &'a Schema {
        self.root
    }

    /// Limits in effect
    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Check if a schema lies outside the root's include closure
    pub fn is_external(&self, schema: &Schema) -> bool {
        !self.locals.contains(&schema.id())
    }

    /// Every schema reachable from the root, root first
    pub fn schemas(&self) -> SchemaIter<'_, 'a> {
        self.reachable_from(self.root)
    }

    /// Every schema reachable from `start`, `start` first
    pub fn reachable_from(&self, start: &'a Schema) -> SchemaIter<'_, 'a> {
        let mut queue = VecDeque::new();
        queue.push_back(start);
        SchemaIter {
            walker: self,
            queue,
            visited: HashSet::new(),
        }
    }

    /// All complex types across the graph; the nearer schema wins on collision
    pub fn complex_types(&self) -> impl Iterator<Item = Found<'a, ComplexType>> + '_ {
        self.globals(|schema| &schema.complex_types)
    }

    /// All simple types across the graph; the nearer schema wins on collision
    pub fn simple_types(&self) -> impl Iterator<Item = Found<'a, SimpleType>> + '_ {
        self.globals(|schema| &schema.simple_types)
    }

    /// All top-level elements across the graph
    pub fn elements(&self) -> impl Iterator<Item = Found<'a, Element>> + '_ {
        self.globals(|schema| &schema.elements)
    }

    fn globals<T: 'a>(
        &self,
        table: fn(&'a Schema) -> &'a IndexMap<String, T>,
    ) -> impl Iterator<Item = Found<'a, T>> + '_ {
        let mut seen = HashSet::new();
        self.schemas()
            .flat_map(move |reached| {
                table(reached.schema).iter().map(move |(name, item)| {
                    (
                        name,
                        Found {
                            item,
                            schema: reached.schema,
                            external: reached.external,
                        },
                    )
                })
            })
            .filter(move |(name, _)| seen.insert(name.as_str()))
            .map(|(_, found)| found)
    }

    fn search<T>(
        &self,
        qname: &str,
        ctx: &'a Schema,
        table: fn(&'a Schema) -> &'a IndexMap<String, T>,
    ) -> Option<Found<'a, T>> {
        let (prefix, local) = split_qname(qname);
        let wanted = prefix.and_then(|p| ctx.namespaces.get(p)).map(String::as_str);
        let mut fallback = None;

        for reached in self.reachable_from(ctx) {
            let Some(item) = table(reached.schema).get(local) else {
                continue;
            };
            let found = Found {
                item,
                schema: reached.schema,
                external: reached.external,
            };
            let namespace = reached.schema.target_namespace.as_deref();
            match wanted {
                Some(ns) if namespace.is_some() && namespace != Some(ns) => {
                    fallback.get_or_insert(found);
                }
                _ => return Some(found),
            }
        }
        fallback
    }

    /// Find a complex type by (possibly prefixed) name, from `ctx` outwards
    pub fn find_complex_type(&self, name: &str, ctx: &'a Schema) -> Option<Found<'a, ComplexType>> {
        self.search(name, ctx, |s| &s.complex_types)
    }

    /// Find a simple type by name
    pub fn find_simple_type(&self, name: &str, ctx: &'a Schema) -> Option<Found<'a, SimpleType>> {
        self.search(name, ctx, |s| &s.simple_types)
    }

    /// Find a top-level element by name
    pub fn find_element(&self, name: &str, ctx: &'a Schema) -> Option<Found<'a, Element>> {
        self.search(name, ctx, |s| &s.elements)
    }

    /// Find a named model group
    pub fn find_group(&self, name: &str, ctx: &'a Schema) -> Option<Found<'a, Group>> {
        self.search(name, ctx, |s| &s.groups)
    }

    /// Find a named attribute group
    pub fn find_attribute_group(&self, name: &str, ctx: &'a Schema) -> Option<Found<'a, AttributeGroup>> {
        self.search(name, ctx, |s| &s.attribute_groups)
    }

    /// Find a global attribute
    pub fn find_attribute(&self, name: &str, ctx: &'a Schema) -> Option<Found<'a, Attribute>> {
        self.search(name, ctx, |s| &s.attributes)
    }

    /// Resolve a type name: complex types, then simple types, then built-ins
    pub fn resolve_type(&self, name: &str, ctx: &'a Schema) -> Result<TypeRef<'a>> {
        let local = local_name(name);
        if refers_to_xsd(&ctx.namespaces, name) {
            if let Some(kind) = builtin_kind(local) {
                return Ok(TypeRef::Builtin(kind));
            }
        }
        if let Some(found) = self.find_complex_type(name, ctx) {
            return Ok(TypeRef::Complex(found));
        }
        if let Some(found) = self.find_simple_type(name, ctx) {
            return Ok(TypeRef::Simple(found));
        }
        builtin_kind(local)
            .map(TypeRef::Builtin)
            .ok_or_else(|| Error::missing(ComponentKind::Type, name))
    }

    /// Type of an element declaration
    ///
    /// Inline types come first, then the `type` attribute. An element with
    /// neither takes a same-named complex type when one exists, else anyType.
    pub fn element_type(&self, decl: &'a Element, ctx: &'a Schema) -> Result<TypeRef<'a>> {
        let external = self.is_external(ctx);
        if let Some(ct) = decl.complex_type.as_deref() {
            return Ok(TypeRef::Complex(Found {
                item: ct,
                schema: ctx,
                external,
            }));
        }
        if let Some(st) = decl.simple_type.as_deref() {
            return Ok(TypeRef::Simple(Found {
                item: st,
                schema: ctx,
                external,
            }));
        }
        if let Some(type_name) = &decl.type_name {
            return self.resolve_type(type_name, ctx);
        }
        Ok(decl
            .name
            .as_deref()
            .and_then(|name| self.find_complex_type(name, ctx))
            .map(TypeRef::Complex)
            .unwrap_or(TypeRef::Builtin(ScalarKind::Any)))
    }

    /// Type of an attribute declaration; untyped attributes are strings
    pub fn attribute_type(&self, decl: &'a Attribute, ctx: &'a Schema) -> Result<TypeRef<'a>> {
        if let Some(st) = decl.simple_type.as_deref() {
            return Ok(TypeRef::Simple(Found {
                item: st,
                schema: ctx,
                external: self.is_external(ctx),
            }));
        }
        match &decl.type_name {
            Some(type_name) => self.resolve_type(type_name, ctx),
            None => Ok(TypeRef::Builtin(ScalarKind::String)),
        }
    }

    /// Concrete elements that may stand in for an abstract head
    ///
    /// Abstract intermediates are followed transitively and never returned.
    pub fn substitutes(&self, head: &'a Element) -> Vec<Found<'a, Element>> {
        let mut result = Vec::new();
        let mut visited = HashSet::new();
        let mut pending = vec![head.effective_name()];

        while let Some(head_name) = pending.pop() {
            if !visited.insert(head_name) {
                continue;
            }
            for found in self.substitution_members(head_name) {
                if found.item.is_abstract {
                    pending.push(found.item.effective_name());
                } else if !result
                    .iter()
                    .any(|f: &Found<'a, Element>| std::ptr::eq(f.item, found.item))
                {
                    result.push(found);
                }
            }
        }
        result
    }

    fn substitution_members(&self, head_name: &str) -> Vec<Found<'a, Element>> {
        self.schemas()
            .flat_map(|reached| {
                reached.schema.elements.values().filter_map(move |element| {
                    let group = element.substitution_group.as_deref()?;
                    (local_name(group) == head_name).then_some(Found {
                        item: element,
                        schema: reached.schema,
                        external: reached.external,
                    })
                })
            })
            .collect()
    }

    /// Lazily walk the elements of a content model
    pub fn content(&self, model: &'a ModelGroup, ctx: &'a Schema) -> ContentWalk<'_, 'a> {
        ContentWalk {
            walker: self,
            stack: vec![Frame {
                particles: model.particles.iter(),
                compositor: model.compositor,
                occurs: model.occurs,
                in_choice: model.compositor == Compositor::Choice,
                schema: ctx,
                group: None,
            }],
            pending: VecDeque::new(),
        }
    }

    /// Derivation chain of a complex type: the type first, then its bases
    ///
    /// The chain stops at a base that is not a complex type (a simple or
    /// built-in type). A base that names nothing is a schema defect.
    pub fn derivation_chain(
        &self,
        ct: &'a ComplexType,
        ctx: &'a Schema,
    ) -> Result<Vec<Found<'a, ComplexType>>> {
        let mut chain = vec![Found {
            item: ct,
            schema: ctx,
            external: self.is_external(ctx),
        }];

        while let Some(current) = chain.last().copied() {
            let Some(base) = current.item.base() else {
                break;
            };
            let next = match self.resolve_type(base, current.schema)? {
                TypeRef::Complex(found) => found,
                _ => break,
            };
            if chain.iter().any(|f| std::ptr::eq(f.item, next.item)) {
                return Err(Error::Schema(format!(
                    "circular derivation of complex type '{}'",
                    ct.name.as_deref().unwrap_or(base)
                )));
            }
            self.limits.check_derivation_depth(chain.len())?;
            chain.push(next);
        }
        Ok(chain)
    }

    /// Resolved elements of a complex type
    ///
    /// With [`ContentScope::Inherited`] the chain is merged base first: an
    /// extension appends its members, a restriction replaces same-named
    /// members with its typed redeclarations and narrows the occurrence of
    /// members it redeclares without a type.
    pub fn complex_elements(
        &self,
        ct: &'a ComplexType,
        ctx: &'a Schema,
        scope: ContentScope,
    ) -> Result<Vec<WalkedElement<'a>>> {
        if scope == ContentScope::Own {
            return self.own_elements(ct, ctx);
        }

        let chain = self.derivation_chain(ct, ctx)?;
        let mut merged: Vec<WalkedElement<'a>> = Vec::new();
        for step in chain.iter().rev() {
            let own = self.own_elements(step.item, step.schema)?;
            if step.item.complex_method() != Some(DerivationMethod::Restriction) {
                merged.extend(own);
                continue;
            }
            for member in own {
                let existing = merged.iter_mut().find(|m| m.name == member.name);
                match existing {
                    Some(slot) if declares_nothing(member.decl) => {
                        slot.occurs = member.occurs;
                        slot.optional = member.optional;
                        slot.array = member.array;
                    }
                    Some(slot) => *slot = member,
                    None if declares_nothing(member.decl) => {}
                    None => merged.push(member),
                }
            }
        }
        Ok(merged)
    }

    fn own_elements(&self, ct: &'a ComplexType, ctx: &'a Schema) -> Result<Vec<WalkedElement<'a>>> {
        match &ct.content {
            Some(model) => self.content(model, ctx).collect(),
            None => Ok(Vec::new()),
        }
    }

    /// Check if a complex type admits wildcard element content
    pub fn has_wildcard(&self, ct: &'a ComplexType, ctx: &'a Schema, scope: ContentScope) -> Result<bool> {
        let chain = match scope {
            ContentScope::Own => vec![Found {
                item: ct,
                schema: ctx,
                external: false,
            }],
            ContentScope::Inherited => self.derivation_chain(ct, ctx)?,
        };
        for step in chain {
            if let Some(model) = &step.item.content {
                if self.model_has_wildcard(model, step.schema, &mut HashSet::new()) {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    fn model_has_wildcard(&self, model: &'a ModelGroup, ctx: &'a Schema, seen: &mut HashSet<&'a str>) -> bool {
        model.particles.iter().any(|particle| match particle {
            Particle::Any(_) => true,
            Particle::Model(nested) => self.model_has_wildcard(nested, ctx, seen),
            Particle::Group(group_ref) => match self.find_group(&group_ref.reference, ctx) {
                Some(found) if seen.insert(group_ref.reference.as_str()) => {
                    self.model_has_wildcard(&found.item.model, found.schema, seen)
                }
                _ => false,
            },
            Particle::Element(_) => false,
        })
    }

    /// Resolved attributes of a complex type
    ///
    /// Own scope returns the type's own declarations, prohibited ones
    /// included. Inherited scope merges base first: later declarations replace
    /// same-named ones and prohibited uses remove them.
    pub fn complex_attributes(
        &self,
        ct: &'a ComplexType,
        ctx: &'a Schema,
        scope: ContentScope,
    ) -> Result<Vec<WalkedAttribute<'a>>> {
        if scope == ContentScope::Own {
            return self.own_attributes(ct, ctx);
        }

        let mut merged: Vec<WalkedAttribute<'a>> = Vec::new();
        for step in self.derivation_chain(ct, ctx)?.iter().rev() {
            for attribute in self.own_attributes(step.item, step.schema)? {
                merged.retain(|a| a.name != attribute.name);
                if attribute.use_mode != AttributeUse::Prohibited {
                    merged.push(attribute);
                }
            }
        }
        Ok(merged)
    }

    fn own_attributes(&self, ct: &'a ComplexType, ctx: &'a Schema) -> Result<Vec<WalkedAttribute<'a>>> {
        let mut result = Vec::new();
        let mut seen = HashSet::new();
        self.collect_attributes(&ct.attributes, &ct.attribute_groups, ctx, &mut seen, &mut result)?;
        Ok(result)
    }

    fn collect_attributes(
        &self,
        attributes: &'a [Attribute],
        groups: &'a [String],
        ctx: &'a Schema,
        seen: &mut HashSet<&'a str>,
        out: &mut Vec<WalkedAttribute<'a>>,
    ) -> Result<()> {
        for attribute in attributes {
            let walked = match &attribute.reference {
                Some(reference) => {
                    let found = self
                        .find_attribute(reference, ctx)
                        .ok_or_else(|| Error::missing(ComponentKind::Attribute, reference))?;
                    WalkedAttribute {
                        name: found.item.effective_name(),
                        decl: found.item,
                        schema: found.schema,
                        use_mode: attribute.use_mode,
                    }
                }
                None => WalkedAttribute {
                    name: attribute.effective_name(),
                    decl: attribute,
                    schema: ctx,
                    use_mode: attribute.use_mode,
                },
            };
            out.retain(|a| a.name != walked.name);
            out.push(walked);
        }

        for reference in groups {
            if !seen.insert(reference.as_str()) {
                continue;
            }
            let found = self
                .find_attribute_group(reference, ctx)
                .ok_or_else(|| Error::missing(ComponentKind::AttributeGroup, reference))?;
            self.collect_attributes(
                &found.item.attributes,
                &found.item.attribute_groups,
                found.schema,
                seen,
                out,
            )?;
        }
        Ok(())
    }

    /// Scalar shape of the text content of a simpleContent type
    pub fn content_scalar(&self, ct: &'a ComplexType, ctx: &'a Schema) -> Result<Option<ScalarType>> {
        self.content_scalar_at(ct, ctx, 0)
    }

    fn content_scalar_at(&self, ct: &'a ComplexType, ctx: &'a Schema, depth: usize) -> Result<Option<ScalarType>> {
        if !ct.has_simple_content() {
            return Ok(None);
        }
        self.limits.check_derivation_depth(depth)?;
        match ct.base() {
            Some(base) => self.named_scalar_at(base, ctx, depth + 1).map(Some),
            None => Ok(Some(ScalarType::of(ScalarKind::String))),
        }
    }

    /// Scalar shape of a simple type
    pub fn simple_scalar(&self, st: &'a SimpleType, ctx: &'a Schema) -> Result<ScalarType> {
        self.simple_scalar_at(st, ctx, 0)
    }

    /// Scalar shape of a type reference; complex types without simple
    /// content read as strings
    pub fn scalar_of(&self, type_ref: TypeRef<'a>) -> Result<ScalarType> {
        match type_ref {
            TypeRef::Builtin(kind) => Ok(ScalarType::of(kind)),
            TypeRef::Simple(found) => self.simple_scalar_at(found.item, found.schema, 0),
            TypeRef::Complex(found) => Ok(self
                .content_scalar_at(found.item, found.schema, 0)?
                .unwrap_or(ScalarType::of(ScalarKind::String))),
        }
    }

    fn simple_scalar_at(&self, st: &'a SimpleType, ctx: &'a Schema, depth: usize) -> Result<ScalarType> {
        self.limits.check_derivation_depth(depth)?;
        match &st.variety {
            SimpleVariety::Restriction(restriction) => {
                if let Some(inner) = restriction.simple_type.as_deref() {
                    self.simple_scalar_at(inner, ctx, depth + 1)
                } else if let Some(base) = &restriction.base {
                    self.named_scalar_at(base, ctx, depth + 1)
                } else {
                    Ok(ScalarType::of(ScalarKind::String))
                }
            }
            SimpleVariety::Union(_) => Ok(ScalarType::of(ScalarKind::String)),
            SimpleVariety::List(list) => {
                let item = if let Some(inner) = list.simple_type.as_deref() {
                    self.simple_scalar_at(inner, ctx, depth + 1)?
                } else if let Some(item_type) = &list.item_type {
                    self.named_scalar_at(item_type, ctx, depth + 1)?
                } else {
                    ScalarType::of(ScalarKind::String)
                };
                Ok(ScalarType {
                    kind: item.kind,
                    list: true,
                })
            }
        }
    }

    fn named_scalar_at(&self, name: &str, ctx: &'a Schema, depth: usize) -> Result<ScalarType> {
        match self.resolve_type(name, ctx)? {
            TypeRef::Builtin(kind) => Ok(ScalarType::of(kind)),
            TypeRef::Simple(found) => self.simple_scalar_at(found.item, found.schema, depth),
            TypeRef::Complex(found) => Ok(self
                .content_scalar_at(found.item, found.schema, depth)?
                .unwrap_or(ScalarType::of(ScalarKind::String))),
        }
    }
}

/// A redeclaration with no type narrows occurrence only
fn declares_nothing(decl: &Element) -> bool {
    decl.type_name.is_none() && !decl.has_inline_type()
}

/// Iterator over reachable schemas, breadth first
pub struct SchemaIter<'w, 'a> {
    walker: &'w Walker<'a>,
    queue: VecDeque<&'a Schema>,
    visited: HashSet<SchemaId>,
}

impl<'a> Iterator for SchemaIter<'_, 'a> {
    type Item = Reached<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(schema) = self.queue.pop_front() {
            if !self.visited.insert(schema.id()) {
                continue;
            }
            self.queue.extend(schema.included_schemas().map(|s| s.as_ref()));
            self.queue.extend(schema.imported_schemas().map(|s| s.as_ref()));
            return Some(Reached {
                schema,
                external: self.walker.is_external(schema),
            });
        }
        None
    }
}

struct Frame<'a> {
    particles: std::slice::Iter<'a, Particle>,
    compositor: Compositor,
    occurs: Occurs,
    in_choice: bool,
    schema: &'a Schema,
    group: Option<&'a str>,
}

/// Lazy iterator over the elements of a content model
///
/// Nested groups are walked with an explicit stack. Abstract references
/// expand to one entry per concrete substitute, buffered in `pending`.
pub struct ContentWalk<'w, 'a> {
    walker: &'w Walker<'a>,
    stack: Vec<Frame<'a>>,
    pending: VecDeque<WalkedElement<'a>>,
}

impl<'a> ContentWalk<'_, 'a> {
    fn walked(
        &self,
        decl: &'a Element,
        schema: &'a Schema,
        occurs: Occurs,
        frame: (Compositor, bool),
    ) -> WalkedElement<'a> {
        let (source, in_choice) = frame;
        WalkedElement {
            name: decl.effective_name(),
            decl,
            schema,
            occurs,
            source,
            optional: in_choice || occurs.is_emptiable(),
            array: occurs.is_multiple(),
            substitutes: None,
        }
    }

    fn element(&mut self, element: &'a Element, frame: (Compositor, bool, Occurs, &'a Schema)) -> Result<()> {
        let (compositor, in_choice, outer, ctx) = frame;
        let occurs = element.occurs.within(&outer);

        let Some(reference) = &element.reference else {
            let walked = self.walked(element, ctx, occurs, (compositor, in_choice));
            self.pending.push_back(walked);
            return Ok(());
        };

        let target = self
            .walker
            .find_element(reference, ctx)
            .ok_or_else(|| Error::missing(ComponentKind::Element, reference))?;
        if !target.item.is_abstract {
            let walked = self.walked(target.item, target.schema, occurs, (compositor, in_choice));
            self.pending.push_back(walked);
            return Ok(());
        }

        let substitutes = self.walker.substitutes(target.item);
        if substitutes.is_empty() {
            tracing::debug!("abstract element '{}' has no substitutes", reference);
        }
        for found in substitutes {
            let mut walked = self.walked(found.item, found.schema, occurs, (compositor, in_choice));
            walked.substitutes = Some(target.item.effective_name());
            self.pending.push_back(walked);
        }
        Ok(())
    }

    fn step(&mut self) -> Result<bool> {
        let Some(frame) = self.stack.last_mut() else {
            return Ok(false);
        };
        let Some(particle) = frame.particles.next() else {
            self.stack.pop();
            return Ok(true);
        };
        let (compositor, in_choice, outer, ctx) = (frame.compositor, frame.in_choice, frame.occurs, frame.schema);

        match particle {
            Particle::Element(element) => self.element(element, (compositor, in_choice, outer, ctx))?,
            Particle::Model(model) => self.stack.push(Frame {
                particles: model.particles.iter(),
                compositor: model.compositor,
                occurs: model.occurs.within(&outer),
                in_choice: in_choice || model.compositor == Compositor::Choice,
                schema: ctx,
                group: None,
            }),
            Particle::Group(group_ref) => {
                let found = self
                    .walker
                    .find_group(&group_ref.reference, ctx)
                    .ok_or_else(|| Error::missing(ComponentKind::Group, &group_ref.reference))?;
                let name = local_name(&group_ref.reference);
                if self.stack.iter().any(|f| f.group == Some(name)) {
                    return Err(Error::Schema(format!("circular group reference '{}'", name)));
                }
                self.walker.limits.check_derivation_depth(self.stack.len())?;
                let model = &found.item.model;
                self.stack.push(Frame {
                    particles: model.particles.iter(),
                    compositor: model.compositor,
                    occurs: model.occurs.within(&group_ref.occurs.within(&outer)),
                    in_choice: in_choice || model.compositor == Compositor::Choice,
                    schema: found.schema,
                    group: Some(name),
                });
            }
            Particle::Any(_) => {}
        }
        Ok(true)
    }
}

impl<'a> Iterator for ContentWalk<'_, 'a> {
    type Item = Result<WalkedElement<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(walked) = self.pending.pop_front() {
                return Some(Ok(walked));
            }
            match self.step() {
                Ok(true) => continue,
                Ok(false) => return None,
                Err(e) => {
                    self.stack.clear();
                    return Some(Err(e));
                }
            }
        }
    }
}
