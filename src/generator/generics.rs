//! Generic parameter propagation
//!
//! A type that references an abstract element directly gets a type
//! parameter standing for the set of values its substitutes can take. Any
//! type that names a parameterized type, through a member or its base, must
//! carry the same parameter. The set of parameterized types is the least
//! fixed point of that rule over the type-dependency graph.

use std::collections::BTreeSet;

use indexmap::IndexMap;

/// Directed graph from each type to the types it names
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    edges: IndexMap<String, BTreeSet<String>>,
}

impl DependencyGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type with no dependencies yet
    pub fn add_node(&mut self, name: impl Into<String>) {
        self.edges.entry(name.into()).or_default();
    }

    /// Record that `from` names `to`
    pub fn add_edge(&mut self, from: impl Into<String>, to: impl Into<String>) {
        let to = to.into();
        self.edges.entry(from.into()).or_default().insert(to.clone());
        self.edges.entry(to).or_default();
    }

    /// Types named by `name`
    pub fn dependencies(&self, name: &str) -> Option<&BTreeSet<String>> {
        self.edges.get(name)
    }

    /// All registered types in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.edges.keys().map(String::as_str)
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Check if the graph has no types
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Close `seeds` under "depends on a member of the set"
    ///
    /// Passes repeat until one adds nothing, so the result is a fixed point:
    /// propagating it again returns it unchanged. Types with no path to a
    /// seed are never added.
    pub fn propagate<I, S>(&self, seeds: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut generic: BTreeSet<String> = seeds.into_iter().map(Into::into).collect();
        let mut passes = 0;
        loop {
            passes += 1;
            let mut added = Vec::new();
            for (node, deps) in &self.edges {
                if !generic.contains(node) && deps.iter().any(|d| generic.contains(d)) {
                    added.push(node.clone());
                }
            }
            if added.is_empty() {
                break;
            }
            generic.extend(added);
        }
        tracing::trace!(
            "generic propagation settled after {} pass(es) with {} type(s)",
            passes,
            generic.len()
        );
        generic
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(edges: &[(&str, &str)]) -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        for (from, to) in edges {
            graph.add_edge(*from, *to);
        }
        graph
    }

    #[test]
    fn test_propagates_through_chains() {
        let g = graph(&[("Root", "Objects"), ("Package", "Root"), ("Objects", "Text")]);
        let generic = g.propagate(["Objects"]);
        assert_eq!(
            generic.into_iter().collect::<Vec<_>>(),
            vec!["Objects", "Package", "Root"]
        );
    }

    #[test]
    fn test_fixed_point() {
        let g = graph(&[("A", "B"), ("B", "C"), ("C", "A"), ("D", "E"), ("F", "C")]);
        let once = g.propagate(["C"]);
        let twice = g.propagate(once.iter().cloned());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_unrelated_types_never_marked() {
        let g = graph(&[("A", "Seed"), ("Unrelated", "Other"), ("Other", "Leaf")]);
        let generic = g.propagate(["Seed"]);
        assert!(generic.contains("A"));
        assert!(!generic.contains("Unrelated"));
        assert!(!generic.contains("Other"));
        assert!(!generic.contains("Leaf"));
    }

    #[test]
    fn test_no_seeds() {
        let g = graph(&[("A", "B")]);
        assert!(g.propagate(Vec::<String>::new()).is_empty());
        assert_eq!(g.len(), 2);
    }
}
