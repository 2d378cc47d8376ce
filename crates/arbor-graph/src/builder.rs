//! Dependency graph construction
//!
//! Unions three edge sources per specification: direct metadata
//! dependencies, explicit cross-references, and structural parent → child
//! edges.

use crate::graph::{DependencyGraph, Edge, EdgeKind, GraphEntry};
use arbor_spec::{ComponentNode, Specification};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Builder for [`DependencyGraph`]
#[derive(Debug, Default, Clone)]
pub struct GraphBuilder {
    entries: BTreeMap<String, GraphEntry>,
    edges: Vec<Edge>,
    specs: BTreeSet<String>,
}

impl GraphBuilder {
    /// Create new empty builder
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing graph's defined components and edges
    #[must_use]
    pub fn from_graph(graph: &DependencyGraph) -> Self {
        Self {
            entries: graph
                .entries()
                .filter(|e| !e.is_external())
                .map(|e| (e.id.clone(), e.clone()))
                .collect(),
            edges: graph.edges().to_vec(),
            specs: graph.specs().clone(),
        }
    }

    /// Fold `spec` into the graph
    ///
    /// A specification already present is replaced wholesale. Placeholder
    /// nodes are skipped.
    pub fn add_spec(&mut self, spec: &Specification) -> &mut Self {
        if self.specs.contains(&spec.id) {
            self.remove_spec(&spec.id);
        }
        self.specs.insert(spec.id.clone());

        for node in spec.root.iter().filter(|n| !n.is_placeholder()) {
            self.add_node(&spec.id, node);
        }
        for cross in &spec.cross_dependencies {
            self.push_edge(&cross.source, &cross.target, EdgeKind::Cross(cross.kind.clone()));
        }
        self
    }

    /// Builder-style [`GraphBuilder::add_spec`]
    #[must_use]
    pub fn with_spec(mut self, spec: &Specification) -> Self {
        self.add_spec(spec);
        self
    }

    /// Finish the graph
    #[must_use]
    pub fn build(self) -> DependencyGraph {
        let mut seen = HashSet::new();
        let edges: Vec<Edge> = self
            .edges
            .into_iter()
            .filter(|e| seen.insert((e.from.clone(), e.to.clone())))
            .collect();

        let graph = DependencyGraph::from_parts(self.entries, edges, self.specs);
        tracing::debug!(
            "Built dependency graph: {} components, {} edges",
            graph.len(),
            graph.edges().len()
        );
        graph
    }

    fn add_node(&mut self, spec_id: &str, node: &ComponentNode) {
        if let Some(existing) = self.entries.get(&node.id) {
            if let Some(owner) = existing.spec_id.as_deref().filter(|owner| *owner != spec_id) {
                tracing::warn!(
                    "Component {} redefined by {} (previously {})",
                    node.id,
                    spec_id,
                    owner
                );
            }
        }

        self.entries.insert(
            node.id.clone(),
            GraphEntry {
                id: node.id.clone(),
                spec_id: Some(spec_id.to_string()),
                component_type: node.component_type(),
                criticality: node.criticality(),
                dependencies: BTreeSet::new(),
                dependents: BTreeSet::new(),
                protocol: node.protocol(),
                supervision: node.supervision(),
                resources: node.resources(),
            },
        );

        for dep in node.dependencies() {
            self.push_edge(&node.id, &dep, EdgeKind::Direct);
        }
        for child in node.children.iter().filter(|c| !c.is_placeholder()) {
            self.push_edge(&node.id, &child.id, EdgeKind::Internal);
        }
    }

    fn push_edge(&mut self, from: &str, to: &str, kind: EdgeKind) {
        if from == to {
            tracing::warn!("Ignoring self-dependency on {}", from);
            return;
        }
        self.edges.push(Edge {
            from: from.to_string(),
            to: to.to_string(),
            kind,
        });
    }

    fn remove_spec(&mut self, spec_id: &str) {
        let removed: HashSet<String> = self
            .entries
            .values()
            .filter(|e| e.spec_id.as_deref() == Some(spec_id))
            .map(|e| e.id.clone())
            .collect();
        self.entries.retain(|id, _| !removed.contains(id));
        self.edges.retain(|e| !removed.contains(&e.from));
        self.specs.remove(spec_id);
    }
}

/// Build a graph from a set of specifications
#[must_use]
pub fn build_graph<'a>(specs: impl IntoIterator<Item = &'a Specification>) -> DependencyGraph {
    let mut builder = GraphBuilder::new();
    for spec in specs {
        builder.add_spec(spec);
    }
    builder.build()
}
