//! Immutable dependency graph
//!
//! Edges point from dependent to dependency. A built graph is never patched:
//! changes go through [`GraphBuilder`](crate::GraphBuilder) and produce a new
//! value.

use crate::error::GraphError;
use arbor_spec::Criticality;
use chrono::{DateTime, Utc};
use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graphmap::DiGraphMap;
use petgraph::Direction;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

/// Component type recorded for dependency targets no specification defines
pub const EXTERNAL_TYPE: &str = "external";

/// Origin of a dependency edge
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "label", rename_all = "snake_case")]
pub enum EdgeKind {
    /// `metadata.dependencies`
    Direct,
    /// `cross_dependencies`, with its relationship label
    Cross(String),
    /// Parent depends on child
    Internal,
}

/// Directed dependency edge
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
    pub kind: EdgeKind,
}

/// Per-component graph entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphEntry {
    pub id: String,
    /// Defining specification; `None` for external targets
    pub spec_id: Option<String>,
    pub component_type: String,
    pub criticality: Criticality,
    pub dependencies: BTreeSet<String>,
    pub dependents: BTreeSet<String>,
    pub protocol: Option<String>,
    pub supervision: Option<String>,
    pub resources: Vec<String>,
}

impl GraphEntry {
    /// Entry for a dependency target that no specification defines
    #[must_use]
    pub fn external(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            spec_id: None,
            component_type: EXTERNAL_TYPE.to_string(),
            criticality: Criticality::Normal,
            dependencies: BTreeSet::new(),
            dependents: BTreeSet::new(),
            protocol: None,
            supervision: None,
            resources: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_external(&self) -> bool {
        self.spec_id.is_none()
    }
}

/// Shape summary of a graph
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GraphSummary {
    pub nodes: usize,
    pub edges: usize,
    pub external: usize,
    pub specs: usize,
    pub cyclic: bool,
}

/// Global component dependency graph
#[derive(Debug, Clone, Serialize)]
pub struct DependencyGraph {
    entries: BTreeMap<String, GraphEntry>,
    edges: Vec<Edge>,
    specs: BTreeSet<String>,
    built_at: DateTime<Utc>,
    #[serde(skip)]
    index: HashMap<String, u32>,
    #[serde(skip)]
    names: Vec<String>,
    #[serde(skip)]
    graph: DiGraphMap<u32, ()>,
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::from_parts(BTreeMap::new(), Vec::new(), BTreeSet::new())
    }
}

impl DependencyGraph {
    /// Assemble from entries and deduplicated edges
    ///
    /// Edge endpoints missing from `entries` become external entries.
    pub(crate) fn from_parts(
        mut entries: BTreeMap<String, GraphEntry>,
        edges: Vec<Edge>,
        specs: BTreeSet<String>,
    ) -> Self {
        for entry in entries.values_mut() {
            entry.dependencies.clear();
            entry.dependents.clear();
        }
        for edge in &edges {
            entries
                .entry(edge.from.clone())
                .or_insert_with(|| GraphEntry::external(&edge.from))
                .dependencies
                .insert(edge.to.clone());
            entries
                .entry(edge.to.clone())
                .or_insert_with(|| GraphEntry::external(&edge.to))
                .dependents
                .insert(edge.from.clone());
        }

        let names: Vec<String> = entries.keys().cloned().collect();
        let index: HashMap<String, u32> = names
            .iter()
            .enumerate()
            .filter_map(|(i, n)| u32::try_from(i).ok().map(|i| (n.clone(), i)))
            .collect();

        let mut graph = DiGraphMap::new();
        for i in index.values() {
            graph.add_node(*i);
        }
        for edge in &edges {
            if let (Some(from), Some(to)) = (index.get(&edge.from), index.get(&edge.to)) {
                graph.add_edge(*from, *to, ());
            }
        }

        Self {
            entries,
            edges,
            specs,
            built_at: Utc::now(),
            index,
            names,
            graph,
        }
    }

    #[inline]
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&GraphEntry> {
        self.entries.get(id)
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Entries in id order
    pub fn entries(&self) -> impl Iterator<Item = &GraphEntry> {
        self.entries.values()
    }

    #[inline]
    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ids of the specifications folded into this graph
    #[inline]
    #[must_use]
    pub fn specs(&self) -> &BTreeSet<String> {
        &self.specs
    }

    #[inline]
    #[must_use]
    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    /// Direct dependencies of `id`
    ///
    /// # Errors
    /// `GraphError::NodeNotFound` if `id` is not in the graph.
    pub fn dependencies_of(&self, id: &str) -> Result<&BTreeSet<String>, GraphError> {
        self.entry(id).map(|e| &e.dependencies)
    }

    /// Direct dependents of `id`
    ///
    /// # Errors
    /// `GraphError::NodeNotFound` if `id` is not in the graph.
    pub fn dependents_of(&self, id: &str) -> Result<&BTreeSet<String>, GraphError> {
        self.entry(id).map(|e| &e.dependents)
    }

    /// Every component that transitively depends on `id`
    ///
    /// # Errors
    /// `GraphError::NodeNotFound` if `id` is not in the graph.
    pub fn impacted_by(&self, id: &str) -> Result<BTreeSet<String>, GraphError> {
        self.reachable(id, Direction::Incoming)
    }

    /// Every component `id` transitively depends on
    ///
    /// # Errors
    /// `GraphError::NodeNotFound` if `id` is not in the graph.
    pub fn transitive_dependencies(&self, id: &str) -> Result<BTreeSet<String>, GraphError> {
        self.reachable(id, Direction::Outgoing)
    }

    /// Components ordered so that every dependency precedes its dependents
    ///
    /// # Errors
    /// `GraphError::CycleDetected` naming one strongly connected component.
    pub fn topological_order(&self) -> Result<Vec<String>, GraphError> {
        match toposort(&self.graph, None) {
            Ok(order) => Ok(order.into_iter().rev().map(|i| self.name(i)).collect()),
            Err(_) => Err(GraphError::CycleDetected(
                self.cycles().into_iter().next().unwrap_or_default(),
            )),
        }
    }

    #[must_use]
    pub fn has_cycles(&self) -> bool {
        petgraph::algo::is_cyclic_directed(&self.graph)
    }

    /// Strongly connected components of more than one member, ids sorted
    #[must_use]
    pub fn cycles(&self) -> Vec<Vec<String>> {
        let mut cycles: Vec<Vec<String>> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| scc.len() > 1)
            .map(|scc| {
                let mut ids: Vec<String> = scc.into_iter().map(|i| self.name(i)).collect();
                ids.sort();
                ids
            })
            .collect();
        cycles.sort();
        cycles
    }

    #[must_use]
    pub fn summary(&self) -> GraphSummary {
        GraphSummary {
            nodes: self.entries.len(),
            edges: self.edges.len(),
            external: self.entries.values().filter(|e| e.is_external()).count(),
            specs: self.specs.len(),
            cyclic: self.has_cycles(),
        }
    }

    fn entry(&self, id: &str) -> Result<&GraphEntry, GraphError> {
        self.entries
            .get(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.to_string()))
    }

    fn name(&self, i: u32) -> String {
        usize::try_from(i)
            .ok()
            .and_then(|i| self.names.get(i))
            .cloned()
            .unwrap_or_default()
    }

    fn reachable(&self, id: &str, direction: Direction) -> Result<BTreeSet<String>, GraphError> {
        let start = *self
            .index
            .get(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.to_string()))?;

        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::from([start]);
        while let Some(current) = queue.pop_front() {
            for next in self.graph.neighbors_directed(current, direction) {
                if next != start && seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        Ok(seen.into_iter().map(|i| self.name(i)).collect())
    }
}
