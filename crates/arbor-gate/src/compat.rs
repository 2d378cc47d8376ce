//! Compatibility of a candidate with the existing dependency graph

use arbor_graph::{DependencyGraph, GraphBuilder};
use arbor_spec::Specification;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::fmt;

/// Supervision strategies a component may declare
pub const SUPERVISION_STRATEGIES: &[&str] =
    &["one_for_one", "one_for_all", "rest_for_one", "simple_one_for_one"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "conflict", rename_all = "snake_case")]
pub enum Conflict {
    /// Component id already defined by another specification
    IdCollision { id: String, existing_spec: String },
    /// Dependency cycle that only exists once the candidate is added
    IntroducesCycle { cycle: Vec<String> },
    /// Exclusive resource claimed by both sides
    SharedResource {
        resource: String,
        component: String,
        holder: String,
    },
    ProtocolMismatch {
        component: String,
        dependency: String,
        expected: String,
        found: String,
    },
    UnknownSupervision { component: String, strategy: String },
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IdCollision { id, existing_spec } => {
                write!(f, "component id {id} is already defined by {existing_spec}")
            }
            Self::IntroducesCycle { cycle } => {
                write!(f, "dependency cycle introduced: {}", cycle.join(" -> "))
            }
            Self::SharedResource {
                resource,
                component,
                holder,
            } => write!(f, "{component} claims {resource}, already held by {holder}"),
            Self::ProtocolMismatch {
                component,
                dependency,
                expected,
                found,
            } => write!(
                f,
                "{component} speaks {expected} but dependency {dependency} speaks {found}"
            ),
            Self::UnknownSupervision {
                component,
                strategy,
            } => write!(f, "{component} declares unknown supervision strategy {strategy}"),
        }
    }
}

/// Every conflict between `candidate` and `graph`
pub(crate) fn conflicts(candidate: &Specification, graph: &DependencyGraph) -> Vec<Conflict> {
    let mut out = Vec::new();
    let nodes: Vec<_> = candidate.root.iter().filter(|n| !n.is_placeholder()).collect();
    let own_ids: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
    let foreign = |id: &str| {
        graph
            .get(id)
            .filter(|e| e.spec_id.as_deref().is_some_and(|s| s != candidate.id))
    };

    for node in &nodes {
        if let Some(existing) = foreign(&node.id) {
            out.push(Conflict::IdCollision {
                id: node.id.clone(),
                existing_spec: existing.spec_id.clone().unwrap_or_default(),
            });
        }
    }

    for node in &nodes {
        for resource in node.resources() {
            let holder = graph.entries().find(|e| {
                e.spec_id.as_deref().is_some_and(|s| s != candidate.id)
                    && e.resources.contains(&resource)
            });
            if let Some(holder) = holder {
                out.push(Conflict::SharedResource {
                    resource,
                    component: node.id.clone(),
                    holder: holder.id.clone(),
                });
            }
        }
    }

    for node in &nodes {
        let Some(expected) = node.protocol() else {
            continue;
        };
        for dependency in node.dependencies() {
            let found = candidate
                .root
                .find(&dependency)
                .and_then(arbor_spec::ComponentNode::protocol)
                .or_else(|| graph.get(&dependency).and_then(|e| e.protocol.clone()));
            if let Some(found) = found.filter(|p| *p != expected) {
                out.push(Conflict::ProtocolMismatch {
                    component: node.id.clone(),
                    dependency,
                    expected: expected.clone(),
                    found,
                });
            }
        }
    }

    for node in &nodes {
        if let Some(strategy) = node.supervision() {
            if !SUPERVISION_STRATEGIES.contains(&strategy.as_str()) {
                out.push(Conflict::UnknownSupervision {
                    component: node.id.clone(),
                    strategy,
                });
            }
        }
    }

    let existing: BTreeSet<Vec<String>> = graph.cycles().into_iter().collect();
    let merged = GraphBuilder::from_graph(graph).with_spec(candidate).build();
    for cycle in merged.cycles() {
        if !existing.contains(&cycle) && cycle.iter().any(|id| own_ids.contains(id.as_str())) {
            out.push(Conflict::IntroducesCycle { cycle });
        }
    }

    out
}
