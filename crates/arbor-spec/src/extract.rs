//! Read-only aggregate walks over a specification's tree
//!
//! Each walk is independent: none mutates the tree and they may run in any
//! order or concurrently.

use crate::document::{CrossDependency, Specification};
use crate::node::{CodeRef, PerformanceThresholds};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Dependencies declared by a specification
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencySummary {
    /// `metadata.dependencies` per component id
    pub direct: BTreeMap<String, Vec<String>>,
    /// Explicit `cross_dependencies`
    pub cross: Vec<CrossDependency>,
    /// Structural `(parent, child)` edges
    pub internal: Vec<(String, String)>,
}

impl DependencySummary {
    /// Total number of dependency edges of all three kinds
    #[must_use]
    pub fn total(&self) -> usize {
        self.direct.values().map(Vec::len).sum::<usize>() + self.cross.len() + self.internal.len()
    }
}

/// Aggregate every dependency declared in `spec`
#[must_use]
pub fn extract_dependencies(spec: &Specification) -> DependencySummary {
    let mut summary = DependencySummary {
        cross: spec.cross_dependencies.clone(),
        ..DependencySummary::default()
    };

    for node in spec.root.iter() {
        let deps = node.dependencies();
        if !deps.is_empty() {
            summary.direct.insert(node.id.clone(), deps);
        }
        for child in &node.children {
            summary.internal.push((node.id.clone(), child.id.clone()));
        }
    }

    summary
}

/// A code reference and the component declaring it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeReference {
    pub component_id: String,
    pub code_ref: CodeRef,
    pub module: Option<String>,
}

/// Collect every `code_ref` in the tree, pre-order
#[must_use]
pub fn extract_code_references(spec: &Specification) -> Vec<CodeReference> {
    spec.root
        .iter()
        .filter_map(|node| {
            node.code_ref.as_ref().map(|code_ref| CodeReference {
                component_id: node.id.clone(),
                code_ref: code_ref.clone(),
                module: node.module.clone(),
            })
        })
        .collect()
}

/// Collect declared performance thresholds keyed by component id
#[must_use]
pub fn extract_performance_expectations(
    spec: &Specification,
) -> BTreeMap<String, PerformanceThresholds> {
    spec.root
        .iter()
        .filter_map(|node| node.performance().map(|p| (node.id.clone(), p)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::SourceInfo;
    use serde_yaml::Value;

    fn spec() -> Specification {
        let yaml = r"
id: app
name: App
version: '1.0'
metadata:
  dependencies: [logger]
  performance:
    latency_ms: 100
children:
  - id: api
    name: API
    code_ref: lib/api.ex:1-10
    metadata:
      dependencies: [db, cache]
      performance:
        latency_ms: 20
        memory_mb: 64
  - id: db
    name: DB
cross_dependencies:
  - source: api
    target: db
    type: query
";
        let document: Value = serde_yaml::from_str(yaml).unwrap();
        Specification::from_document(document, SourceInfo::stamp("app.yaml", yaml.as_bytes()))
            .unwrap()
    }

    #[test]
    fn dependencies_are_aggregated() {
        let deps = extract_dependencies(&spec());
        assert_eq!(deps.direct["app"], vec!["logger"]);
        assert_eq!(deps.direct["api"], vec!["db", "cache"]);
        assert_eq!(deps.internal.len(), 2);
        assert_eq!(deps.cross[0].kind, "query");
        assert_eq!(deps.total(), 6);
    }

    #[test]
    fn code_references_are_collected() {
        let refs = extract_code_references(&spec());
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].component_id, "api");
        assert_eq!(refs[0].code_ref.path, "lib/api.ex");
    }

    #[test]
    fn performance_expectations_are_keyed_by_component() {
        let perf = extract_performance_expectations(&spec());
        assert_eq!(perf.len(), 2);
        assert_eq!(perf["api"].memory_mb, Some(64.0));
        assert_eq!(perf["app"].latency_ms, Some(100.0));
    }

    #[test]
    fn walks_do_not_mutate() {
        let s = spec();
        let before = s.clone();
        let _ = extract_performance_expectations(&s);
        let _ = extract_code_references(&s);
        let _ = extract_dependencies(&s);
        assert_eq!(s, before);
    }
}
