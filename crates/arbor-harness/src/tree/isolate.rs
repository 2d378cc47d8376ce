//! Depth-first isolation of failing subtrees

use super::results::{CoverageReport, IsolationReport};
use crate::classify::FailureType;
use arbor_spec::ComponentNode;
use std::collections::HashSet;

/// Walk each failing subtree root-to-leaf to its minimal failing unit
///
/// A subtree root is a failed node whose parent passed (or the failed root).
/// The walk follows the first failing child at every step.
pub(crate) fn depth_first(root: &ComponentNode, coverage: &CoverageReport) -> Vec<IsolationReport> {
    let failed: HashSet<&str> = coverage.failures().map(|r| r.component_id.as_str()).collect();
    let is_failed = |node: &ComponentNode| failed.contains(node.id.as_str());

    root.iter()
        .filter(|node| is_failed(*node))
        .filter(|node| {
            node.parent_id
                .as_deref()
                .map_or(true, |parent| !failed.contains(parent))
        })
        .map(|subtree| {
            let mut path = vec![subtree.id.clone()];
            let mut current = subtree;
            while let Some(child) = current.children.iter().find(|c| is_failed(*c)) {
                path.push(child.id.clone());
                current = child;
            }

            let message = coverage
                .result(&current.id)
                .and_then(|r| r.message.as_deref())
                .unwrap_or_default();
            let failure_type = FailureType::from_message(message);

            IsolationReport {
                failed_component: subtree.id.clone(),
                path,
                minimal_failing_unit: current.id.clone(),
                failure_type,
                hypothesis: failure_type.hypothesis(&current.id),
                remediation: failure_type.remediation().to_string(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::results::NodeResult;

    fn tree() -> ComponentNode {
        let mut root = ComponentNode::new("root", "Root", 0, None);
        let mut a = ComponentNode::new("a", "A", 1, Some("root".into()));
        let mut a1 = ComponentNode::new("a1", "A1", 2, Some("a".into()));
        a1.children
            .push(ComponentNode::new("a1x", "A1x", 3, Some("a1".into())));
        a.children.push(a1);
        a.children
            .push(ComponentNode::new("a2", "A2", 2, Some("a".into())));
        root.children.push(a);
        root.children
            .push(ComponentNode::new("b", "B", 1, Some("root".into())));
        root
    }

    fn coverage(root: &ComponentNode, failing: &[(&str, &str)]) -> CoverageReport {
        let results = root
            .iter_breadth_first()
            .map(|n| {
                let failure = failing.iter().find(|(id, _)| *id == n.id);
                NodeResult {
                    component_id: n.id.clone(),
                    level: n.level,
                    passed: failure.is_none(),
                    message: failure.map(|(_, m)| (*m).to_string()),
                    measurements: crate::probe::Measurements::default(),
                }
            })
            .collect();
        CoverageReport::from_results(root.count(), results)
    }

    #[test]
    fn follows_failing_chain_to_deepest_unit() {
        let root = tree();
        let cov = coverage(
            &root,
            &[("a", "child failed"), ("a1", "child failed"), ("a1x", "module not found")],
        );
        let isolations = depth_first(&root, &cov);
        assert_eq!(isolations.len(), 1);
        let iso = &isolations[0];
        assert_eq!(iso.path, ["a", "a1", "a1x"]);
        assert_eq!(iso.minimal_failing_unit, "a1x");
        assert_eq!(iso.failure_type, FailureType::Dependency);
    }

    #[test]
    fn independent_failures_are_isolated_separately() {
        let root = tree();
        let cov = coverage(&root, &[("a2", "timeout"), ("b", "permission denied")]);
        let isolations = depth_first(&root, &cov);
        let units: Vec<_> = isolations.iter().map(|i| i.minimal_failing_unit.as_str()).collect();
        assert_eq!(units, ["a2", "b"]);
    }
}
