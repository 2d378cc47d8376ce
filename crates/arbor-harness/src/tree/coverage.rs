//! Breadth-first coverage pass

use super::results::{CoverageReport, NodeResult};
use crate::mock::MockSet;
use crate::probe::{ProbeMode, ProbeRequest, ProbeRunner};
use arbor_spec::ComponentNode;
use futures::stream::{self, StreamExt};

/// Probe every node level by level; nodes within a level run concurrently
pub(crate) async fn breadth_first(
    runner: &ProbeRunner,
    root: &ComponentNode,
    concurrency: usize,
) -> CoverageReport {
    let no_mocks = MockSet::default();
    let mut results = Vec::new();
    let mut level = vec![root];

    while !level.is_empty() {
        let outcomes: Vec<_> = stream::iter(level.iter().copied().map(|node| {
            runner.run(ProbeRequest::new(node, ProbeMode::Coverage, &no_mocks))
        }))
        .buffered(concurrency.max(1))
        .collect()
        .await;

        for (node, outcome) in level.iter().zip(outcomes) {
            results.push(NodeResult {
                component_id: node.id.clone(),
                level: node.level,
                passed: outcome.passed,
                message: outcome.message,
                measurements: outcome.measurements,
            });
        }

        level = level.iter().copied().flat_map(|n| n.children.iter()).collect();
    }

    CoverageReport::from_results(root.count(), results)
}
