//! Component isolation
//!
//! Every strategy first honors a component named in the failure context.
//! Breadth-first takes the shallowest failing node whose children all pass;
//! depth-first descends through the first failing child at each level;
//! hybrid tries depth-first then breadth-first. When probing finds nothing,
//! a node id mentioned in the error message is the last resort.

use super::triage::{FailureContext, Strategy};
use crate::mock::MockSet;
use crate::probe::{ProbeMode, ProbeRequest, ProbeRunner};
use crate::tree::CoverageReport;
use arbor_spec::ComponentNode;
use serde::Serialize;
use std::collections::HashSet;

const HINT_CONFIDENCE: f64 = 0.9;
const DEPTH_FIRST_CONFIDENCE: f64 = 0.85;
const BREADTH_FIRST_CONFIDENCE: f64 = 0.8;
const MENTION_CONFIDENCE: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IsolationMethod {
    ContextHint,
    DepthFirst,
    BreadthFirst,
    MessageMention,
}

/// The single most likely offending component
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Isolation {
    pub component_id: String,
    pub method: IsolationMethod,
    pub confidence: f64,
    /// Nodes from the root to the isolated component
    pub path: Vec<String>,
    /// Probe failure message for the component, when it was probed
    pub probe_message: Option<String>,
}

pub(crate) async fn isolate(
    runner: &ProbeRunner,
    root: &ComponentNode,
    context: &FailureContext,
    strategy: Strategy,
    concurrency: usize,
) -> Option<Isolation> {
    if let Some(node) = context.component.as_deref().and_then(|id| root.find(id)) {
        return Some(found(root, node, IsolationMethod::ContextHint, HINT_CONFIDENCE, None));
    }

    let probed = match strategy {
        Strategy::DepthFirst => depth_first(runner, root).await,
        Strategy::BreadthFirst => breadth_first(runner, root, concurrency).await,
        Strategy::Hybrid => match depth_first(runner, root).await {
            Some(hit) => Some(hit),
            None => breadth_first(runner, root, concurrency).await,
        },
    };
    if probed.is_some() {
        return probed;
    }

    mentioned(root, &context.error_message)
        .map(|node| found(root, node, IsolationMethod::MessageMention, MENTION_CONFIDENCE, None))
}

fn found(
    root: &ComponentNode,
    node: &ComponentNode,
    method: IsolationMethod,
    confidence: f64,
    probe_message: Option<String>,
) -> Isolation {
    Isolation {
        component_id: node.id.clone(),
        method,
        confidence,
        path: path_to(root, &node.id),
        probe_message,
    }
}

async fn depth_first(runner: &ProbeRunner, root: &ComponentNode) -> Option<Isolation> {
    let no_mocks = MockSet::default();

    let root_outcome = runner
        .run(ProbeRequest::new(root, ProbeMode::Unit, &no_mocks))
        .await;
    let mut message = (!root_outcome.passed).then(|| root_outcome.message().to_string());
    let mut current = root;

    'descend: loop {
        for child in &current.children {
            let outcome = runner
                .run(ProbeRequest::new(child, ProbeMode::Unit, &no_mocks))
                .await;
            if !outcome.passed {
                tracing::debug!("Depth-first descent: {} failing", child.id);
                message = Some(outcome.message().to_string());
                current = child;
                continue 'descend;
            }
        }
        break;
    }

    message.map(|m| found(root, current, IsolationMethod::DepthFirst, DEPTH_FIRST_CONFIDENCE, Some(m)))
}

#[allow(clippy::let_and_return)]
async fn breadth_first(
    runner: &ProbeRunner,
    root: &ComponentNode,
    concurrency: usize,
) -> Option<Isolation> {
    let coverage: CoverageReport =
        crate::tree::breadth_first_pass(runner, root, concurrency).await;
    let failed: HashSet<&str> = coverage.failures().map(|r| r.component_id.as_str()).collect();

    // Level order, so the first hit is the shallowest
    let hit = coverage
        .failures()
        .filter_map(|r| root.find(&r.component_id).map(|n| (n, r)))
        .find(|(node, _)| node.children.iter().all(|c| !failed.contains(c.id.as_str())))
        .map(|(node, result)| {
            found(
                root,
                node,
                IsolationMethod::BreadthFirst,
                BREADTH_FIRST_CONFIDENCE,
                result.message.clone(),
            )
        });
    hit
}

/// Deepest node whose id appears in `message`
fn mentioned<'a>(root: &'a ComponentNode, message: &str) -> Option<&'a ComponentNode> {
    root.iter()
        .filter(|n| !n.is_placeholder() && message.contains(n.id.as_str()))
        .max_by_key(|n| n.level)
}

fn path_to(root: &ComponentNode, id: &str) -> Vec<String> {
    let mut path = Vec::new();
    let mut cursor = root.find(id);
    while let Some(node) = cursor {
        path.push(node.id.clone());
        cursor = node.parent_id.as_deref().and_then(|p| root.find(p));
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::{ComponentProbe, ProbeOutcome};
    use async_trait::async_trait;
    use std::sync::Arc;

    #[derive(Debug)]
    struct FailSet(Vec<&'static str>);

    #[async_trait]
    impl ComponentProbe for FailSet {
        async fn probe(&self, request: ProbeRequest<'_>) -> ProbeOutcome {
            if self.0.contains(&request.node.id.as_str()) {
                ProbeOutcome::fail(format!("{} not found", request.node.id))
            } else {
                ProbeOutcome::pass()
            }
        }
    }

    fn tree() -> ComponentNode {
        let mut root = ComponentNode::new("app", "App", 0, None);
        let mut db = ComponentNode::new("db", "Db", 1, Some("app".into()));
        db.children
            .push(ComponentNode::new("pool", "Pool", 2, Some("db".into())));
        root.children.push(db);
        root.children
            .push(ComponentNode::new("web", "Web", 1, Some("app".into())));
        root
    }

    fn runner(failing: Vec<&'static str>) -> ProbeRunner {
        ProbeRunner::new(Arc::new(FailSet(failing)))
    }

    #[tokio::test]
    async fn context_hint_wins() {
        let iso = isolate(
            &runner(vec![]),
            &tree(),
            &FailureContext::new("boom").with_component("pool"),
            Strategy::Hybrid,
            4,
        )
        .await
        .unwrap();
        assert_eq!(iso.method, IsolationMethod::ContextHint);
        assert_eq!(iso.path, ["app", "db", "pool"]);
    }

    #[tokio::test]
    async fn depth_first_descends_to_deepest_failure() {
        let iso = isolate(
            &runner(vec!["app", "db", "pool"]),
            &tree(),
            &FailureContext::new("boom"),
            Strategy::DepthFirst,
            4,
        )
        .await
        .unwrap();
        assert_eq!(iso.component_id, "pool");
        assert_eq!(iso.probe_message.as_deref(), Some("pool not found"));
    }

    #[tokio::test]
    async fn breadth_first_takes_leafmost_failure() {
        let iso = isolate(
            &runner(vec!["db", "pool", "web"]),
            &tree(),
            &FailureContext::new("boom"),
            Strategy::BreadthFirst,
            4,
        )
        .await
        .unwrap();
        assert_eq!(iso.component_id, "web");
        assert_eq!(iso.method, IsolationMethod::BreadthFirst);
    }

    #[tokio::test]
    async fn falls_back_to_message_mention() {
        let iso = isolate(
            &runner(vec![]),
            &tree(),
            &FailureContext::new("crash in web handler"),
            Strategy::Hybrid,
            4,
        )
        .await
        .unwrap();
        assert_eq!(iso.component_id, "web");
        assert!((iso.confidence - MENTION_CONFIDENCE).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn nothing_to_isolate() {
        let iso = isolate(
            &runner(vec![]),
            &tree(),
            &FailureContext::new("mystery"),
            Strategy::Hybrid,
            4,
        )
        .await;
        assert!(iso.is_none());
    }
}
