//! Mock validation and direct implementation tests

use crate::mock::{MockGenerator, MockSet};
use crate::probe::{ProbeMode, ProbeRequest, ProbeRunner};
use arbor_spec::ComponentNode;
use futures::future::join_all;
use serde::Serialize;

/// Targeted mock run against the isolation hypothesis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MockValidation {
    pub component_id: String,
    pub mock_coverage: f64,
    /// Declared functions the mock cannot stand in for
    pub gaps: Vec<String>,
    /// The component fails on its own and its parent passes with the mock
    pub hypothesis_confirmed: bool,
    pub confidence: f64,
}

/// Substitute the isolated component and re-probe its parent
///
/// For the root, the mocked half of the check passes when the mock covers
/// every declared function.
pub(crate) async fn validate_with_mocks(
    runner: &ProbeRunner,
    generator: &MockGenerator,
    root: &ComponentNode,
    node: &ComponentNode,
) -> MockValidation {
    let mock = generator.generate(node);
    let coverage = mock.coverage();

    let real = MockSet::default();
    let mocked = MockSet::single(mock.clone());
    let parent = node.parent_id.as_deref().and_then(|p| root.find(p));

    let component_fails = !runner
        .run(ProbeRequest::new(node, ProbeMode::Unit, &real))
        .await
        .passed;
    let mocked_passes = match parent {
        Some(parent) => {
            runner
                .run(ProbeRequest::new(parent, ProbeMode::Unit, &mocked))
                .await
                .passed
        }
        None => coverage >= 1.0,
    };
    tracing::debug!(
        "Mock validation of {}: component fails {}, passes when mocked {}",
        node.id,
        component_fails,
        mocked_passes
    );
    let hypothesis_confirmed = component_fails && mocked_passes;

    let confidence = if hypothesis_confirmed {
        coverage
    } else {
        coverage * 0.5
    };

    MockValidation {
        component_id: node.id.clone(),
        mock_coverage: coverage,
        gaps: mock.gaps,
        hypothesis_confirmed,
        confidence,
    }
}

/// Every declared function documented and named
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterfaceCompliance {
    pub declared: usize,
    pub undocumented: Vec<String>,
    pub compliant: bool,
}

/// Whether failure modes are declared
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorHandling {
    /// Functions declaring at least one error return
    pub covered: Vec<String>,
    pub uncovered: Vec<String>,
    pub adequate: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegressionPass {
    pub tested: Vec<String>,
    pub failed: Vec<String>,
}

impl RegressionPass {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Direct tests against the real component
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectTests {
    pub unit_passed: bool,
    pub integration_passed: bool,
    pub interface: InterfaceCompliance,
    pub error_handling: ErrorHandling,
    /// Parent passes with the component replaced by its contract
    pub fix_verified: bool,
    /// Siblings re-probed with the fix in place
    pub regression: RegressionPass,
}

fn interface_compliance(node: &ComponentNode) -> InterfaceCompliance {
    let undocumented: Vec<String> = node
        .functions
        .iter()
        .filter(|f| f.doc.as_deref().map_or(true, |d| d.trim().is_empty()))
        .map(|f| f.name.clone())
        .collect();
    InterfaceCompliance {
        declared: node.functions.len(),
        compliant: !node.is_placeholder() && undocumented.is_empty(),
        undocumented,
    }
}

fn error_handling(node: &ComponentNode) -> ErrorHandling {
    let (covered, uncovered): (Vec<_>, Vec<_>) =
        node.functions.iter().partition(|f| !f.errors.is_empty());
    ErrorHandling {
        adequate: node.functions.is_empty() || !covered.is_empty(),
        covered: covered.into_iter().map(|f| f.name.clone()).collect(),
        uncovered: uncovered.into_iter().map(|f| f.name.clone()).collect(),
    }
}

pub(crate) async fn run_direct_tests(
    runner: &ProbeRunner,
    generator: &MockGenerator,
    root: &ComponentNode,
    node: &ComponentNode,
) -> DirectTests {
    let real = MockSet::default();
    let fixed = MockSet::single(generator.generate(node));
    let parent = node.parent_id.as_deref().and_then(|p| root.find(p));

    let (unit, integration) = futures::join!(
        runner.run(ProbeRequest::new(node, ProbeMode::Unit, &real)),
        runner.run(ProbeRequest::new(node, ProbeMode::Integration, &real)),
    );

    let fix_verified = match parent {
        Some(parent) => {
            runner
                .run(ProbeRequest::new(parent, ProbeMode::Regression, &fixed))
                .await
                .passed
        }
        None => {
            runner
                .run(ProbeRequest::new(node, ProbeMode::Regression, &fixed))
                .await
                .passed
        }
    };

    let siblings: Vec<&ComponentNode> = parent
        .map(|p| p.children.iter().filter(|c| c.id != node.id).collect())
        .unwrap_or_default();
    let outcomes = join_all(
        siblings
            .iter()
            .map(|s| runner.run(ProbeRequest::new(s, ProbeMode::Regression, &fixed))),
    )
    .await;
    let regression = RegressionPass {
        tested: siblings.iter().map(|s| s.id.clone()).collect(),
        failed: siblings
            .iter()
            .zip(&outcomes)
            .filter(|(_, o)| !o.passed)
            .map(|(s, _)| s.id.clone())
            .collect(),
    };

    DirectTests {
        unit_passed: unit.passed,
        integration_passed: integration.passed,
        interface: interface_compliance(node),
        error_handling: error_handling(node),
        fix_verified,
        regression,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_spec::FunctionSpec;

    #[test]
    fn error_handling_needs_one_declared_error() {
        let mut node = ComponentNode::new("svc", "Svc", 0, None);
        assert!(error_handling(&node).adequate);

        node.functions = vec![FunctionSpec::named("start"), FunctionSpec::named("call")];
        assert!(!error_handling(&node).adequate);

        node.functions[1].errors = vec!["timeout".into()];
        let eh = error_handling(&node);
        assert!(eh.adequate);
        assert_eq!(eh.covered, ["call"]);
        assert_eq!(eh.uncovered, ["start"]);
    }

    #[test]
    fn interface_requires_docs() {
        let mut node = ComponentNode::new("svc", "Svc", 0, None);
        let mut start = FunctionSpec::named("start");
        start.doc = Some("Boot".into());
        node.functions = vec![start, FunctionSpec::named("stop")];
        let ic = interface_compliance(&node);
        assert!(!ic.compliant);
        assert_eq!(ic.undocumented, ["stop"]);
    }
}
