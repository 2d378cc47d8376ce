//! Root-cause analysis

use super::locate::Isolation;
use super::triage::{Classification, FailureContext};
use crate::classify::FailureType;
use crate::mock::MockSet;
use crate::probe::{ProbeMode, ProbeRequest, ProbeRunner};
use arbor_spec::ComponentNode;
use futures::future::join_all;
use serde::Serialize;

const BASE_CONFIDENCE: f64 = 0.75;

/// Where the failure happened
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailurePoint {
    pub component_id: String,
    pub function: Option<String>,
    pub line: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContributingFactor {
    pub description: String,
    /// Estimated share of the failure, `[0, 1]`
    pub impact: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
    /// Outside the specification; not probed
    External,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyHealth {
    pub dependency: String,
    pub status: HealthStatus,
}

/// Static quality indicators for the isolated component
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CodeQuality {
    /// Declared functions plus direct children
    pub complexity: usize,
    /// Declared `testing.coverage`, percent
    pub test_coverage: Option<f64>,
    /// Documented functions over declared functions; 1.0 with none
    pub doc_coverage: f64,
}

impl CodeQuality {
    #[allow(clippy::cast_precision_loss)]
    fn of(node: &ComponentNode) -> Self {
        let documented = node
            .functions
            .iter()
            .filter(|f| f.doc.as_deref().is_some_and(|d| !d.trim().is_empty()))
            .count();
        let doc_coverage = if node.functions.is_empty() {
            1.0
        } else {
            documented as f64 / node.functions.len() as f64
        };
        Self {
            complexity: node.functions.len() + node.children.len(),
            test_coverage: node
                .testing
                .get("coverage")
                .and_then(serde_yaml::Value::as_f64),
            doc_coverage,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RootCause {
    pub failure_point: FailurePoint,
    /// Highest impact first
    pub contributing_factors: Vec<ContributingFactor>,
    pub dependency_health: Vec<DependencyHealth>,
    pub code_quality: CodeQuality,
    pub hypothesis: String,
    pub confidence: f64,
}

/// `0.1` for a classified failure, `-0.15` for an unknown one, plus `0.05`
/// when the reporter pinned a function or line
fn clarity_bonus(failure_type: FailureType, context: &FailureContext) -> f64 {
    let classified = if failure_type == FailureType::Unknown { -0.15 } else { 0.1 };
    let located = if context.function.is_some() || context.line.is_some() {
        0.05
    } else {
        0.0
    };
    classified + located
}

fn type_bonus(component_type: &str) -> f64 {
    match component_type {
        "worker" => 0.05,
        "supervisor" => -0.05,
        "external" => -0.1,
        _ => 0.0,
    }
}

/// `clamp(0.75 + clarity + component type, 0, 1)`
#[must_use]
pub fn root_cause_confidence(
    failure_type: FailureType,
    context: &FailureContext,
    component_type: &str,
) -> f64 {
    (BASE_CONFIDENCE + clarity_bonus(failure_type, context) + type_bonus(component_type))
        .clamp(0.0, 1.0)
}

pub(crate) async fn analyze(
    runner: &ProbeRunner,
    root: &ComponentNode,
    node: &ComponentNode,
    isolation: &Isolation,
    classification: &Classification,
    context: &FailureContext,
) -> RootCause {
    let no_mocks = MockSet::default();
    let dependencies = node.dependencies();
    let dependency_health = join_all(dependencies.iter().map(|dep| {
        let no_mocks = &no_mocks;
        async move {
            let status = match root.find(dep) {
                Some(target) => {
                    let outcome = runner
                        .run(ProbeRequest::new(target, ProbeMode::Integration, no_mocks))
                        .await;
                    if outcome.passed {
                        HealthStatus::Healthy
                    } else {
                        HealthStatus::Unhealthy
                    }
                }
                None => HealthStatus::External,
            };
            DependencyHealth {
                dependency: dep.clone(),
                status,
            }
        }
    }))
    .await;

    let code_quality = CodeQuality::of(node);
    let failure_type = classification.failure_type;

    let mut factors = vec![ContributingFactor {
        description: format!("{failure_type} failure in {}", node.id),
        impact: if failure_type == FailureType::Unknown { 0.5 } else { 0.9 },
    }];
    if node.is_placeholder() {
        factors.push(ContributingFactor {
            description: format!("{} is not fully specified", node.id),
            impact: 0.95,
        });
    }
    for dep in dependency_health.iter().filter(|d| d.status == HealthStatus::Unhealthy) {
        factors.push(ContributingFactor {
            description: format!("dependency {} is failing", dep.dependency),
            impact: 0.7,
        });
    }
    if node.code_ref.is_none() {
        factors.push(ContributingFactor {
            description: "no code reference to inspect".to_string(),
            impact: 0.3,
        });
    }
    if code_quality.doc_coverage < 0.5 {
        factors.push(ContributingFactor {
            description: format!(
                "{:.0}% of declared functions are documented",
                code_quality.doc_coverage * 100.0
            ),
            impact: 0.2,
        });
    }
    factors.sort_by(|a, b| b.impact.total_cmp(&a.impact));

    let confidence = root_cause_confidence(failure_type, context, &node.component_type());
    tracing::debug!(
        "Root cause for {}: {} (confidence {:.2})",
        node.id,
        failure_type,
        confidence
    );

    RootCause {
        failure_point: FailurePoint {
            component_id: isolation.component_id.clone(),
            function: context.function.clone(),
            line: context.line,
        },
        contributing_factors: factors,
        dependency_health,
        code_quality,
        hypothesis: failure_type.hypothesis(&node.id),
        confidence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_bonuses() {
        let plain = FailureContext::new("x");
        let located = FailureContext::new("x").with_location("handle_call", Some(42));

        let c = root_cause_confidence(FailureType::Timeout, &plain, "worker");
        assert!((c - 0.9).abs() < 1e-9);

        let c = root_cause_confidence(FailureType::Timeout, &located, "worker");
        assert!((c - 0.95).abs() < 1e-9);

        let c = root_cause_confidence(FailureType::Unknown, &plain, "external");
        assert!((c - 0.5).abs() < 1e-9);

        let c = root_cause_confidence(FailureType::Dependency, &located, "service");
        assert!((c - 0.9).abs() < 1e-9);
    }

    #[test]
    fn doc_coverage_counts_documented_functions() {
        let mut node = ComponentNode::new("svc", "Svc", 0, None);
        let mut documented = arbor_spec::FunctionSpec::named("start");
        documented.doc = Some("Starts the service".into());
        node.functions = vec![documented, arbor_spec::FunctionSpec::named("stop")];
        let quality = CodeQuality::of(&node);
        assert!((quality.doc_coverage - 0.5).abs() < f64::EPSILON);
        assert_eq!(quality.complexity, 2);
    }
}
