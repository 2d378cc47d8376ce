//! Ranked remediation

use super::analysis::{HealthStatus, RootCause};
use super::triage::{Classification, Severity};
use super::verify::{DirectTests, MockValidation};
use crate::classify::FailureType;
use serde::Serialize;

/// Fixed ranking; lower sorts first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    ImmediateFix,
    TestEnhancement,
    Monitoring,
    CodeImprovement,
    Documentation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemediationStep {
    pub priority: Priority,
    pub action: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Remediation {
    /// Sorted by priority; insertion order within a priority
    pub steps: Vec<RemediationStep>,
}

impl Remediation {
    fn push(&mut self, priority: Priority, action: impl Into<String>) {
        self.steps.push(RemediationStep {
            priority,
            action: action.into(),
        });
    }

    pub fn immediate(&self) -> impl Iterator<Item = &RemediationStep> {
        self.steps
            .iter()
            .filter(|s| s.priority == Priority::ImmediateFix)
    }
}

pub(crate) fn remediate(
    classification: &Classification,
    root_cause: &RootCause,
    mocks: &MockValidation,
    direct: Option<&DirectTests>,
) -> Remediation {
    let component = &root_cause.failure_point.component_id;
    let mut out = Remediation::default();

    if root_cause.code_quality.doc_coverage < 1.0 {
        out.push(
            Priority::Documentation,
            format!("Document every public function of {component}"),
        );
    }

    out.push(
        Priority::ImmediateFix,
        format!(
            "{}: {}",
            component,
            classification.failure_type.remediation()
        ),
    );
    for dep in root_cause
        .dependency_health
        .iter()
        .filter(|d| d.status == HealthStatus::Unhealthy)
    {
        out.push(
            Priority::ImmediateFix,
            format!("Restore failing dependency {}", dep.dependency),
        );
    }

    if !mocks.gaps.is_empty() {
        out.push(
            Priority::TestEnhancement,
            format!(
                "Declare return values for {} so {component} can be mocked",
                mocks.gaps.join(", ")
            ),
        );
    }
    if let Some(direct) = direct {
        if !direct.unit_passed {
            out.push(
                Priority::TestEnhancement,
                format!("Add a unit test reproducing the failure in {component}"),
            );
        }
        if !direct.regression.passed() {
            out.push(
                Priority::TestEnhancement,
                format!(
                    "Investigate regressions in {}",
                    direct.regression.failed.join(", ")
                ),
            );
        }
        if !direct.error_handling.adequate {
            out.push(
                Priority::CodeImprovement,
                format!(
                    "Declare error returns for {}",
                    direct.error_handling.uncovered.join(", ")
                ),
            );
        }
    }

    if matches!(
        classification.failure_type,
        FailureType::Timeout | FailureType::Resource
    ) || classification.severity <= Severity::High
    {
        out.push(
            Priority::Monitoring,
            format!("Alert on latency and memory of {component}"),
        );
    }

    if root_cause.code_quality.complexity > 10 {
        out.push(
            Priority::CodeImprovement,
            format!(
                "Split {component}: {} functions and children",
                root_cause.code_quality.complexity
            ),
        );
    }

    out.steps.sort_by_key(|s| s.priority);
    out
}
