//! Debug pipeline errors

use super::analysis::RootCause;
use super::locate::Isolation;
use super::triage::{Classification, Strategy};
use super::verify::{DirectTests, MockValidation};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DebugStage {
    Classify,
    Isolate,
    RootCause,
    MockValidation,
    DirectTests,
    Remediation,
}

impl DebugStage {
    /// Manual investigation steps for a failure at this stage
    #[must_use]
    pub fn checklist(self) -> Vec<String> {
        let items: &[&str] = match self {
            Self::Classify => &[
                "Capture the full error message and stack trace",
                "Record the impact level reported by the caller",
            ],
            Self::Isolate => &[
                "Name the suspected component in the failure context",
                "Check recent changes to components in the specification",
                "Reproduce the failure with verbose logging",
                "Confirm every component's code reference and module resolve",
            ],
            Self::RootCause => &[
                "Inspect the isolated component's dependencies by hand",
                "Pin the failing function and line in the failure context",
                "Compare against the last known good version",
            ],
            Self::MockValidation => &[
                "Declare return values for the component's functions",
                "Probe the parent with the component stubbed manually",
            ],
            Self::DirectTests => &[
                "Run the component's own test suite",
                "Verify the component starts in isolation",
            ],
            Self::Remediation => &["Escalate to the owning team with the partial report"],
        };
        items.iter().map(|s| (*s).to_string()).collect()
    }
}

impl fmt::Display for DebugStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Classify => "classify",
            Self::Isolate => "isolate",
            Self::RootCause => "root_cause",
            Self::MockValidation => "mock_validation",
            Self::DirectTests => "direct_tests",
            Self::Remediation => "remediation",
        })
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DebugFailure {
    #[error("component isolation failed using {strategy} strategy")]
    ComponentIsolationFailed { strategy: Strategy },

    #[error("root cause confidence {confidence:.2} below minimum {min:.2}")]
    LowConfidence { confidence: f64, min: f64 },
}

/// Results accumulated before a stage failed
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PartialDebugResults {
    pub classification: Option<Classification>,
    pub isolation: Option<Isolation>,
    pub root_cause: Option<RootCause>,
    pub mock_validation: Option<MockValidation>,
    pub direct_tests: Option<DirectTests>,
}

/// Stage-tagged debug failure with partial results and a checklist
#[derive(Debug, Clone, thiserror::Error)]
#[error("debug of {failure_id} failed at {stage}: {failure}")]
pub struct DebugError {
    pub failure_id: String,
    pub stage: DebugStage,
    pub failure: DebugFailure,
    pub partial: Box<PartialDebugResults>,
    pub checklist: Vec<String>,
}

impl DebugError {
    pub(crate) fn new(
        failure_id: &str,
        stage: DebugStage,
        failure: DebugFailure,
        partial: PartialDebugResults,
    ) -> Self {
        Self {
            failure_id: failure_id.to_string(),
            stage,
            failure,
            partial: Box::new(partial),
            checklist: stage.checklist(),
        }
    }
}
