//! Gate outcomes

use crate::compat::Conflict;
use crate::security::SecurityFinding;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GateStage {
    SpecValidation,
    HierarchicalTesting,
    Compatibility,
    QualityGates,
}

impl GateStage {
    /// Remediation checklist for a rejection at this stage
    #[must_use]
    pub fn checklist(self) -> Vec<String> {
        let items: &[&str] = match self {
            Self::SpecValidation => &[
                "Add every required top-level field",
                "Give every child an id and a name",
                "Declare dependencies only on components that exist",
                "Fix code references and module names reported by validation",
            ],
            Self::HierarchicalTesting => &[
                "Run the failing leaf components locally",
                "Fix or mark untestable leaves with testing.skip",
            ],
            Self::Compatibility => &[
                "Rename components whose ids collide",
                "Break dependency cycles",
                "Stop sharing exclusive resources",
                "Align protocols with dependencies",
                "Use a known supervision strategy",
            ],
            Self::QualityGates => &[
                "Raise leaf test coverage",
                "Describe every component",
                "Remove credentials, plaintext endpoints and dynamic evaluation",
            ],
        };
        items.iter().map(|s| (*s).to_string()).collect()
    }
}

impl fmt::Display for GateStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SpecValidation => "spec_validation",
            Self::HierarchicalTesting => "hierarchical_testing",
            Self::Compatibility => "compatibility",
            Self::QualityGates => "quality_gates",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeafFailure {
    pub component_id: String,
    pub message: String,
}

/// One reason a candidate was turned away
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize)]
#[serde(tag = "violation", rename_all = "snake_case")]
pub enum Violation {
    #[error("missing required fields: {}", .0.join(", "))]
    MissingRequiredFields(Vec<String>),

    #[error("malformed component tree: {}", .0.join("; "))]
    MalformedTree(Vec<String>),

    #[error("unresolved dependencies: {}", .0.join(", "))]
    UnresolvedDependencies(Vec<String>),

    #[error("validation errors: {}", .0.join("; "))]
    ValidationErrors(Vec<String>),

    #[error("{} leaf test(s) failed", .0.len())]
    LeafTestsFailed(Vec<LeafFailure>),

    #[error("{0}")]
    Conflict(Conflict),

    #[error("coverage {coverage:.1}% below required {min:.1}%")]
    InsufficientCoverage { coverage: f64, min: f64 },

    #[error("undocumented components: {}", .0.join(", "))]
    MissingDocumentation(Vec<String>),

    #[error("{} security finding(s)", .0.len())]
    SecurityFindings(Vec<SecurityFinding>),
}

/// Candidate turned away at `stage`
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize)]
#[error("integration of {component_id} rejected at {stage}: {}", summary(.violations))]
pub struct Rejection {
    pub component_id: String,
    pub stage: GateStage,
    pub violations: Vec<Violation>,
    pub checklist: Vec<String>,
}

fn summary(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl Rejection {
    pub(crate) fn new(component_id: &str, stage: GateStage, violations: Vec<Violation>) -> Self {
        Self {
            component_id: component_id.to_string(),
            stage,
            violations,
            checklist: stage.checklist(),
        }
    }
}

/// Candidate admitted
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Approval {
    pub component_id: String,
    pub version: String,
    pub checksum: String,
    /// `100 - skipped leaf share * 100`
    pub quality_score: f64,
    /// Effective coverage, percent
    pub coverage: f64,
    pub tested_leaves: usize,
    pub skipped_leaves: Vec<String>,
    /// Non-blocking
    pub recommendations: Vec<String>,
}
