//! Failure classification

use crate::classify::FailureType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What the caller knows about a failure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FailureContext {
    pub error_message: String,
    /// Explicit impact level: `critical`, `high`, `medium` or `low`
    pub impact_level: Option<String>,
    /// Component suspected by the reporter
    pub component: Option<String>,
    pub function: Option<String>,
    pub line: Option<u32>,
}

impl FailureContext {
    #[must_use]
    pub fn new(error_message: impl Into<String>) -> Self {
        Self {
            error_message: error_message.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_impact(mut self, level: impl Into<String>) -> Self {
        self.impact_level = Some(level.into());
        self
    }

    #[must_use]
    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(component.into());
        self
    }

    #[must_use]
    pub fn with_location(mut self, function: impl Into<String>, line: Option<u32>) -> Self {
        self.function = Some(function.into());
        self.line = line;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    /// Parse an impact level; unrecognized levels are `Medium`
    #[must_use]
    pub fn from_impact(level: Option<&str>) -> Self {
        match level.map(str::to_ascii_lowercase).as_deref() {
            Some("critical") => Self::Critical,
            Some("high") => Self::High,
            Some("low") => Self::Low,
            _ => Self::Medium,
        }
    }
}

/// Subsystem implied by the failure identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Data,
    Network,
    Security,
    Resource,
    Configuration,
    Application,
}

impl Category {
    const TABLE: &'static [(&'static [&'static str], Category)] = &[
        (&["db", "database", "sql", "query"], Category::Data),
        (&["net", "http", "api", "conn", "socket"], Category::Network),
        (&["auth", "perm", "token", "cred"], Category::Security),
        (&["mem", "cpu", "disk", "oom"], Category::Resource),
        (&["config", "env", "setting"], Category::Configuration),
    ];

    /// First table entry with a substring present in `failure_id`
    #[must_use]
    pub fn from_failure_id(failure_id: &str) -> Self {
        let id = failure_id.to_ascii_lowercase();
        Self::TABLE
            .iter()
            .find(|(needles, _)| needles.iter().any(|n| id.contains(n)))
            .map_or(Self::Application, |(_, category)| *category)
    }
}

/// How the isolation stage searches the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    BreadthFirst,
    DepthFirst,
    Hybrid,
}

impl Strategy {
    #[must_use]
    pub fn select(failure_type: FailureType, severity: Severity) -> Self {
        match (failure_type, severity) {
            (FailureType::Timeout | FailureType::Resource, _) => Self::BreadthFirst,
            (FailureType::Dependency, _) => Self::DepthFirst,
            _ => Self::Hybrid,
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::BreadthFirst => "breadth_first",
            Self::DepthFirst => "depth_first",
            Self::Hybrid => "hybrid",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub failure_type: FailureType,
    pub severity: Severity,
    pub category: Category,
    pub strategy: Strategy,
}

pub(crate) fn classify(failure_id: &str, context: &FailureContext) -> Classification {
    let failure_type = FailureType::from_message(&context.error_message);
    let severity = Severity::from_impact(context.impact_level.as_deref());
    Classification {
        failure_type,
        severity,
        category: Category::from_failure_id(failure_id),
        strategy: Strategy::select(failure_type, severity),
    }
}
