//! Admission rules and run options

use serde::{Deserialize, Serialize};

/// Minimum effective leaf coverage, percent
pub const DEFAULT_MIN_COVERAGE: f64 = 95.0;

/// What a candidate must satisfy to be admitted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegrationRules {
    /// Top-level fields beyond `id`, `name` and `version`
    pub required_fields: Vec<String>,
    /// Every dependency must resolve inside the candidate or the graph
    pub require_resolved_dependencies: bool,
    pub min_coverage: f64,
    /// Every node carries a non-empty description
    pub require_documentation: bool,
    pub require_clean_security_scan: bool,
}

impl Default for IntegrationRules {
    fn default() -> Self {
        Self {
            required_fields: Vec::new(),
            require_resolved_dependencies: true,
            min_coverage: DEFAULT_MIN_COVERAGE,
            require_documentation: true,
            require_clean_security_scan: true,
        }
    }
}

impl IntegrationRules {
    /// Raise the coverage threshold; values below the default are ignored
    #[must_use]
    pub fn with_min_coverage(mut self, min_coverage: f64) -> Self {
        self.min_coverage = min_coverage;
        self
    }

    /// Threshold actually enforced, never below [`DEFAULT_MIN_COVERAGE`]
    #[must_use]
    pub fn coverage_floor(&self) -> f64 {
        self.min_coverage.max(DEFAULT_MIN_COVERAGE)
    }

    #[must_use]
    pub fn with_required_field(mut self, field: impl Into<String>) -> Self {
        self.required_fields.push(field.into());
        self
    }
}

/// Per-run knobs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateOptions {
    /// Concurrent leaf probes
    pub concurrency: usize,
    /// Run the deep validator in the first stage
    pub deep_validation: bool,
}

impl Default for GateOptions {
    fn default() -> Self {
        Self {
            concurrency: 8,
            deep_validation: true,
        }
    }
}
