//! Tree test result types

use crate::classify::FailureType;
use crate::probe::Measurements;
use arbor_spec::{Metric, TreeSummary};
use serde::Serialize;

/// Breadth-first outcome for one node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeResult {
    pub component_id: String,
    pub level: usize,
    pub passed: bool,
    pub message: Option<String>,
    pub measurements: Measurements,
}

/// Breadth-first coverage pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageReport {
    /// Components in the tree
    pub total: usize,
    pub tested: usize,
    pub passed: usize,
    pub failed: usize,
    /// `passed / total`, in `[0, 1]`
    pub coverage: f64,
    /// Level-order results
    pub results: Vec<NodeResult>,
}

impl CoverageReport {
    #[allow(clippy::cast_precision_loss)]
    pub(crate) fn from_results(total: usize, results: Vec<NodeResult>) -> Self {
        let tested = results.len();
        let passed = results.iter().filter(|r| r.passed).count();
        let coverage = if total == 0 {
            0.0
        } else {
            (passed as f64 / total as f64).clamp(0.0, 1.0)
        };
        Self {
            total,
            tested,
            passed,
            failed: tested - passed,
            coverage,
            results,
        }
    }

    /// `failed / tested`
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn failure_rate(&self) -> f64 {
        if self.tested == 0 {
            0.0
        } else {
            self.failed as f64 / self.tested as f64
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &NodeResult> {
        self.results.iter().filter(|r| !r.passed)
    }

    #[must_use]
    pub fn result(&self, component_id: &str) -> Option<&NodeResult> {
        self.results.iter().find(|r| r.component_id == component_id)
    }
}

/// Mock substituted for a failed component
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MockReport {
    pub component_id: String,
    pub mock_coverage: f64,
    pub gaps: Vec<String>,
    /// Component re-probed with the mock in place; `None` for the root
    pub tested_via: Option<String>,
    pub mock_test_passed: bool,
}

/// Depth-first isolation of one failing subtree
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IsolationReport {
    /// Root of the failing subtree
    pub failed_component: String,
    /// Failing chain from the subtree root to the minimal unit
    pub path: Vec<String>,
    pub minimal_failing_unit: String,
    pub failure_type: FailureType,
    pub hypothesis: String,
    pub remediation: String,
}

/// Where a performance check came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", content = "id", rename_all = "snake_case")]
pub enum CheckSource {
    /// `metadata.performance` hard bound
    Threshold,
    /// `testing.performance_benchmarks` entry
    Benchmark(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Passed,
    Failed,
    /// Probe reported no measurement for the metric
    Unmeasured,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceCheck {
    pub component_id: String,
    pub metric: Metric,
    pub limit: f64,
    pub measured: Option<f64>,
    pub source: CheckSource,
    pub status: CheckStatus,
}

/// Performance validation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceReport {
    pub checks: Vec<PerformanceCheck>,
    /// Passed benchmarks over measured benchmarks; 1.0 with none
    pub score: f64,
}

impl PerformanceReport {
    /// Hard bounds exceeded
    pub fn violations(&self) -> impl Iterator<Item = &PerformanceCheck> {
        self.checks
            .iter()
            .filter(|c| c.source == CheckSource::Threshold && c.status == CheckStatus::Failed)
    }
}

/// Complete tree test results
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeTestResults {
    pub spec_id: String,
    pub summary: TreeSummary,
    pub coverage: CoverageReport,
    pub mocks: Vec<MockReport>,
    pub isolations: Vec<IsolationReport>,
    pub performance: PerformanceReport,
    /// Passed mock-driven tests over mocked components; 1.0 with none
    pub mock_success_rate: f64,
    /// `100 * (0.4 * coverage + 0.4 * performance + 0.2 * mock success)`
    pub quality_score: f64,
    /// Advisory only
    pub recommendations: Vec<String>,
    pub duration_ms: u64,
}

/// Results accumulated before a stage failed
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PartialTreeResults {
    pub summary: Option<TreeSummary>,
    pub coverage: Option<CoverageReport>,
    pub mocks: Vec<MockReport>,
    pub isolations: Vec<IsolationReport>,
    pub performance: Option<PerformanceReport>,
}
