//! Tree test errors

use super::results::PartialTreeResults;
use serde::Serialize;
use std::fmt;

/// Tree test pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeStage {
    Summary,
    BreadthFirst,
    MockGeneration,
    DepthFirst,
    Performance,
}

impl fmt::Display for TreeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Summary => "summary",
            Self::BreadthFirst => "breadth_first",
            Self::MockGeneration => "mock_generation",
            Self::DepthFirst => "depth_first",
            Self::Performance => "performance",
        })
    }
}

/// Why a tree test run stopped
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum TreeFailure {
    #[error("excessive failure rate: {failed}/{tested} ({:.1}%) exceeds {:.1}%", .rate * 100.0, .max * 100.0)]
    ExcessiveFailureRate {
        failed: usize,
        tested: usize,
        rate: f64,
        max: f64,
    },

    #[error("performance benchmarks failed: {violations} bound(s) exceeded, score {score:.2} (min {min:.2})")]
    PerformanceBenchmarksFailed {
        violations: usize,
        score: f64,
        min: f64,
    },
}

/// Stage-tagged tree test failure carrying partial results
#[derive(Debug, Clone, thiserror::Error)]
#[error("tree test failed at {stage}: {failure}")]
pub struct TreeTestError {
    pub stage: TreeStage,
    pub failure: TreeFailure,
    pub partial: Box<PartialTreeResults>,
}

impl TreeTestError {
    pub(crate) fn new(stage: TreeStage, failure: TreeFailure, partial: PartialTreeResults) -> Self {
        Self {
            stage,
            failure,
            partial: Box::new(partial),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_stage_and_rate() {
        let err = TreeTestError::new(
            TreeStage::BreadthFirst,
            TreeFailure::ExcessiveFailureRate {
                failed: 2,
                tested: 10,
                rate: 0.2,
                max: 0.1,
            },
            PartialTreeResults::default(),
        );
        let text = err.to_string();
        assert!(text.contains("breadth_first"));
        assert!(text.contains("20.0%"));
    }
}
