//! Tree Tester
//!
//! Ongoing regression testing of a specification's component tree:
//!
//! 1. Tree summary
//! 2. Breadth-first coverage pass (aborts above the failure-rate ceiling)
//! 3. Mock generation for failed components
//! 4. Depth-first isolation of failing subtrees
//! 5. Performance validation
//!
//! Stages run sequentially; a failing stage returns a [`TreeTestError`]
//! tagged with the stage and carrying everything accumulated so far.

mod coverage;
mod error;
mod isolate;
mod performance;
mod results;

pub(crate) use coverage::breadth_first as breadth_first_pass;
pub use error::{TreeFailure, TreeStage, TreeTestError};
pub use results::{
    CheckSource, CheckStatus, CoverageReport, IsolationReport, MockReport, NodeResult,
    PartialTreeResults, PerformanceCheck, PerformanceReport, TreeTestResults,
};

use crate::mock::{MockGenerator, MockSet};
use crate::probe::{ProbeMode, ProbeRequest, ProbeRunner};
use arbor_spec::{ComponentNode, Specification, TreeSummary};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Coverage below which a recommendation is emitted
const COVERAGE_ADVISORY: f64 = 0.95;
/// Performance score below which a recommendation is emitted
const PERFORMANCE_ADVISORY: f64 = 0.90;

/// Tree test thresholds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeTestOptions {
    /// Abort when `failed / tested` exceeds this
    pub max_failure_rate: f64,
    /// Abort when the composite performance score is below this
    pub min_performance_score: f64,
    /// Concurrent probes per level and per failed set
    pub concurrency: usize,
}

impl Default for TreeTestOptions {
    fn default() -> Self {
        Self {
            max_failure_rate: 0.10,
            min_performance_score: 0.80,
            concurrency: 8,
        }
    }
}

/// Runs the tree test pipeline
#[derive(Debug, Clone)]
pub struct TreeTester {
    runner: ProbeRunner,
    generator: MockGenerator,
}

impl TreeTester {
    #[must_use]
    pub fn new(runner: ProbeRunner) -> Self {
        Self {
            runner,
            generator: MockGenerator,
        }
    }

    /// Run every stage over `spec`
    ///
    /// # Errors
    /// - `TreeFailure::ExcessiveFailureRate` from the breadth-first stage
    /// - `TreeFailure::PerformanceBenchmarksFailed` from the performance stage
    #[tracing::instrument(skip_all, fields(spec = %spec.id))]
    pub async fn run(
        &self,
        spec: &Specification,
        options: &TreeTestOptions,
    ) -> Result<TreeTestResults, TreeTestError> {
        let started = Instant::now();
        let mut partial = PartialTreeResults::default();

        // 1. Summary
        let summary = TreeSummary::of(&spec.root);
        tracing::info!(
            "Tree test started: {} components, depth {}, {} leaves",
            summary.total_nodes,
            summary.depth,
            summary.leaf_count
        );
        partial.summary = Some(summary.clone());

        // 2. Breadth-first coverage
        let coverage = coverage::breadth_first(&self.runner, &spec.root, options.concurrency).await;
        let rate = coverage.failure_rate();
        tracing::info!(
            "Breadth-first pass: {}/{} passed, failure rate {:.1}%",
            coverage.passed,
            coverage.tested,
            rate * 100.0
        );
        partial.coverage = Some(coverage.clone());
        if rate > options.max_failure_rate {
            return Err(TreeTestError::new(
                TreeStage::BreadthFirst,
                TreeFailure::ExcessiveFailureRate {
                    failed: coverage.failed,
                    tested: coverage.tested,
                    rate,
                    max: options.max_failure_rate,
                },
                partial,
            ));
        }

        // 3. Mocks for failed components
        let failed: Vec<&ComponentNode> = coverage
            .failures()
            .filter_map(|r| spec.root.find(&r.component_id))
            .collect();
        let mocks = self.mock_failed(&spec.root, &failed, options.concurrency).await;
        partial.mocks.clone_from(&mocks);
        let mock_success_rate = success_rate(&mocks);

        // 4. Depth-first isolation
        let isolations = isolate::depth_first(&spec.root, &coverage);
        for iso in &isolations {
            tracing::debug!(
                "Isolated {} -> {} ({})",
                iso.failed_component,
                iso.minimal_failing_unit,
                iso.failure_type
            );
        }
        partial.isolations.clone_from(&isolations);

        // 5. Performance
        let performance = performance::validate(spec, &coverage);
        let violations = performance.violations().count();
        if violations > 0 || performance.score < options.min_performance_score {
            let score = performance.score;
            partial.performance = Some(performance);
            return Err(TreeTestError::new(
                TreeStage::Performance,
                TreeFailure::PerformanceBenchmarksFailed {
                    violations,
                    score,
                    min: options.min_performance_score,
                },
                partial,
            ));
        }

        let quality_score = quality_score(coverage.coverage, performance.score, mock_success_rate);
        let recommendations = recommendations(coverage.coverage, performance.score, &mocks);

        tracing::info!(
            "Tree test complete: coverage {:.1}%, quality {:.1}",
            coverage.coverage * 100.0,
            quality_score
        );

        Ok(TreeTestResults {
            spec_id: spec.id.clone(),
            summary,
            coverage,
            mocks,
            isolations,
            performance,
            mock_success_rate,
            quality_score,
            recommendations,
            duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        })
    }

    /// Mock each failed component and re-probe its parent with the mock in place
    async fn mock_failed(
        &self,
        root: &ComponentNode,
        failed: &[&ComponentNode],
        concurrency: usize,
    ) -> Vec<MockReport> {
        use futures::stream::{self, StreamExt};

        stream::iter(failed.iter().copied().map(|node| async move {
            let mock = self.generator.generate(node);
            let parent = node.parent_id.as_deref().and_then(|p| root.find(p));
            let mock_test_passed = match parent {
                Some(parent) => {
                    let mocks = MockSet::single(mock.clone());
                    self.runner
                        .run(ProbeRequest::new(parent, ProbeMode::Unit, &mocks))
                        .await
                        .passed
                }
                None => mock.coverage() >= 1.0,
            };
            MockReport {
                component_id: node.id.clone(),
                mock_coverage: mock.coverage(),
                gaps: mock.gaps,
                tested_via: parent.map(|p| p.id.clone()),
                mock_test_passed,
            }
        }))
        .buffered(concurrency.max(1))
        .collect()
        .await
    }
}

#[allow(clippy::cast_precision_loss)]
fn success_rate(mocks: &[MockReport]) -> f64 {
    if mocks.is_empty() {
        1.0
    } else {
        mocks.iter().filter(|m| m.mock_test_passed).count() as f64 / mocks.len() as f64
    }
}

/// `100 * (0.4 * coverage + 0.4 * performance + 0.2 * mock success)`
#[must_use]
pub fn quality_score(coverage: f64, performance: f64, mock_success_rate: f64) -> f64 {
    100.0 * (0.4 * coverage + 0.4 * performance + 0.2 * mock_success_rate)
}

fn recommendations(coverage: f64, performance: f64, mocks: &[MockReport]) -> Vec<String> {
    let mut out = Vec::new();
    if coverage < COVERAGE_ADVISORY {
        out.push(format!(
            "Increase test coverage from {:.1}% to at least {:.0}%",
            coverage * 100.0,
            COVERAGE_ADVISORY * 100.0
        ));
    }
    if performance < PERFORMANCE_ADVISORY {
        out.push(format!(
            "Improve performance: benchmark score {:.0}% is below {:.0}%",
            performance * 100.0,
            PERFORMANCE_ADVISORY * 100.0
        ));
    }
    if !mocks.is_empty() {
        let ids: Vec<&str> = mocks.iter().map(|m| m.component_id.as_str()).collect();
        out.push(format!("Replace mocked components with working implementations: {}", ids.join(", ")));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::{ComponentProbe, Measurements, ProbeOutcome};
    use arbor_spec::SourceInfo;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Arc;

    #[derive(Debug, Default)]
    struct TableProbe {
        failures: HashMap<String, String>,
        measurements: HashMap<String, Measurements>,
    }

    #[async_trait]
    impl ComponentProbe for TableProbe {
        async fn probe(&self, request: ProbeRequest<'_>) -> ProbeOutcome {
            let id = &request.node.id;
            let measurements = self.measurements.get(id).copied().unwrap_or_default();
            match self.failures.get(id) {
                Some(msg) if !request.mocks.contains(id) => {
                    ProbeOutcome::fail(msg.clone()).with_measurements(measurements)
                }
                _ => ProbeOutcome::pass().with_measurements(measurements),
            }
        }
    }

    fn spec(yaml: &str) -> Specification {
        let document = serde_yaml::from_str(yaml).unwrap();
        Specification::from_document(document, SourceInfo::stamp("t.yaml", yaml.as_bytes()))
            .unwrap()
    }

    fn twelve_components() -> Specification {
        let children: String = (1..=11)
            .map(|i| format!("  - id: c{i}\n    name: C{i}\n    functions: [get_state, start]\n"))
            .collect();
        spec(&format!("id: root\nname: Root\nversion: '1'\nchildren:\n{children}"))
    }

    fn tester(probe: TableProbe) -> TreeTester {
        TreeTester::new(ProbeRunner::new(Arc::new(probe)))
    }

    #[tokio::test]
    async fn one_failure_in_twelve_proceeds() {
        let mut probe = TableProbe::default();
        probe.failures.insert("c7".into(), "module not found".into());

        let results = tester(probe)
            .run(&twelve_components(), &TreeTestOptions::default())
            .await
            .unwrap();

        assert_eq!(results.coverage.total, 12);
        assert_eq!(results.coverage.tested, 12);
        assert_eq!(results.coverage.passed, 11);
        assert!((results.coverage.coverage - 11.0 / 12.0).abs() < 1e-9);

        assert_eq!(results.mocks.len(), 1);
        assert_eq!(results.mocks[0].component_id, "c7");
        assert_eq!(results.mocks[0].tested_via.as_deref(), Some("root"));
        assert!(results.mocks[0].mock_test_passed);

        assert_eq!(results.isolations[0].minimal_failing_unit, "c7");
        assert!(results.recommendations.iter().any(|r| r.contains("coverage")));
        assert!(results.recommendations.iter().any(|r| r.contains("c7")));

        let expected = quality_score(11.0 / 12.0, 1.0, 1.0);
        assert!((results.quality_score - expected).abs() < 1e-9);
    }

    #[tokio::test]
    async fn excessive_failure_rate_aborts_with_partial_coverage() {
        let mut probe = TableProbe::default();
        probe.failures.insert("c1".into(), "boom".into());
        probe.failures.insert("c2".into(), "boom".into());

        let err = tester(probe)
            .run(&twelve_components(), &TreeTestOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err.stage, TreeStage::BreadthFirst);
        assert!(matches!(
            err.failure,
            TreeFailure::ExcessiveFailureRate { failed: 2, tested: 12, .. }
        ));
        assert_eq!(err.partial.coverage.as_ref().unwrap().failed, 2);
        assert!(err.partial.mocks.is_empty());
    }

    #[tokio::test]
    async fn hard_bound_violation_aborts() {
        let mut probe = TableProbe::default();
        probe.measurements.insert(
            "api".into(),
            Measurements {
                latency_ms: Some(250.0),
                ..Measurements::default()
            },
        );
        let spec = spec(
            "id: app\nname: App\nversion: '1'\nchildren:\n  - id: api\n    name: API\n    metadata:\n      performance:\n        latency_ms: 100\n",
        );

        let err = tester(probe)
            .run(&spec, &TreeTestOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.stage, TreeStage::Performance);
        let perf = err.partial.performance.as_ref().unwrap();
        assert_eq!(perf.violations().count(), 1);
    }

    #[tokio::test]
    async fn benchmark_score_below_minimum_aborts() {
        let mut probe = TableProbe::default();
        probe.measurements.insert(
            "app".into(),
            Measurements {
                latency_ms: Some(40.0),
                memory_mb: Some(900.0),
                ..Measurements::default()
            },
        );
        let spec = spec(
            r"
id: app
name: App
version: '1'
testing:
  performance_benchmarks:
    - {id: p95, metric: latency_ms, target: 50}
    - {id: rss, metric: memory_mb, target: 512}
    - {id: cpu, metric: cpu_percent, target: 80}
",
        );

        let err = tester(probe)
            .run(&spec, &TreeTestOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err.failure,
            TreeFailure::PerformanceBenchmarksFailed { violations: 0, score, .. } if (score - 0.5).abs() < 1e-9
        ));
    }

    #[tokio::test]
    async fn unmeasured_benchmarks_do_not_count() {
        let spec = spec(
            "id: app\nname: App\nversion: '1'\ntesting:\n  performance_benchmarks:\n    - {id: rss, metric: memory_mb, target: 512}\n",
        );
        let results = tester(TableProbe::default())
            .run(&spec, &TreeTestOptions::default())
            .await
            .unwrap();
        assert!((results.performance.score - 1.0).abs() < f64::EPSILON);
        assert_eq!(results.performance.checks[0].status, CheckStatus::Unmeasured);
        assert!((results.quality_score - 100.0).abs() < 1e-9);
        assert!(results.recommendations.is_empty());
    }

    #[tokio::test]
    async fn failing_root_mock_passes_on_full_coverage() {
        let mut probe = TableProbe::default();
        probe.failures.insert("solo".into(), "timeout".into());
        let spec = spec("id: solo\nname: Solo\nversion: '1'\nfunctions: [start, stop]\n");

        let options = TreeTestOptions {
            max_failure_rate: 1.0,
            ..TreeTestOptions::default()
        };
        let results = tester(probe).run(&spec, &options).await.unwrap();
        assert!((results.coverage.coverage).abs() < f64::EPSILON);
        assert!(results.mocks[0].mock_test_passed);
        assert!(results.mocks[0].tested_via.is_none());
    }
}
