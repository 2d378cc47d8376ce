//! Debug Engine
//!
//! Six sequential stages turn a reported failure into a ranked remediation:
//! classify, isolate, root-cause analysis, mock validation, direct tests and
//! remediation. A failing stage returns a [`DebugError`] with the partial
//! results and a manual investigation checklist for that stage.

mod analysis;
mod error;
mod locate;
mod remedy;
mod triage;
mod verify;

pub use analysis::{
    root_cause_confidence, CodeQuality, ContributingFactor, DependencyHealth, FailurePoint,
    HealthStatus, RootCause,
};
pub use error::{DebugError, DebugFailure, DebugStage, PartialDebugResults};
pub use locate::{Isolation, IsolationMethod};
pub use remedy::{Priority, Remediation, RemediationStep};
pub use triage::{Category, Classification, FailureContext, Severity, Strategy};
pub use verify::{DirectTests, ErrorHandling, InterfaceCompliance, MockValidation, RegressionPass};

use crate::mock::MockGenerator;
use crate::probe::ProbeRunner;
use arbor_spec::Specification;
use serde::{Deserialize, Serialize};
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugOptions {
    /// Fail the root-cause stage below this confidence
    pub min_confidence: f64,
    /// Run the direct implementation tests stage
    pub direct_tests: bool,
    pub concurrency: usize,
}

impl Default for DebugOptions {
    fn default() -> Self {
        Self {
            min_confidence: 0.0,
            direct_tests: true,
            concurrency: 8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DebugResults {
    pub failure_id: String,
    pub spec_id: String,
    pub classification: Classification,
    pub isolation: Isolation,
    pub root_cause: RootCause,
    pub mock_validation: MockValidation,
    /// `None` when direct tests are disabled
    pub direct_tests: Option<DirectTests>,
    pub remediation: Remediation,
    /// `0.4 * isolation + 0.4 * root cause + 0.2 * mock`
    pub confidence: f64,
    pub duration_ms: u64,
}

/// `0.4 * isolation + 0.4 * root_cause + 0.2 * mock`
#[must_use]
pub fn overall_confidence(isolation: f64, root_cause: f64, mock: f64) -> f64 {
    0.4 * isolation + 0.4 * root_cause + 0.2 * mock
}

#[derive(Debug, Clone)]
pub struct DebugEngine {
    runner: ProbeRunner,
    generator: MockGenerator,
}

impl DebugEngine {
    #[must_use]
    pub fn new(runner: ProbeRunner) -> Self {
        Self {
            runner,
            generator: MockGenerator,
        }
    }

    /// Diagnose `failure_id` against `spec`
    ///
    /// # Errors
    /// - `ComponentIsolationFailed` when no component can be blamed
    /// - `LowConfidence` when root-cause confidence is below `min_confidence`
    #[tracing::instrument(skip_all, fields(failure = %failure_id, spec = %spec.id))]
    pub async fn run(
        &self,
        failure_id: &str,
        context: &FailureContext,
        spec: &Specification,
        options: &DebugOptions,
    ) -> Result<DebugResults, DebugError> {
        let started = Instant::now();
        let mut partial = PartialDebugResults::default();
        let root = &spec.root;

        // 1. Classify
        let classification = triage::classify(failure_id, context);
        tracing::info!(
            "Debugging {}: {} failure, {:?} severity, {} strategy",
            failure_id,
            classification.failure_type,
            classification.severity,
            classification.strategy
        );
        partial.classification = Some(classification);

        // 2. Isolate
        let Some(isolation) = locate::isolate(
            &self.runner,
            root,
            context,
            classification.strategy,
            options.concurrency,
        )
        .await
        else {
            tracing::warn!("No component isolated for {}", failure_id);
            return Err(DebugError::new(
                failure_id,
                DebugStage::Isolate,
                DebugFailure::ComponentIsolationFailed {
                    strategy: classification.strategy,
                },
                partial,
            ));
        };
        tracing::info!(
            "Isolated {} via {:?} (confidence {:.2})",
            isolation.component_id,
            isolation.method,
            isolation.confidence
        );
        partial.isolation = Some(isolation.clone());

        let Some(node) = root.find(&isolation.component_id) else {
            return Err(DebugError::new(
                failure_id,
                DebugStage::Isolate,
                DebugFailure::ComponentIsolationFailed {
                    strategy: classification.strategy,
                },
                partial,
            ));
        };

        // 3. Root cause
        let root_cause = analysis::analyze(
            &self.runner,
            root,
            node,
            &isolation,
            &classification,
            context,
        )
        .await;
        partial.root_cause = Some(root_cause.clone());
        if root_cause.confidence < options.min_confidence {
            return Err(DebugError::new(
                failure_id,
                DebugStage::RootCause,
                DebugFailure::LowConfidence {
                    confidence: root_cause.confidence,
                    min: options.min_confidence,
                },
                partial,
            ));
        }

        // 4. Mock validation
        let mock_validation =
            verify::validate_with_mocks(&self.runner, &self.generator, root, node).await;
        partial.mock_validation = Some(mock_validation.clone());

        // 5. Direct tests
        let direct_tests = if options.direct_tests {
            Some(verify::run_direct_tests(&self.runner, &self.generator, root, node).await)
        } else {
            None
        };

        // 6. Remediation
        let remediation = remedy::remediate(
            &classification,
            &root_cause,
            &mock_validation,
            direct_tests.as_ref(),
        );

        let confidence = overall_confidence(
            isolation.confidence,
            root_cause.confidence,
            mock_validation.confidence,
        );
        tracing::info!(
            "Debug of {} complete: {} steps, confidence {:.2}",
            failure_id,
            remediation.steps.len(),
            confidence
        );

        Ok(DebugResults {
            failure_id: failure_id.to_string(),
            spec_id: spec.id.clone(),
            classification,
            isolation,
            root_cause,
            mock_validation,
            direct_tests,
            remediation,
            confidence,
            duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::FailureType;
    use crate::probe::{ComponentProbe, ProbeOutcome, ProbeRequest};
    use arbor_spec::SourceInfo;
    use async_trait::async_trait;
    use std::sync::Arc;

    #[derive(Debug)]
    struct Broken(&'static str);

    #[async_trait]
    impl ComponentProbe for Broken {
        async fn probe(&self, request: ProbeRequest<'_>) -> ProbeOutcome {
            if request.node.id == self.0 && !request.mocks.contains(self.0) {
                ProbeOutcome::fail("connection timed out")
            } else {
                ProbeOutcome::pass()
            }
        }
    }

    fn spec() -> Specification {
        let yaml = r"
id: shop
name: Shop
version: '1'
children:
  - id: cart
    name: Cart
    metadata:
      dependencies: [pricing, stripe]
    functions:
      - {name: get_items, doc: Items in the cart}
      - {name: checkout, errors: [declined]}
  - id: pricing
    name: Pricing
";
        let document = serde_yaml::from_str(yaml).unwrap();
        Specification::from_document(document, SourceInfo::stamp("shop.yaml", yaml.as_bytes()))
            .unwrap()
    }

    fn engine(broken: &'static str) -> DebugEngine {
        DebugEngine::new(ProbeRunner::new(Arc::new(Broken(broken))))
    }

    #[tokio::test]
    async fn diagnoses_timeout_in_leaf() {
        let results = engine("cart")
            .run(
                "checkout_timeout",
                &FailureContext::new("request timeout").with_impact("high"),
                &spec(),
                &DebugOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(results.classification.failure_type, FailureType::Timeout);
        assert_eq!(results.classification.strategy, Strategy::BreadthFirst);
        assert_eq!(results.isolation.component_id, "cart");
        assert_eq!(results.isolation.path, ["shop", "cart"]);

        let health: Vec<_> = results
            .root_cause
            .dependency_health
            .iter()
            .map(|d| (d.dependency.as_str(), d.status))
            .collect();
        assert_eq!(
            health,
            [("pricing", HealthStatus::Healthy), ("stripe", HealthStatus::External)]
        );
        // Timeout +0.1, worker +0.05
        assert!((results.root_cause.confidence - 0.9).abs() < 1e-9);

        assert!(results.mock_validation.hypothesis_confirmed);
        assert_eq!(results.mock_validation.gaps, ["checkout"]);

        let direct = results.direct_tests.as_ref().unwrap();
        assert!(!direct.unit_passed);
        assert!(direct.fix_verified);
        assert!(direct.regression.passed());
        assert!(direct.error_handling.adequate);

        assert_eq!(results.remediation.steps[0].priority, Priority::ImmediateFix);
        let expected = overall_confidence(0.8, 0.9, 0.5);
        assert!((results.confidence - expected).abs() < 1e-9);
    }

    #[tokio::test]
    async fn isolation_failure_carries_checklist() {
        let err = engine("nothing")
            .run(
                "mystery",
                &FailureContext::new("something odd"),
                &spec(),
                &DebugOptions::default(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.stage, DebugStage::Isolate);
        assert!(err.partial.classification.is_some());
        assert!(err.partial.isolation.is_none());
        assert_eq!(err.checklist, DebugStage::Isolate.checklist());
    }

    #[tokio::test]
    async fn low_confidence_stops_at_root_cause() {
        let options = DebugOptions {
            min_confidence: 0.95,
            direct_tests: false,
            ..DebugOptions::default()
        };
        let err = engine("pricing")
            .run(
                "pricing_crash",
                &FailureContext::new("crash").with_component("pricing"),
                &spec(),
                &options,
            )
            .await
            .unwrap_err();
        assert_eq!(err.stage, DebugStage::RootCause);
        assert!(err.partial.root_cause.is_some());
        assert!(err.partial.mock_validation.is_none());
    }
}
