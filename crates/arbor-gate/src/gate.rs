//! The four-stage admission pipeline

use crate::compat;
use crate::report::{Approval, GateStage, LeafFailure, Rejection, Violation};
use crate::rules::{GateOptions, IntegrationRules};
use crate::security::SecurityScanner;
use arbor_graph::DependencyGraph;
use arbor_harness::{MockSet, ProbeMode, ProbeRequest, ProbeRunner};
use arbor_spec::{ComponentNode, Specification};
use arbor_store::Validator;
use futures::stream::{self, StreamExt};
use std::collections::BTreeSet;

/// One-time admission check for a component joining a running system
#[derive(Debug, Clone)]
pub struct IntegrationGate {
    runner: ProbeRunner,
    scanner: SecurityScanner,
    validator: Option<Validator>,
}

impl IntegrationGate {
    #[must_use]
    pub fn new(runner: ProbeRunner) -> Self {
        Self {
            runner,
            scanner: SecurityScanner::builtin(),
            validator: None,
        }
    }

    #[must_use]
    pub fn with_scanner(mut self, scanner: SecurityScanner) -> Self {
        self.scanner = scanner;
        self
    }

    /// Run deep validation (code and module references) in the first stage
    #[must_use]
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Admit or reject `candidate` against `graph`
    ///
    /// # Errors
    /// [`Rejection`] tagged with the first stage that found a violation.
    #[tracing::instrument(skip_all, fields(component = %candidate.id))]
    pub async fn analyze(
        &self,
        candidate: &Specification,
        options: &GateOptions,
        graph: &DependencyGraph,
        rules: &IntegrationRules,
    ) -> Result<Approval, Rejection> {
        let reject = |stage, violations| {
            let rejection = Rejection::new(&candidate.id, stage, violations);
            tracing::warn!("{}", rejection);
            rejection
        };

        // 1. Specification validation
        tracing::info!("Gate stage {} for {}", GateStage::SpecValidation, candidate.id);
        let violations = self.validate_spec(candidate, options, graph, rules).await;
        if !violations.is_empty() {
            return Err(reject(GateStage::SpecValidation, violations));
        }

        // 2. Hierarchical testing
        tracing::info!("Gate stage {} for {}", GateStage::HierarchicalTesting, candidate.id);
        let leaves: Vec<&ComponentNode> = candidate.root.leaves().collect();
        let (runnable, skipped): (Vec<&ComponentNode>, Vec<&ComponentNode>) =
            leaves.iter().copied().partition(|l| !l.skip_testing());
        let failures = self.test_leaves(&runnable, options.concurrency).await;
        if !failures.is_empty() {
            return Err(reject(
                GateStage::HierarchicalTesting,
                vec![Violation::LeafTestsFailed(failures)],
            ));
        }

        // 3. Compatibility
        tracing::info!("Gate stage {} for {}", GateStage::Compatibility, candidate.id);
        let conflicts = compat::conflicts(candidate, graph);
        if !conflicts.is_empty() {
            return Err(reject(
                GateStage::Compatibility,
                conflicts.into_iter().map(Violation::Conflict).collect(),
            ));
        }

        // 4. Quality gates
        tracing::info!("Gate stage {} for {}", GateStage::QualityGates, candidate.id);
        let coverage = effective_coverage(candidate, runnable.len(), leaves.len());
        let mut violations = Vec::new();
        let min_coverage = rules.coverage_floor();
        if coverage < min_coverage {
            violations.push(Violation::InsufficientCoverage {
                coverage,
                min: min_coverage,
            });
        }
        if rules.require_documentation {
            let undocumented: Vec<String> = candidate
                .root
                .iter()
                .filter(|n| !n.is_documented())
                .map(|n| n.id.clone())
                .collect();
            if !undocumented.is_empty() {
                violations.push(Violation::MissingDocumentation(undocumented));
            }
        }
        if rules.require_clean_security_scan {
            let scan = self.scanner.scan(&candidate.document);
            if !scan.is_clean() {
                violations.push(Violation::SecurityFindings(scan.findings));
            }
        }
        if !violations.is_empty() {
            return Err(reject(GateStage::QualityGates, violations));
        }

        let skipped_leaves: Vec<String> = skipped.iter().map(|n| n.id.clone()).collect();
        let quality_score = quality_score(skipped_leaves.len(), leaves.len());
        let approval = Approval {
            component_id: candidate.id.clone(),
            version: candidate.version.clone(),
            checksum: candidate.checksum().to_string(),
            quality_score,
            coverage,
            tested_leaves: runnable.len(),
            recommendations: recommendations(candidate, graph, &skipped_leaves, coverage),
            skipped_leaves,
        };
        tracing::info!(
            "Approved {} (quality {:.1}, coverage {:.1}%)",
            approval.component_id,
            approval.quality_score,
            approval.coverage
        );
        Ok(approval)
    }

    async fn validate_spec(
        &self,
        candidate: &Specification,
        options: &GateOptions,
        graph: &DependencyGraph,
        rules: &IntegrationRules,
    ) -> Vec<Violation> {
        let mut violations = Vec::new();

        let missing: Vec<String> = rules
            .required_fields
            .iter()
            .filter(|f| {
                candidate
                    .document
                    .get(f.as_str())
                    .map_or(true, serde_yaml::Value::is_null)
            })
            .cloned()
            .collect();
        if !missing.is_empty() {
            violations.push(Violation::MissingRequiredFields(missing));
        }

        if !candidate.structural_errors.is_empty() {
            violations.push(Violation::MalformedTree(
                candidate
                    .structural_errors
                    .iter()
                    .map(ToString::to_string)
                    .collect(),
            ));
        }

        if rules.require_resolved_dependencies {
            let unresolved = unresolved_dependencies(candidate, graph);
            if !unresolved.is_empty() {
                violations.push(Violation::UnresolvedDependencies(unresolved));
            }
        }

        if options.deep_validation {
            if let Some(validator) = &self.validator {
                let report = validator.validate(candidate).await;
                let errors: Vec<String> = report.errors().map(ToString::to_string).collect();
                if !errors.is_empty() {
                    violations.push(Violation::ValidationErrors(errors));
                }
            }
        }

        violations
    }

    async fn test_leaves(&self, leaves: &[&ComponentNode], concurrency: usize) -> Vec<LeafFailure> {
        let no_mocks = MockSet::default();
        let outcomes: Vec<_> = stream::iter(leaves.iter().map(|leaf| {
            self.runner
                .run(ProbeRequest::new(leaf, ProbeMode::Integration, &no_mocks))
        }))
        .buffered(concurrency.max(1))
        .collect()
        .await;

        leaves
            .iter()
            .zip(outcomes)
            .filter(|(_, outcome)| !outcome.passed)
            .map(|(leaf, outcome)| LeafFailure {
                component_id: leaf.id.clone(),
                message: outcome.message().to_string(),
            })
            .collect()
    }
}

/// Dependencies and cross-reference targets defined neither by the candidate
/// nor by any specification in the graph
fn unresolved_dependencies(candidate: &Specification, graph: &DependencyGraph) -> Vec<String> {
    let resolves = |id: &str| {
        candidate.root.find(id).is_some() || graph.get(id).is_some_and(|e| !e.is_external())
    };
    let mut unresolved = BTreeSet::new();
    for node in candidate.root.iter() {
        for dep in node.dependencies() {
            if !resolves(&dep) {
                unresolved.insert(dep);
            }
        }
    }
    for cross in &candidate.cross_dependencies {
        for id in [&cross.source, &cross.target] {
            if !resolves(id) {
                unresolved.insert(id.clone());
            }
        }
    }
    unresolved.into_iter().collect()
}

/// `min(declared testing.coverage, tested leaves / leaves * 100)`
#[allow(clippy::cast_precision_loss)]
fn effective_coverage(candidate: &Specification, tested: usize, total: usize) -> f64 {
    let measured = if total == 0 {
        100.0
    } else {
        tested as f64 * 100.0 / total as f64
    };
    match candidate.testing.coverage {
        Some(declared) => declared.min(measured),
        None => measured,
    }
}

/// `100 - skipped / leaves * 100`
#[allow(clippy::cast_precision_loss)]
fn quality_score(skipped: usize, leaves: usize) -> f64 {
    if leaves == 0 {
        100.0
    } else {
        100.0 - skipped as f64 * 100.0 / leaves as f64
    }
}

fn recommendations(
    candidate: &Specification,
    graph: &DependencyGraph,
    skipped: &[String],
    coverage: f64,
) -> Vec<String> {
    let mut out = Vec::new();
    if !skipped.is_empty() {
        out.push(format!("Enable tests for skipped leaves: {}", skipped.join(", ")));
    }
    if coverage < 100.0 {
        out.push(format!("Raise coverage from {coverage:.1}% toward 100%"));
    }
    let unbounded: Vec<&str> = candidate
        .root
        .leaves()
        .filter(|l| l.performance().map_or(true, |p| !p.has_bounds()))
        .map(|l| l.id.as_str())
        .collect();
    if !unbounded.is_empty() {
        out.push(format!("Declare performance bounds for {}", unbounded.join(", ")));
    }
    let dependents: BTreeSet<&str> = candidate
        .root
        .iter()
        .filter_map(|n| graph.dependents_of(&n.id).ok())
        .flatten()
        .map(String::as_str)
        .collect();
    if !dependents.is_empty() {
        out.push(format!(
            "Roll out alongside existing dependents: {}",
            dependents.into_iter().collect::<Vec<_>>().join(", ")
        ));
    }
    out
}
