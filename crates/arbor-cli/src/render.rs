//! Human and JSON output

use arbor_core::EngineError;
use arbor_gate::Approval;
use arbor_graph::DependencyGraph;
use arbor_harness::{DebugResults, TreeTestResults};
use arbor_spec::{path_to, render_ascii, search, Outline, Specification, TreeSummary};
use arbor_store::ValidationReport;
use arbor_sync::SyncStatus;
use serde::Serialize;
use std::collections::BTreeSet;
use std::process::ExitCode;

/// Prints results either as text or as pretty JSON on stdout
#[derive(Debug, Clone, Copy)]
pub(crate) struct Output {
    json: bool,
}

impl Output {
    pub(crate) fn new(json: bool) -> Self {
        Self { json }
    }

    fn emit<T: Serialize>(&self, value: &T) {
        match serde_json::to_string_pretty(value) {
            Ok(text) => println!("{text}"),
            Err(err) => eprintln!("failed to encode output: {err}"),
        }
    }

    pub(crate) fn spec(&self, spec: &Specification) -> ExitCode {
        let summary = TreeSummary::of(&spec.root);
        if self.json {
            self.emit(&serde_json::json!({
                "id": spec.id,
                "name": spec.name,
                "version": spec.version,
                "checksum": spec.checksum().to_string(),
                "summary": summary,
                "structural_errors": spec.structural_errors.len(),
            }));
        } else {
            println!("{} ({}) v{}", spec.name, spec.id, spec.version);
            println!("  checksum:   {}", spec.checksum().short());
            println!(
                "  components: {} ({} leaves, depth {})",
                summary.total_nodes, summary.leaf_count, summary.depth
            );
            for (kind, count) in &summary.by_type {
                println!("    {kind}: {count}");
            }
            if !spec.structural_errors.is_empty() {
                println!("  structural errors: {}", spec.structural_errors.len());
            }
        }
        ExitCode::SUCCESS
    }

    /// `as_json` selects the outline export even without `--json`
    pub(crate) fn tree(&self, spec: &Specification, as_json: bool, depth: Option<usize>) -> ExitCode {
        if self.json || as_json {
            self.emit(&Outline::of(spec));
        } else {
            println!("{}", render_ascii(&spec.root, depth));
        }
        ExitCode::SUCCESS
    }

    pub(crate) fn matches(&self, spec: &Specification, query: &str) -> ExitCode {
        let found: Vec<_> = search(&spec.root, query)
            .into_iter()
            .map(|node| {
                let path = path_to(&spec.root, &node.id).unwrap_or_default();
                (node, path)
            })
            .collect();
        if self.json {
            let entries: Vec<_> = found
                .iter()
                .map(|(node, path)| {
                    serde_json::json!({
                        "id": node.id,
                        "name": node.name,
                        "component_type": node.component_type(),
                        "path": path,
                    })
                })
                .collect();
            self.emit(&entries);
        } else if found.is_empty() {
            println!("no component matches \"{query}\" in {}", spec.id);
        } else {
            for (node, path) in &found {
                println!("{} {} ({})", node.id, node.name, node.component_type());
                println!("  {}", path.join(" > "));
            }
        }
        if found.is_empty() {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        }
    }

    pub(crate) fn validation(&self, report: &ValidationReport) -> ExitCode {
        if self.json {
            self.emit(report);
        } else {
            println!(
                "{}: {} nodes checked, {} finding(s)",
                report.spec_id,
                report.checked_nodes,
                report.findings.len()
            );
            for finding in &report.findings {
                println!("  {finding}");
            }
            println!("{}", if report.is_valid() { "VALID" } else { "INVALID" });
        }
        if report.is_valid() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        }
    }

    pub(crate) fn tree_tests(
        &self,
        results: &[(String, Result<TreeTestResults, EngineError>)],
    ) -> ExitCode {
        let failed = results.iter().filter(|(_, r)| r.is_err()).count();
        if self.json {
            let entries: Vec<_> = results
                .iter()
                .map(|(name, result)| match result {
                    Ok(results) => serde_json::json!({ "spec": name, "results": results }),
                    Err(err) => serde_json::json!({ "spec": name, "error": error_json(err) }),
                })
                .collect();
            self.emit(&entries);
        } else {
            for (name, result) in results {
                match result {
                    Ok(r) => {
                        println!(
                            "{name}: PASSED quality {:.1}, coverage {}/{}, performance {:.2}, {}ms",
                            r.quality_score,
                            r.coverage.passed,
                            r.coverage.total,
                            r.performance.score,
                            r.duration_ms
                        );
                        for rec in &r.recommendations {
                            println!("  - {rec}");
                        }
                    }
                    Err(err) => {
                        println!("{name}: FAILED {err}");
                        print_checklist(err);
                    }
                }
            }
        }
        if failed == 0 {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        }
    }

    pub(crate) fn debug(&self, results: &DebugResults) -> ExitCode {
        if self.json {
            self.emit(results);
            return ExitCode::SUCCESS;
        }
        let c = &results.classification;
        println!(
            "{} in {}: {} / {:?} / {:?}",
            results.failure_id, results.spec_id, c.failure_type, c.severity, c.category
        );
        println!(
            "  isolated:   {} via {:?} ({:.2})",
            results.isolation.component_id, results.isolation.method, results.isolation.confidence
        );
        println!("  path:       {}", results.isolation.path.join(" > "));
        println!("  hypothesis: {}", results.root_cause.hypothesis);
        println!("  confidence: {:.2}", results.confidence);
        println!("  remediation:");
        for step in &results.remediation.steps {
            println!("    [{:?}] {}", step.priority, step.action);
        }
        ExitCode::SUCCESS
    }

    pub(crate) fn approval(&self, approval: &Approval) -> ExitCode {
        if self.json {
            self.emit(approval);
        } else {
            println!(
                "APPROVED {} v{} (quality {:.1}, coverage {:.1}%)",
                approval.component_id, approval.version, approval.quality_score, approval.coverage
            );
            if !approval.skipped_leaves.is_empty() {
                println!("  skipped: {}", approval.skipped_leaves.join(", "));
            }
            for rec in &approval.recommendations {
                println!("  - {rec}");
            }
        }
        ExitCode::SUCCESS
    }

    pub(crate) fn graph(
        &self,
        graph: &DependencyGraph,
        impacted: Option<(&str, BTreeSet<String>)>,
    ) -> ExitCode {
        let summary = graph.summary();
        let cycles = graph.cycles();
        if self.json {
            self.emit(&serde_json::json!({
                "summary": summary,
                "cycles": cycles,
                "impact": impacted.as_ref().map(|(id, set)| serde_json::json!({ "component": id, "impacted": set })),
            }));
        } else {
            println!(
                "{} components, {} edges, {} external, {} specifications",
                summary.nodes, summary.edges, summary.external, summary.specs
            );
            for cycle in &cycles {
                println!("  cycle: {}", cycle.join(" -> "));
            }
            if let Some((id, set)) = &impacted {
                println!("  changing {id} impacts {} component(s)", set.len());
                for component in set {
                    println!("    {component}");
                }
            }
        }
        if cycles.is_empty() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        }
    }

    pub(crate) fn sync_status(&self, status: &SyncStatus) -> ExitCode {
        if self.json {
            self.emit(status);
        } else {
            println!("node {}: {}", status.node_id, status.health);
            println!("  specs:  {}", status.total_specs);
            println!("  peers:  {}", status.peer_count);
            println!("  active: {}", status.active_syncs);
            match status.last_sync_time {
                Some(at) => println!("  last sync: {}", at.to_rfc3339()),
                None => println!("  last sync: never"),
            }
        }
        ExitCode::SUCCESS
    }

    pub(crate) fn error(&self, err: &EngineError) -> ExitCode {
        if self.json {
            self.emit(&error_json(err));
        } else {
            eprintln!("error: {err}");
            print_checklist(err);
        }
        ExitCode::FAILURE
    }
}

fn error_json(err: &EngineError) -> serde_json::Value {
    serde_json::json!({
        "message": err.to_string(),
        "stage": err.stage(),
        "retryable": err.is_retryable(),
        "checklist": err.checklist(),
    })
}

fn print_checklist(err: &EngineError) {
    if let Some(stage) = err.stage() {
        eprintln!("  failed at {stage}; check:");
        for item in err.checklist() {
            eprintln!("    - {item}");
        }
    }
}
