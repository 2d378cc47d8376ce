//! Performance validation against declared thresholds and benchmarks

use super::results::{CheckSource, CheckStatus, CoverageReport, PerformanceCheck, PerformanceReport};
use arbor_spec::{Metric, Specification};

fn status(limit: f64, measured: Option<f64>) -> CheckStatus {
    match measured {
        None => CheckStatus::Unmeasured,
        Some(m) if m <= limit => CheckStatus::Passed,
        Some(_) => CheckStatus::Failed,
    }
}

/// Compare measurements from the coverage pass with declared expectations
///
/// `metadata.performance` values are hard bounds. Benchmarks are scored:
/// the composite score is passed over measured benchmarks.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn validate(spec: &Specification, coverage: &CoverageReport) -> PerformanceReport {
    let measured = |component: &str, metric: Metric| {
        coverage
            .result(component)
            .and_then(|r| r.measurements.get(metric))
    };

    let mut checks = Vec::new();

    for node in spec.root.iter() {
        let Some(thresholds) = node.performance() else {
            continue;
        };
        let bounds = [
            (Metric::LatencyMs, thresholds.latency_ms),
            (Metric::MemoryMb, thresholds.memory_mb),
            (Metric::CpuPercent, thresholds.cpu_percent),
        ];
        for (metric, limit) in bounds {
            let Some(limit) = limit else { continue };
            let value = measured(&node.id, metric);
            checks.push(PerformanceCheck {
                component_id: node.id.clone(),
                metric,
                limit,
                measured: value,
                source: CheckSource::Threshold,
                status: status(limit, value),
            });
        }
    }

    for bench in &spec.testing.performance_benchmarks {
        let (Some(metric), Some(target)) = (bench.metric, bench.target) else {
            tracing::debug!("Benchmark {} has no metric/target; skipped", bench.id);
            continue;
        };
        let component = bench.component.clone().unwrap_or_else(|| spec.root.id.clone());
        let value = measured(&component, metric);
        checks.push(PerformanceCheck {
            status: status(target, value),
            component_id: component,
            metric,
            limit: target,
            measured: value,
            source: CheckSource::Benchmark(bench.id.clone()),
        });
    }

    let scored: Vec<_> = checks
        .iter()
        .filter(|c| matches!(c.source, CheckSource::Benchmark(_)))
        .filter(|c| c.status != CheckStatus::Unmeasured)
        .collect();
    let score = if scored.is_empty() {
        1.0
    } else {
        scored.iter().filter(|c| c.status == CheckStatus::Passed).count() as f64 / scored.len() as f64
    };

    PerformanceReport { checks, score }
}
