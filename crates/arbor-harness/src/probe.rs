//! Component probes
//!
//! A probe exercises the real component behind a [`ComponentNode`] and
//! reports whether it behaves. Probes are the only seam between the testing
//! pipelines and the running system; every call goes through a
//! [`ProbeRunner`] which bounds it with a timeout and times it.

use crate::mock::MockSet;
use arbor_spec::{ComponentNode, Metric};
use arbor_store::{check_code_ref, ModuleResolver, Resolution};
use async_trait::async_trait;
use serde::Serialize;
use std::fmt::Debug;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Default bound on a single probe call
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// What a probe call is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeMode {
    /// Breadth-first coverage pass
    Coverage,
    /// Component in isolation
    Unit,
    /// Component against its real dependencies
    Integration,
    /// Re-run after a change to confirm nothing else broke
    Regression,
}

/// One probe invocation
#[derive(Debug, Clone, Copy)]
pub struct ProbeRequest<'a> {
    pub node: &'a ComponentNode,
    pub mode: ProbeMode,
    /// Behavioral mocks standing in for named components
    pub mocks: &'a MockSet,
}

impl<'a> ProbeRequest<'a> {
    #[must_use]
    pub fn new(node: &'a ComponentNode, mode: ProbeMode, mocks: &'a MockSet) -> Self {
        Self { node, mode, mocks }
    }
}

/// Resource measurements taken during a probe
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Measurements {
    pub latency_ms: Option<f64>,
    pub memory_mb: Option<f64>,
    pub cpu_percent: Option<f64>,
}

impl Measurements {
    #[must_use]
    pub fn get(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::LatencyMs => self.latency_ms,
            Metric::MemoryMb => self.memory_mb,
            Metric::CpuPercent => self.cpu_percent,
        }
    }
}

/// Result of one probe call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeOutcome {
    pub passed: bool,
    /// Failure description; empty on success
    pub message: Option<String>,
    /// Function that failed, when the probe can tell
    pub failed_function: Option<String>,
    pub measurements: Measurements,
}

impl ProbeOutcome {
    #[must_use]
    pub fn pass() -> Self {
        Self {
            passed: true,
            message: None,
            failed_function: None,
            measurements: Measurements::default(),
        }
    }

    #[must_use]
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            passed: false,
            message: Some(message.into()),
            failed_function: None,
            measurements: Measurements::default(),
        }
    }

    #[must_use]
    pub fn with_measurements(mut self, measurements: Measurements) -> Self {
        self.measurements = measurements;
        self
    }

    #[must_use]
    pub fn in_function(mut self, function: impl Into<String>) -> Self {
        self.failed_function = Some(function.into());
        self
    }

    /// Failure message or empty string
    #[must_use]
    pub fn message(&self) -> &str {
        self.message.as_deref().unwrap_or_default()
    }
}

/// Exercises real components
#[async_trait]
pub trait ComponentProbe: Send + Sync + Debug {
    async fn probe(&self, request: ProbeRequest<'_>) -> ProbeOutcome;
}

/// Probe checking that a component is structurally reachable
///
/// A node passes when it is not a placeholder, its code reference resolves
/// under the source root and its module resolves. A node substituted by a
/// mock always passes.
#[derive(Debug, Clone)]
pub struct StructuralProbe {
    source_root: PathBuf,
    resolver: Arc<dyn ModuleResolver>,
}

impl StructuralProbe {
    #[must_use]
    pub fn new(source_root: impl Into<PathBuf>, resolver: Arc<dyn ModuleResolver>) -> Self {
        Self {
            source_root: source_root.into(),
            resolver,
        }
    }
}

#[async_trait]
impl ComponentProbe for StructuralProbe {
    async fn probe(&self, request: ProbeRequest<'_>) -> ProbeOutcome {
        let node = request.node;
        if request.mocks.contains(&node.id) {
            return ProbeOutcome::pass();
        }

        if let arbor_spec::NodeKind::Placeholder { reason } = &node.kind {
            return ProbeOutcome::fail(format!("interface undefined: {reason}"));
        }

        if let Some(code_ref) = &node.code_ref {
            if let Err(problem) = check_code_ref(&self.source_root, code_ref).await {
                return ProbeOutcome::fail(format!("code reference not found: {problem}"));
            }
        }

        if let Some(module) = &node.module {
            if self.resolver.resolve(module) == Resolution::Missing {
                return ProbeOutcome::fail(format!("module {module} is undefined"));
            }
        }

        ProbeOutcome::pass()
    }
}

/// Runs probes under a timeout
///
/// Latency is measured around each call; a probe that reports its own
/// latency keeps it.
#[derive(Debug, Clone)]
pub struct ProbeRunner {
    probe: Arc<dyn ComponentProbe>,
    timeout: Duration,
}

impl ProbeRunner {
    #[must_use]
    pub fn new(probe: Arc<dyn ComponentProbe>) -> Self {
        Self {
            probe,
            timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Probe once; a call exceeding the timeout fails with a `timeout` message
    pub async fn run(&self, request: ProbeRequest<'_>) -> ProbeOutcome {
        let id = &request.node.id;
        let started = tokio::time::Instant::now();
        match tokio::time::timeout(self.timeout, self.probe.probe(request)).await {
            Ok(mut outcome) => {
                if outcome.measurements.latency_ms.is_none() {
                    outcome.measurements.latency_ms =
                        Some(started.elapsed().as_secs_f64() * 1_000.0);
                }
                if !outcome.passed {
                    tracing::debug!("Probe failed for {}: {}", id, outcome.message());
                }
                outcome
            }
            Err(_) => {
                tracing::warn!("Probe timed out for {} after {:?}", id, self.timeout);
                ProbeOutcome::fail(format!(
                    "timeout after {}ms probing {id}",
                    self.timeout.as_millis()
                ))
            }
        }
    }
}
