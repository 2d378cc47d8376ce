//! Engine error type
//!
//! Aggregates the component errors so every engine entry point returns a
//! single tagged result.

use crate::config::ConfigError;
use arbor_gate::{GateStage, Rejection};
use arbor_graph::GraphError;
use arbor_harness::{DebugError, DebugStage, TreeStage, TreeTestError};
use arbor_store::LoadError;
use arbor_sync::SyncError;
use serde::Serialize;
use std::fmt;

/// Main engine error
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("load failed: {0}")]
    Load(#[from] LoadError),

    /// Validation produced blocking findings
    #[error("specification {spec} has {errors} validation error(s)")]
    Invalid { spec: String, errors: usize },

    #[error(transparent)]
    TreeTest(#[from] TreeTestError),

    #[error(transparent)]
    Debug(#[from] DebugError),

    #[error("integration rejected: {0}")]
    Rejected(#[from] Rejection),

    #[error("dependency graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("synchronization error: {0}")]
    Sync(#[from] SyncError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Pipeline stage an error is tagged with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "pipeline", content = "stage", rename_all = "snake_case")]
pub enum PipelineStage {
    TreeTest(TreeStage),
    Debug(DebugStage),
    Gate(GateStage),
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TreeTest(stage) => write!(f, "tree test / {stage}"),
            Self::Debug(stage) => write!(f, "debug / {stage}"),
            Self::Gate(stage) => write!(f, "gate / {stage}"),
        }
    }
}

impl EngineError {
    /// Whether retrying after fixing inputs or waiting may succeed
    ///
    /// Load errors are always recoverable; so are unreachable peers and a
    /// stopped daemon.
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Load(_)
                | Self::Sync(SyncError::PeerUnreachable(_) | SyncError::DaemonStopped)
        )
    }

    /// Stage a pipeline failed at, if this is a pipeline failure
    #[must_use]
    pub fn stage(&self) -> Option<PipelineStage> {
        match self {
            Self::TreeTest(e) => Some(PipelineStage::TreeTest(e.stage)),
            Self::Debug(e) => Some(PipelineStage::Debug(e.stage)),
            Self::Rejected(e) => Some(PipelineStage::Gate(e.stage)),
            _ => None,
        }
    }

    /// Manual-investigation checklist carried by pipeline failures
    #[must_use]
    pub fn checklist(&self) -> &[String] {
        match self {
            Self::Debug(e) => &e.checklist,
            Self::Rejected(e) => &e.checklist,
            _ => &[],
        }
    }
}
