//! Synchronization errors
//!
//! Conflicts are not errors; they are resolved and logged. These cover
//! startup configuration and collaborators that cannot be reached.

use crate::record::NodeId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    #[error("invalid owner table: {0}")]
    InvalidOwnerTable(String),

    #[error("peer {0} unreachable")]
    PeerUnreachable(NodeId),

    #[error("local specification source failed: {0}")]
    Source(String),

    #[error("sync daemon is not running")]
    DaemonStopped,
}

impl SyncError {
    pub fn source_error(err: impl std::fmt::Display) -> Self {
        Self::Source(err.to_string())
    }
}
