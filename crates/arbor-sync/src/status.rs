//! Daemon configuration and status reporting

use crate::record::{NodeId, VersionRecord};
use arbor_spec::ContentHash;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Default interval between local re-scans
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(30);
/// Default interval between peer health checks
pub const DEFAULT_HEALTH_INTERVAL: Duration = Duration::from_secs(120);
/// Default bound on synchronous status queries
pub const DEFAULT_STATUS_TIMEOUT: Duration = Duration::from_secs(5);
/// Default bound on each collaborator call (ping, discovery, scan, announce)
pub const DEFAULT_PEER_TIMEOUT: Duration = Duration::from_secs(3);

/// Runtime settings of one daemon
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonConfig {
    pub node_id: NodeId,
    pub sync_interval: Duration,
    pub health_interval: Duration,
    pub status_timeout: Duration,
    /// A ping that outlives this counts as a dead peer
    pub peer_timeout: Duration,
}

impl DaemonConfig {
    #[must_use]
    pub fn new(node_id: impl Into<NodeId>) -> Self {
        Self {
            node_id: node_id.into(),
            sync_interval: DEFAULT_SYNC_INTERVAL,
            health_interval: DEFAULT_HEALTH_INTERVAL,
            status_timeout: DEFAULT_STATUS_TIMEOUT,
            peer_timeout: DEFAULT_PEER_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_sync_interval(mut self, interval: Duration) -> Self {
        self.sync_interval = interval;
        self
    }

    #[must_use]
    pub fn with_health_interval(mut self, interval: Duration) -> Self {
        self.health_interval = interval;
        self
    }

    #[must_use]
    pub fn with_status_timeout(mut self, timeout: Duration) -> Self {
        self.status_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_peer_timeout(mut self, timeout: Duration) -> Self {
        self.peer_timeout = timeout;
        self
    }
}

/// Coarse daemon health
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncHealth {
    Healthy,
    /// Last health check dropped a peer or the local scan failed
    Degraded,
    /// Daemon did not answer in time
    Disconnected,
}

impl fmt::Display for SyncHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy => f.write_str("healthy"),
            Self::Degraded => f.write_str("degraded"),
            Self::Disconnected => f.write_str("disconnected"),
        }
    }
}

/// Snapshot answered by `SyncHandle::status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatus {
    pub node_id: NodeId,
    pub total_specs: usize,
    pub last_sync_time: Option<DateTime<Utc>>,
    pub active_syncs: usize,
    pub peer_count: usize,
    pub health: SyncHealth,
}

impl SyncStatus {
    /// Result used when the daemon cannot be reached
    #[must_use]
    pub fn disconnected(node_id: NodeId) -> Self {
        Self {
            node_id,
            total_specs: 0,
            last_sync_time: None,
            active_syncs: 0,
            peer_count: 0,
            health: SyncHealth::Disconnected,
        }
    }
}

/// Known version of a spec plus the checksums it replaced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownSpec {
    pub record: VersionRecord,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub superseded: Vec<ContentHash>,
}
