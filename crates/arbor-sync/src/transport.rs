//! Collaborators the daemon talks to
//!
//! The daemon never owns a network stack. Peers, discovery, owner
//! notification and the local specification source are all injected.

use crate::error::SyncError;
use crate::record::{Announcement, NodeId};
use arbor_spec::ContentHash;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Delivers announcements to peers
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PeerTransport: Send + Sync {
    /// Send one announcement to `peer`
    async fn announce(&self, peer: &NodeId, announcement: Announcement) -> Result<(), SyncError>;

    /// Liveness check used by the health cycle
    async fn ping(&self, peer: &NodeId) -> bool;
}

/// Lists the nodes currently in the federation
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PeerDiscovery: Send + Sync {
    /// Known peers. An unavailable directory yields an empty list.
    async fn list_peers(&self) -> Vec<NodeId>;
}

/// Kind of change reported to a spec's owning component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateType {
    /// First version seen from a peer
    Added,
    /// A peer replaced the known version
    Replaced,
}

impl fmt::Display for UpdateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Added => f.write_str("added"),
            Self::Replaced => f.write_str("replaced"),
        }
    }
}

/// Fire-and-forget owner notification; must not block
#[cfg_attr(test, mockall::automock)]
pub trait OwnerNotifier: Send + Sync {
    fn notify(&self, owner: &str, spec: &str, update: UpdateType);
}

/// Current checksums of the specifications stored on this node
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpecSource: Send + Sync {
    async fn checksums(&self) -> Result<BTreeMap<String, ContentHash>, SyncError>;
}

/// Fixed peer list
#[derive(Debug, Clone, Default)]
pub struct StaticDiscovery {
    peers: Vec<NodeId>,
}

impl StaticDiscovery {
    #[must_use]
    pub fn new(peers: impl IntoIterator<Item = NodeId>) -> Self {
        Self {
            peers: peers.into_iter().collect(),
        }
    }
}

#[async_trait]
impl PeerDiscovery for StaticDiscovery {
    async fn list_peers(&self) -> Vec<NodeId> {
        self.peers.clone()
    }
}

/// Notifier that only records the event in the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingNotifier;

impl OwnerNotifier for LoggingNotifier {
    fn notify(&self, owner: &str, spec: &str, update: UpdateType) {
        tracing::info!("Notify {}: {} {}", owner, spec, update);
    }
}

/// Source with nothing stored
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptySource;

#[async_trait]
impl SpecSource for EmptySource {
    async fn checksums(&self) -> Result<BTreeMap<String, ContentHash>, SyncError> {
        Ok(BTreeMap::new())
    }
}
