//! In-process federation
//!
//! Connects several daemons in one process. Used by tests and local
//! simulation in place of a network transport.

use crate::error::SyncError;
use crate::handle::SyncHandle;
use crate::record::{Announcement, NodeId};
use crate::transport::{PeerDiscovery, PeerTransport};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Shared registry of member daemons; clones share state
#[derive(Debug, Clone, Default)]
pub struct LocalFederation {
    members: Arc<RwLock<BTreeMap<NodeId, SyncHandle>>>,
}

impl LocalFederation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a running daemon
    pub fn join(&self, handle: SyncHandle) {
        tracing::debug!("{} joined the federation", handle.node_id());
        self.members.write().insert(handle.node_id().clone(), handle);
    }

    /// Remove a member; later pings and announcements to it fail
    pub fn leave(&self, node: &NodeId) -> Option<SyncHandle> {
        self.members.write().remove(node)
    }

    /// Current members in id order
    #[must_use]
    pub fn members(&self) -> Vec<NodeId> {
        self.members.read().keys().cloned().collect()
    }

    /// Discovery view for `node`: every other member
    #[must_use]
    pub fn discovery_for(&self, node: impl Into<NodeId>) -> FederationDiscovery {
        FederationDiscovery {
            federation: self.clone(),
            node: node.into(),
        }
    }

    fn member(&self, node: &NodeId) -> Option<SyncHandle> {
        self.members.read().get(node).cloned()
    }
}

#[async_trait]
impl PeerTransport for LocalFederation {
    async fn announce(&self, peer: &NodeId, announcement: Announcement) -> Result<(), SyncError> {
        let handle = self
            .member(peer)
            .ok_or_else(|| SyncError::PeerUnreachable(peer.clone()))?;
        handle
            .deliver(announcement)
            .await
            .map_err(|_| SyncError::PeerUnreachable(peer.clone()))
    }

    async fn ping(&self, peer: &NodeId) -> bool {
        self.member(peer).is_some_and(|handle| !handle.is_closed())
    }
}

/// Peer listing backed by a [`LocalFederation`]
#[derive(Debug, Clone)]
pub struct FederationDiscovery {
    federation: LocalFederation,
    node: NodeId,
}

#[async_trait]
impl PeerDiscovery for FederationDiscovery {
    async fn list_peers(&self) -> Vec<NodeId> {
        self.federation
            .members()
            .into_iter()
            .filter(|member| *member != self.node)
            .collect()
    }
}
