//! Client side of a running daemon

use crate::error::SyncError;
use crate::record::{Announcement, NodeId};
use crate::status::{KnownSpec, SyncStatus};
use arbor_spec::ContentHash;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// Messages accepted by the daemon loop
#[derive(Debug)]
pub(crate) enum Command {
    LocalChange {
        spec: String,
        checksum: ContentHash,
    },
    Announce(Announcement),
    SyncNow(oneshot::Sender<()>),
    HealthCheck(oneshot::Sender<()>),
    Status(oneshot::Sender<SyncStatus>),
    Records(oneshot::Sender<BTreeMap<String, KnownSpec>>),
    Peers(oneshot::Sender<Vec<NodeId>>),
    Shutdown,
}

/// Cloneable handle to a spawned [`SyncDaemon`](crate::SyncDaemon)
#[derive(Debug, Clone)]
pub struct SyncHandle {
    node_id: NodeId,
    sender: mpsc::Sender<Command>,
    query_timeout: Duration,
}

impl SyncHandle {
    pub(crate) fn new(node_id: NodeId, sender: mpsc::Sender<Command>, query_timeout: Duration) -> Self {
        Self {
            node_id,
            sender,
            query_timeout,
        }
    }

    #[inline]
    #[must_use]
    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    /// Whether the daemon loop has exited
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Report a change made on this node
    ///
    /// # Errors
    /// `DaemonStopped` if the loop has exited.
    pub async fn local_change(
        &self,
        spec: impl Into<String>,
        checksum: ContentHash,
    ) -> Result<(), SyncError> {
        self.send(Command::LocalChange {
            spec: spec.into(),
            checksum,
        })
        .await
    }

    /// Hand a peer's announcement to this daemon
    ///
    /// # Errors
    /// `DaemonStopped` if the loop has exited.
    pub async fn deliver(&self, announcement: Announcement) -> Result<(), SyncError> {
        self.send(Command::Announce(announcement)).await
    }

    /// Run a sync cycle now and wait for it to finish
    ///
    /// # Errors
    /// `DaemonStopped` if the loop has exited.
    pub async fn sync_now(&self) -> Result<(), SyncError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::SyncNow(tx)).await?;
        rx.await.map_err(|_| SyncError::DaemonStopped)
    }

    /// Run a health check now and wait for it to finish
    ///
    /// # Errors
    /// `DaemonStopped` if the loop has exited.
    pub async fn health_check(&self) -> Result<(), SyncError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::HealthCheck(tx)).await?;
        rx.await.map_err(|_| SyncError::DaemonStopped)
    }

    /// Current status; `Disconnected` when the daemon does not answer in time
    pub async fn status(&self) -> SyncStatus {
        let (tx, rx) = oneshot::channel();
        self.query(Command::Status(tx), rx)
            .await
            .unwrap_or_else(|| SyncStatus::disconnected(self.node_id.clone()))
    }

    /// Known records; empty when the daemon does not answer in time
    pub async fn records(&self) -> BTreeMap<String, KnownSpec> {
        let (tx, rx) = oneshot::channel();
        self.query(Command::Records(tx), rx)
            .await
            .unwrap_or_default()
    }

    /// Live peer set; empty when the daemon does not answer in time
    pub async fn peers(&self) -> Vec<NodeId> {
        let (tx, rx) = oneshot::channel();
        self.query(Command::Peers(tx), rx).await.unwrap_or_default()
    }

    /// Stop the loop. Idempotent.
    pub async fn shutdown(&self) {
        let _ = self.sender.send(Command::Shutdown).await;
    }

    async fn send(&self, command: Command) -> Result<(), SyncError> {
        self.sender
            .send(command)
            .await
            .map_err(|_| SyncError::DaemonStopped)
    }

    async fn query<T>(&self, command: Command, reply: oneshot::Receiver<T>) -> Option<T> {
        let exchange = async {
            self.sender.send(command).await.ok()?;
            reply.await.ok()
        };
        match tokio::time::timeout(self.query_timeout, exchange).await {
            Ok(answer) => answer,
            Err(_) => {
                tracing::warn!("Sync daemon {} did not answer in time", self.node_id);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::SyncHealth;

    #[tokio::test]
    async fn stopped_daemon_degrades_to_defaults() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let handle = SyncHandle::new("x".into(), tx, Duration::from_millis(50));

        assert!(handle.is_closed());
        assert_eq!(handle.status().await.health, SyncHealth::Disconnected);
        assert!(handle.records().await.is_empty());
        assert_eq!(
            handle.local_change("auth", ContentHash::new([0; 32])).await,
            Err(SyncError::DaemonStopped)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn silent_daemon_times_out() {
        let (tx, _rx) = mpsc::channel(4);
        let handle = SyncHandle::new("x".into(), tx, Duration::from_secs(1));

        let status = handle.status().await;
        assert_eq!(status, SyncStatus::disconnected("x".into()));
    }
}
