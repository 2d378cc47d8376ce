//! Arbor Synchronization Daemon
//!
//! Keeps every node's view of specification versions eventually
//! consistent:
//!
//! - Local changes are broadcast to all known peers
//! - A periodic cycle re-scans local specs and broadcasts what moved
//! - Incoming announcements are resolved against the local record
//!   (a differing remote checksum always wins)
//! - A periodic health check drops peers that stop answering
//!
//! The daemon owns no network stack; peers, discovery, owner notification
//! and the local source are injected through the traits in this crate.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod daemon;
mod error;
mod federation;
mod handle;
mod owners;
mod record;
mod status;
mod transport;

pub use daemon::SyncDaemon;
pub use error::SyncError;
pub use federation::{FederationDiscovery, LocalFederation};
pub use handle::SyncHandle;
pub use owners::OwnerRegistry;
pub use record::{resolve, Announcement, NodeId, Resolution, VersionRecord};
pub use status::{
    DaemonConfig, KnownSpec, SyncHealth, SyncStatus, DEFAULT_HEALTH_INTERVAL, DEFAULT_PEER_TIMEOUT,
    DEFAULT_STATUS_TIMEOUT, DEFAULT_SYNC_INTERVAL,
};
pub use transport::{
    EmptySource, LoggingNotifier, OwnerNotifier, PeerDiscovery, PeerTransport, SpecSource,
    StaticDiscovery, UpdateType,
};
