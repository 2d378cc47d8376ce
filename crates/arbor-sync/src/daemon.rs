//! The synchronization loop
//!
//! One task owns all version records. Commands arrive over a channel, two
//! timers drive the periodic sync and health cycles, and broadcasts are
//! spawned so a slow peer never stalls the loop. Every collaborator call is
//! bounded by the peer timeout. Because both timers are polled from the same
//! task, neither cycle can overlap its previous run.

use crate::handle::{Command, SyncHandle};
use crate::owners::OwnerRegistry;
use crate::record::{resolve, Announcement, NodeId, Resolution, VersionRecord};
use crate::status::{DaemonConfig, KnownSpec, SyncHealth, SyncStatus};
use crate::transport::{
    EmptySource, LoggingNotifier, OwnerNotifier, PeerDiscovery, PeerTransport, SpecSource,
    UpdateType,
};
use arbor_spec::ContentHash;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{interval_at, timeout, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

const COMMAND_BUFFER: usize = 256;

/// Per-node replication daemon
pub struct SyncDaemon {
    config: DaemonConfig,
    transport: Arc<dyn PeerTransport>,
    discovery: Arc<dyn PeerDiscovery>,
    notifier: Arc<dyn OwnerNotifier>,
    source: Arc<dyn SpecSource>,
    owners: OwnerRegistry,

    records: HashMap<String, KnownSpec>,
    /// Last checksum observed in the local source per spec
    local_seen: HashMap<String, ContentHash>,
    peers: Vec<NodeId>,
    last_sync: Option<DateTime<Utc>>,
    last_scan_failed: bool,
    peers_dropped: bool,
    active_syncs: Arc<AtomicUsize>,
}

impl SyncDaemon {
    #[must_use]
    pub fn new(
        config: DaemonConfig,
        transport: Arc<dyn PeerTransport>,
        discovery: Arc<dyn PeerDiscovery>,
    ) -> Self {
        Self {
            config,
            transport,
            discovery,
            notifier: Arc::new(LoggingNotifier),
            source: Arc::new(EmptySource),
            owners: OwnerRegistry::default(),
            records: HashMap::new(),
            local_seen: HashMap::new(),
            peers: Vec::new(),
            last_sync: None,
            last_scan_failed: false,
            peers_dropped: false,
            active_syncs: Arc::new(AtomicUsize::new(0)),
        }
    }

    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn OwnerNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: Arc<dyn SpecSource>) -> Self {
        self.source = source;
        self
    }

    #[must_use]
    pub fn with_owners(mut self, owners: OwnerRegistry) -> Self {
        self.owners = owners;
        self
    }

    /// Start the loop on the current runtime
    #[must_use]
    pub fn spawn(self) -> SyncHandle {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let handle = SyncHandle::new(
            self.config.node_id.clone(),
            tx,
            self.config.status_timeout,
        );
        tokio::spawn(self.run(rx));
        handle
    }

    async fn run(mut self, mut rx: mpsc::Receiver<Command>) {
        info!("Sync daemon {} starting", self.config.node_id);
        self.refresh_peers().await;
        self.sync_cycle().await;

        let start = Instant::now();
        let mut sync_timer = interval_at(start + self.config.sync_interval, self.config.sync_interval);
        sync_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut health_timer =
            interval_at(start + self.config.health_interval, self.config.health_interval);
        health_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                command = rx.recv() => match command {
                    None | Some(Command::Shutdown) => break,
                    Some(command) => self.handle(command).await,
                },
                _ = sync_timer.tick() => self.sync_cycle().await,
                _ = health_timer.tick() => self.health_check().await,
            }
        }

        info!("Sync daemon {} stopped", self.config.node_id);
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::LocalChange { spec, checksum } => self.local_change(spec, checksum),
            Command::Announce(announcement) => self.receive(&announcement),
            Command::SyncNow(done) => {
                self.sync_cycle().await;
                let _ = done.send(());
            }
            Command::HealthCheck(done) => {
                self.health_check().await;
                let _ = done.send(());
            }
            Command::Status(reply) => {
                let _ = reply.send(self.status());
            }
            Command::Records(reply) => {
                let snapshot: BTreeMap<_, _> = self
                    .records
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                let _ = reply.send(snapshot);
            }
            Command::Peers(reply) => {
                let _ = reply.send(self.peers.clone());
            }
            Command::Shutdown => {}
        }
    }

    fn status(&self) -> SyncStatus {
        SyncStatus {
            node_id: self.config.node_id.clone(),
            total_specs: self.records.len(),
            last_sync_time: self.last_sync,
            active_syncs: self.active_syncs.load(Ordering::SeqCst),
            peer_count: self.peers.len(),
            health: self.health(),
        }
    }

    fn health(&self) -> SyncHealth {
        if self.last_scan_failed || self.peers_dropped {
            SyncHealth::Degraded
        } else {
            SyncHealth::Healthy
        }
    }

    /// Record a change made on this node and tell every peer
    fn local_change(&mut self, spec: String, checksum: ContentHash) {
        self.local_seen.insert(spec.clone(), checksum);
        if self
            .records
            .get(&spec)
            .is_some_and(|known| known.record.checksum == checksum)
        {
            debug!("Local change to {} matches known checksum", spec);
            return;
        }

        let announcement = Announcement {
            spec: spec.clone(),
            checksum,
            updated_at: Utc::now(),
            source_node: self.config.node_id.clone(),
        };
        let record = announcement.record();
        match self.records.get_mut(&spec) {
            Some(known) => {
                let previous = std::mem::replace(&mut known.record, record);
                known.superseded.push(previous.checksum);
            }
            None => {
                self.records.insert(
                    spec.clone(),
                    KnownSpec {
                        record,
                        superseded: Vec::new(),
                    },
                );
            }
        }
        info!("Local change: {} -> {}", spec, checksum.short());
        self.broadcast(announcement);
    }

    /// Apply a peer's announcement
    fn receive(&mut self, announcement: &Announcement) {
        if announcement.source_node == self.config.node_id {
            return;
        }

        let existing = self.records.get(&announcement.spec).map(|k| &k.record);
        match resolve(existing, announcement) {
            Resolution::Unchanged => {
                debug!("{} already at {}", announcement.spec, announcement.checksum.short());
            }
            Resolution::Accepted(record) => {
                info!(
                    "Accepted {} {} from {}",
                    announcement.spec,
                    record.checksum.short(),
                    record.source_node
                );
                self.records.insert(
                    announcement.spec.clone(),
                    KnownSpec {
                        record,
                        superseded: Vec::new(),
                    },
                );
                self.notify_owner(&announcement.spec, UpdateType::Added);
            }
            Resolution::Replaced { record, superseded } => {
                warn!(
                    "Conflict on {}: {} superseded by {} from {}",
                    announcement.spec,
                    superseded.short(),
                    record.checksum.short(),
                    record.source_node
                );
                self.apply_replacement(&announcement.spec, record, superseded);
                self.notify_owner(&announcement.spec, UpdateType::Replaced);
            }
        }
    }

    fn apply_replacement(&mut self, spec: &str, record: VersionRecord, superseded: ContentHash) {
        if let Some(known) = self.records.get_mut(spec) {
            known.record = record;
            known.superseded.push(superseded);
        }
    }

    fn notify_owner(&self, spec: &str, update: UpdateType) {
        match self.owners.owner_of(spec) {
            Some(owner) => self.notifier.notify(owner, spec, update),
            None => debug!("No owner mapped for {}", spec),
        }
    }

    /// Re-scan the local source and broadcast anything that moved
    async fn sync_cycle(&mut self) {
        let scanned = match timeout(self.config.peer_timeout, self.source.checksums()).await {
            Ok(Ok(scanned)) => scanned,
            Ok(Err(err)) => {
                warn!("Local scan failed: {}", err);
                self.last_scan_failed = true;
                return;
            }
            Err(_) => {
                warn!("Local scan timed out after {:?}", self.config.peer_timeout);
                self.last_scan_failed = true;
                return;
            }
        };
        self.last_scan_failed = false;

        let mut changed = 0usize;
        for (spec, checksum) in scanned {
            if self.local_seen.get(&spec) == Some(&checksum) {
                continue;
            }
            changed += 1;
            self.local_change(spec, checksum);
        }

        self.last_sync = Some(Utc::now());
        if changed > 0 {
            info!("Sync cycle: {} local change(s)", changed);
        }
    }

    /// Rediscover peers and drop the ones that do not answer
    async fn health_check(&mut self) {
        let candidates = self.discover().await;
        let transport = Arc::clone(&self.transport);
        let limit = self.config.peer_timeout;
        let alive = futures::future::join_all(candidates.iter().map(|peer| {
            let transport = Arc::clone(&transport);
            async move { timeout(limit, transport.ping(peer)).await.unwrap_or(false) }
        }))
        .await;

        let (up, down): (Vec<_>, Vec<_>) = candidates
            .into_iter()
            .zip(alive)
            .partition(|(_, alive)| *alive);
        for (peer, _) in &down {
            warn!("Peer {} unreachable; dropped", peer);
        }

        self.peers_dropped = !down.is_empty();
        self.peers = up.into_iter().map(|(peer, _)| peer).collect();
        debug!("Health check: {} peer(s) alive", self.peers.len());
    }

    async fn refresh_peers(&mut self) {
        self.peers = self.discover().await;
    }

    async fn discover(&self) -> Vec<NodeId> {
        let mut peers = match timeout(self.config.peer_timeout, self.discovery.list_peers()).await {
            Ok(peers) => peers,
            Err(_) => {
                warn!("Peer discovery timed out; assuming no peers");
                Vec::new()
            }
        };
        peers.retain(|peer| *peer != self.config.node_id);
        peers.sort();
        peers.dedup();
        peers
    }

    fn broadcast(&self, announcement: Announcement) {
        if self.peers.is_empty() {
            return;
        }
        let peers = self.peers.clone();
        let transport = Arc::clone(&self.transport);
        let active = Arc::clone(&self.active_syncs);
        let limit = self.config.peer_timeout;
        active.fetch_add(1, Ordering::SeqCst);

        tokio::spawn(async move {
            let sends = peers.iter().map(|peer| {
                let announcement = announcement.clone();
                let transport = Arc::clone(&transport);
                async move {
                    match timeout(limit, transport.announce(peer, announcement)).await {
                        Ok(Ok(())) => {}
                        Ok(Err(err)) => warn!("Broadcast to {} failed: {}", peer, err),
                        Err(_) => warn!("Broadcast to {} timed out", peer),
                    }
                }
            });
            futures::future::join_all(sends).await;
            active.fetch_sub(1, Ordering::SeqCst);
        });
    }
}

impl std::fmt::Debug for SyncDaemon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncDaemon")
            .field("node_id", &self.config.node_id)
            .field("records", &self.records.len())
            .field("peers", &self.peers)
            .finish_non_exhaustive()
    }
}
