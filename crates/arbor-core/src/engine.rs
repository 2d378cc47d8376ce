//! Coordinating engine
//!
//! Owns the specification store, the dependency graph snapshot and the
//! probe runner, and dispatches caller requests to the tree tester, debug
//! engine and integration gate. Requests for the same specification are
//! serialized; independent specifications run in parallel.

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::session::{SessionInfo, SessionKind, SessionRegistry, SpecLocks};
use crate::source::StoreSpecSource;
use arbor_gate::{Approval, IntegrationGate, SecurityScanner};
use arbor_graph::{build_graph, DependencyGraph, GraphBuilder, GraphHandle};
use arbor_harness::{
    ComponentProbe, DebugEngine, DebugResults, FailureContext, ProbeRunner, StructuralProbe,
    TreeTestResults, TreeTester,
};
use arbor_spec::Specification;
use arbor_store::{CacheStats, KnownModules, ModuleResolver, SpecStore, ValidationReport};
use arbor_sync::{
    LoggingNotifier, NodeId, PeerDiscovery, PeerTransport, SyncDaemon, SyncHandle, SyncStatus,
};
use futures::stream::{self, StreamExt};
use std::collections::BTreeSet;
use std::sync::Arc;

/// The caller-facing façade
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    store: SpecStore,
    runner: ProbeRunner,
    graph: GraphHandle,
    scanner: SecurityScanner,
    sessions: SessionRegistry,
    locks: SpecLocks,
    sync: Option<SyncHandle>,
}

impl Engine {
    /// Build an engine from validated configuration
    ///
    /// Components are probed structurally with a resolver that knows no
    /// modules; use [`Engine::with_resolver`] or [`Engine::with_probe`] to
    /// change that.
    ///
    /// # Errors
    /// `Config` when the configuration is invalid.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let resolver: Arc<dyn ModuleResolver> = Arc::new(KnownModules::default());
        let store = SpecStore::new(&config.store.spec_dir)
            .with_extension(&config.store.extension)
            .with_cache(config.store.cache_capacity, config.cache_ttl())
            .with_source_root(config.source_root())
            .with_max_file_size(config.store.max_file_size)
            .with_resolver(Arc::clone(&resolver));
        let probe = StructuralProbe::new(config.source_root(), resolver);
        let runner = ProbeRunner::new(Arc::new(probe)).with_timeout(config.probe_timeout());

        tracing::info!(
            "Engine ready over {} (node {})",
            config.store.spec_dir.display(),
            config.sync.node_id
        );
        Ok(Self {
            config,
            store,
            runner,
            graph: GraphHandle::default(),
            scanner: SecurityScanner::builtin(),
            sessions: SessionRegistry::new(),
            locks: SpecLocks::new(),
            sync: None,
        })
    }

    /// Resolve `module` references with `resolver` in validation and probes
    #[must_use]
    pub fn with_resolver(mut self, resolver: Arc<dyn ModuleResolver>) -> Self {
        self.store = self.store.with_resolver(Arc::clone(&resolver));
        let probe = StructuralProbe::new(self.config.source_root(), resolver);
        self.runner = ProbeRunner::new(Arc::new(probe)).with_timeout(self.config.probe_timeout());
        self
    }

    /// Replace the component probe
    #[must_use]
    pub fn with_probe(mut self, probe: Arc<dyn ComponentProbe>) -> Self {
        self.runner = ProbeRunner::new(probe).with_timeout(self.config.probe_timeout());
        self
    }

    #[must_use]
    pub fn with_scanner(mut self, scanner: SecurityScanner) -> Self {
        self.scanner = scanner;
        self
    }

    /// Attach a running sync daemon
    #[must_use]
    pub fn with_sync(mut self, handle: SyncHandle) -> Self {
        self.sync = Some(handle);
        self
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[inline]
    #[must_use]
    pub fn store(&self) -> &SpecStore {
        &self.store
    }

    /// Load specification `name`, cached for the configured TTL
    ///
    /// # Errors
    /// `Load` when the specification cannot be read or parsed.
    #[tracing::instrument(skip(self))]
    pub async fn load(&self, name: &str) -> Result<Arc<Specification>, EngineError> {
        Ok(self.store.load(name).await?)
    }

    /// Deep-validate specification `name`
    ///
    /// Findings, including errors, are returned in the report.
    ///
    /// # Errors
    /// `Load` when the specification cannot be loaded.
    #[tracing::instrument(skip(self))]
    pub async fn validate(&self, name: &str) -> Result<ValidationReport, EngineError> {
        let key = self.store.locator().canonical_name(name);
        let _lock = self.locks.lock(&key).await;
        let _session = self.sessions.begin(SessionKind::Validate, &key);
        let report = self.store.validate(name).await?;
        tracing::info!(
            "Validated {}: {} finding(s), valid: {}",
            name,
            report.findings.len(),
            report.is_valid()
        );
        Ok(report)
    }

    /// Run the tree test pipeline over `name`
    ///
    /// # Errors
    /// - `Load` when the specification cannot be loaded
    /// - `Invalid` when validation reports errors
    /// - `TreeTest` tagged with the failing stage
    #[tracing::instrument(skip(self))]
    pub async fn run_tree_tests(&self, name: &str) -> Result<TreeTestResults, EngineError> {
        let key = self.store.locator().canonical_name(name);
        let _lock = self.locks.lock(&key).await;
        let _session = self.sessions.begin(SessionKind::TreeTest, &key);
        let spec = self.load_valid(name).await?;

        let tester = TreeTester::new(self.runner.clone());
        let results = tester
            .run(&spec, &self.config.tree_test_options())
            .await?;
        tracing::info!(
            "Tree test of {} passed: quality {:.1}",
            name,
            results.quality_score
        );
        Ok(results)
    }

    /// Tree-test several specifications concurrently
    ///
    /// Results come back in input order; one failure does not stop the rest.
    pub async fn run_tree_tests_many(
        &self,
        names: &[String],
    ) -> Vec<(String, Result<TreeTestResults, EngineError>)> {
        stream::iter(names)
            .map(|name| async move { (name.clone(), self.run_tree_tests(name).await) })
            .buffered(self.config.tree_test.batch_concurrency.max(1))
            .collect()
            .await
    }

    /// Diagnose `failure_id` in specification `name`
    ///
    /// # Errors
    /// - `Load` when the specification cannot be loaded
    /// - `Debug` tagged with the failing stage
    #[tracing::instrument(skip(self, context))]
    pub async fn debug_failure(
        &self,
        name: &str,
        failure_id: &str,
        context: &FailureContext,
    ) -> Result<DebugResults, EngineError> {
        let key = self.store.locator().canonical_name(name);
        let _lock = self.locks.lock(&key).await;
        let _session = self.sessions.begin(SessionKind::Debug, &key);
        let spec = self.store.load(name).await?;

        let engine = DebugEngine::new(self.runner.clone());
        let results = engine
            .run(failure_id, context, &spec, &self.config.debug_options())
            .await?;
        Ok(results)
    }

    /// Gate specification `name` against every other stored specification
    ///
    /// An approved candidate is added to the published dependency graph and
    /// announced to peers when a sync daemon is attached.
    ///
    /// # Errors
    /// - `Load` when the candidate cannot be loaded
    /// - `Rejected` tagged with the failing gate stage
    #[tracing::instrument(skip(self))]
    pub async fn analyze_integration(&self, name: &str) -> Result<Approval, EngineError> {
        let key = self.store.locator().canonical_name(name);
        let _lock = self.locks.lock(&key).await;
        let _session = self.sessions.begin(SessionKind::Integration, &key);
        let candidate = self.store.load(name).await?;

        let others = self.load_specs(Some(&candidate.id)).await?;
        let system = build_graph(others.iter().map(AsRef::as_ref));

        let mut gate = IntegrationGate::new(self.runner.clone()).with_scanner(self.scanner.clone());
        if self.config.gate.deep_validation {
            gate = gate.with_validator(self.store.validator().clone());
        }
        let approval = gate
            .analyze(
                &candidate,
                &self.config.gate_options(),
                &system,
                &self.config.integration_rules(),
            )
            .await?;

        self.graph
            .replace(GraphBuilder::from_graph(&system).with_spec(&candidate).build());
        if let Some(sync) = &self.sync {
            if let Err(err) = sync.local_change(key.as_str(), candidate.checksum()).await {
                tracing::warn!("Could not announce {}: {}", key, err);
            }
        }
        Ok(approval)
    }

    /// Rebuild the dependency graph from every loadable specification
    ///
    /// Specifications that fail to load are skipped with a warning.
    ///
    /// # Errors
    /// `Load` when the specification directory cannot be read.
    pub async fn rebuild_graph(&self) -> Result<Arc<DependencyGraph>, EngineError> {
        let specs = self.load_specs(None).await?;
        Ok(self.graph.rebuild(specs.iter().map(AsRef::as_ref)))
    }

    /// Current dependency graph snapshot
    #[must_use]
    pub fn dependency_graph(&self) -> Arc<DependencyGraph> {
        self.graph.snapshot()
    }

    /// Components transitively depending on `component`
    ///
    /// # Errors
    /// `Graph` when the component is not in the current snapshot.
    pub fn impact_of(&self, component: &str) -> Result<BTreeSet<String>, EngineError> {
        Ok(self.graph.snapshot().impacted_by(component)?)
    }

    /// Start a sync daemon for this node over the configured spec directory
    ///
    /// # Errors
    /// `Config` when the owner table is invalid.
    pub fn spawn_sync(
        &self,
        transport: Arc<dyn PeerTransport>,
        discovery: Arc<dyn PeerDiscovery>,
    ) -> Result<SyncHandle, EngineError> {
        let owners = self.config.owner_registry()?;
        let handle = SyncDaemon::new(self.config.daemon_config(), transport, discovery)
            .with_source(Arc::new(StoreSpecSource::new(self.store.clone())))
            .with_notifier(Arc::new(LoggingNotifier))
            .with_owners(owners)
            .spawn();
        Ok(handle)
    }

    /// Report a local edit of `name` to peers and drop its cache entry
    ///
    /// # Errors
    /// - `Load` when the file cannot be read
    /// - `Sync` when the attached daemon has stopped
    pub async fn announce_local_change(&self, name: &str) -> Result<(), EngineError> {
        let checksum = self.store.checksum(name).await?;
        self.store.invalidate(name).await;
        if let Some(sync) = &self.sync {
            sync.local_change(self.store.locator().canonical_name(name), checksum)
                .await?;
        }
        Ok(())
    }

    /// Sync daemon status; `Disconnected` when none is attached or it is
    /// unresponsive
    pub async fn sync_status(&self) -> SyncStatus {
        match &self.sync {
            Some(sync) => sync.status().await,
            None => SyncStatus::disconnected(NodeId::new(self.config.sync.node_id.as_str())),
        }
    }

    /// Sessions currently in flight
    #[must_use]
    pub fn active_sessions(&self) -> Vec<SessionInfo> {
        self.sessions.active()
    }

    pub async fn invalidate(&self, name: &str) {
        self.store.invalidate(name).await;
    }

    pub fn clear_cache(&self) {
        self.store.clear_cache();
    }

    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.store.cache_stats()
    }

    async fn load_valid(&self, name: &str) -> Result<Arc<Specification>, EngineError> {
        let spec = self.store.load(name).await?;
        let report = self.store.validator().validate(&spec).await;
        let errors = report.errors().count();
        if errors > 0 {
            for finding in report.errors() {
                tracing::warn!("{}: {}", name, finding);
            }
            return Err(EngineError::Invalid {
                spec: spec.id.clone(),
                errors,
            });
        }
        Ok(spec)
    }

    /// Every loadable specification, minus the one with id `exclude`
    async fn load_specs(
        &self,
        exclude: Option<&str>,
    ) -> Result<Vec<Arc<Specification>>, EngineError> {
        let loaded = self.store.load_all().await?;
        let mut specs = Vec::with_capacity(loaded.len());
        for (name, result) in loaded {
            match result {
                Ok(spec) if exclude == Some(spec.id.as_str()) => {}
                Ok(spec) => specs.push(spec),
                Err(err) => tracing::warn!("Skipping {}: {}", name, err),
            }
        }
        Ok(specs)
    }
}
