//! Engine configuration
//!
//! Loaded from TOML; every section and field is optional and falls back to
//! its default. [`EngineConfig::validate`] runs on every load.
//!
//! ```toml
//! [store]
//! spec_dir = "specs"
//! cache_ttl_secs = 300
//!
//! [gate]
//! min_coverage = 95.0
//!
//! [sync]
//! node_id = "node-a"
//! peers = ["node-b"]
//!
//! [sync.owners]
//! auth = "identity"
//! ```

use arbor_gate::{GateOptions, IntegrationRules, DEFAULT_MIN_COVERAGE};
use arbor_harness::{DebugOptions, TreeTestOptions, DEFAULT_PROBE_TIMEOUT};
use arbor_store::{DEFAULT_CAPACITY, DEFAULT_EXTENSION, DEFAULT_MAX_FILE_SIZE, DEFAULT_TTL};
use arbor_sync::{
    DaemonConfig, NodeId, OwnerRegistry, DEFAULT_HEALTH_INTERVAL, DEFAULT_PEER_TIMEOUT,
    DEFAULT_STATUS_TIMEOUT, DEFAULT_SYNC_INTERVAL,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Longest bound accepted for synchronous status queries
const MAX_STATUS_TIMEOUT_SECS: u64 = 5;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }
}

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub store: StoreConfig,
    pub tree_test: TreeTestConfig,
    pub debug: DebugConfig,
    pub gate: GateConfig,
    pub sync: SyncConfig,
}

/// Specification directory and cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub spec_dir: PathBuf,
    pub extension: String,
    /// Root for `code_ref` resolution; defaults to `spec_dir`
    pub source_root: Option<PathBuf>,
    pub cache_ttl_secs: u64,
    pub cache_capacity: u64,
    pub max_file_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            spec_dir: PathBuf::from("specs"),
            extension: DEFAULT_EXTENSION.to_string(),
            source_root: None,
            cache_ttl_secs: DEFAULT_TTL.as_secs(),
            cache_capacity: DEFAULT_CAPACITY,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

/// Tree tester thresholds and probe timeout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeTestConfig {
    pub max_failure_rate: f64,
    pub min_performance_score: f64,
    pub concurrency: usize,
    pub probe_timeout_ms: u64,
    /// Specs tested at once by batch runs
    pub batch_concurrency: usize,
}

impl Default for TreeTestConfig {
    fn default() -> Self {
        let options = TreeTestOptions::default();
        Self {
            max_failure_rate: options.max_failure_rate,
            min_performance_score: options.min_performance_score,
            concurrency: options.concurrency,
            probe_timeout_ms: u64::try_from(DEFAULT_PROBE_TIMEOUT.as_millis()).unwrap_or(5_000),
            batch_concurrency: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    pub min_confidence: f64,
    pub direct_tests: bool,
}

impl Default for DebugConfig {
    fn default() -> Self {
        let options = DebugOptions::default();
        Self {
            min_confidence: options.min_confidence,
            direct_tests: options.direct_tests,
        }
    }
}

/// Integration gate rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Percent; may be raised above the default, never lowered
    pub min_coverage: f64,
    pub required_fields: Vec<String>,
    pub require_documentation: bool,
    pub require_clean_security_scan: bool,
    pub deep_validation: bool,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            min_coverage: DEFAULT_MIN_COVERAGE,
            required_fields: Vec::new(),
            require_documentation: true,
            require_clean_security_scan: true,
            deep_validation: true,
        }
    }
}

/// Synchronization daemon settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub node_id: String,
    pub sync_interval_secs: u64,
    pub health_interval_secs: u64,
    pub status_timeout_secs: u64,
    /// Bound on each ping, discovery, scan and announce call
    pub peer_timeout_ms: u64,
    /// Static peer list
    pub peers: Vec<String>,
    /// Spec-name prefix → owning component
    pub owners: BTreeMap<String, String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            node_id: "local".to_string(),
            sync_interval_secs: DEFAULT_SYNC_INTERVAL.as_secs(),
            health_interval_secs: DEFAULT_HEALTH_INTERVAL.as_secs(),
            status_timeout_secs: DEFAULT_STATUS_TIMEOUT.as_secs(),
            peer_timeout_ms: u64::try_from(DEFAULT_PEER_TIMEOUT.as_millis()).unwrap_or(3_000),
            peers: Vec::new(),
            owners: BTreeMap::new(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate TOML text
    ///
    /// # Errors
    /// `Parse` on malformed TOML, `Invalid` when validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    ///
    /// # Errors
    /// `Read` when the file cannot be read, otherwise as [`Self::from_toml_str`].
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&content)?;
        tracing::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Serialize back to TOML
    ///
    /// # Errors
    /// `Parse` if a value cannot be represented in TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    #[must_use]
    pub fn with_spec_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.store.spec_dir = dir.into();
        self
    }

    /// Check ranges and non-zero intervals
    ///
    /// # Errors
    /// `Invalid` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let store = &self.store;
        if store.extension.is_empty() || store.extension.starts_with('.') {
            return Err(ConfigError::invalid(format!(
                "store.extension must be a bare extension, got '{}'",
                store.extension
            )));
        }
        if store.cache_ttl_secs == 0 || store.cache_capacity == 0 {
            return Err(ConfigError::invalid("store cache ttl and capacity must be non-zero"));
        }
        if store.max_file_size == 0 {
            return Err(ConfigError::invalid("store.max_file_size must be non-zero"));
        }

        let tree = &self.tree_test;
        unit_interval("tree_test.max_failure_rate", tree.max_failure_rate)?;
        unit_interval("tree_test.min_performance_score", tree.min_performance_score)?;
        if tree.concurrency == 0 || tree.batch_concurrency == 0 {
            return Err(ConfigError::invalid("tree_test concurrency must be non-zero"));
        }
        if tree.probe_timeout_ms == 0 {
            return Err(ConfigError::invalid("tree_test.probe_timeout_ms must be non-zero"));
        }

        unit_interval("debug.min_confidence", self.debug.min_confidence)?;

        if !(DEFAULT_MIN_COVERAGE..=100.0).contains(&self.gate.min_coverage) {
            return Err(ConfigError::invalid(format!(
                "gate.min_coverage must be within {DEFAULT_MIN_COVERAGE}..=100, got {}",
                self.gate.min_coverage
            )));
        }

        let sync = &self.sync;
        if sync.node_id.trim().is_empty() {
            return Err(ConfigError::invalid("sync.node_id must not be empty"));
        }
        if sync.sync_interval_secs == 0 || sync.health_interval_secs == 0 {
            return Err(ConfigError::invalid("sync intervals must be non-zero"));
        }
        if sync.peer_timeout_ms == 0 {
            return Err(ConfigError::invalid("sync.peer_timeout_ms must be non-zero"));
        }
        if !(1..=MAX_STATUS_TIMEOUT_SECS).contains(&sync.status_timeout_secs) {
            return Err(ConfigError::invalid(format!(
                "sync.status_timeout_secs must be within 1..={MAX_STATUS_TIMEOUT_SECS}, got {}",
                sync.status_timeout_secs
            )));
        }
        self.owner_registry()?;
        Ok(())
    }

    #[must_use]
    pub fn source_root(&self) -> &Path {
        self.store
            .source_root
            .as_deref()
            .unwrap_or(&self.store.spec_dir)
    }

    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.store.cache_ttl_secs)
    }

    #[must_use]
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.tree_test.probe_timeout_ms)
    }

    #[must_use]
    pub fn tree_test_options(&self) -> TreeTestOptions {
        TreeTestOptions {
            max_failure_rate: self.tree_test.max_failure_rate,
            min_performance_score: self.tree_test.min_performance_score,
            concurrency: self.tree_test.concurrency,
        }
    }

    #[must_use]
    pub fn debug_options(&self) -> DebugOptions {
        DebugOptions {
            min_confidence: self.debug.min_confidence,
            direct_tests: self.debug.direct_tests,
            concurrency: self.tree_test.concurrency,
        }
    }

    #[must_use]
    pub fn integration_rules(&self) -> IntegrationRules {
        IntegrationRules {
            required_fields: self.gate.required_fields.clone(),
            require_resolved_dependencies: true,
            min_coverage: self.gate.min_coverage,
            require_documentation: self.gate.require_documentation,
            require_clean_security_scan: self.gate.require_clean_security_scan,
        }
    }

    #[must_use]
    pub fn gate_options(&self) -> GateOptions {
        GateOptions {
            concurrency: self.tree_test.concurrency,
            deep_validation: self.gate.deep_validation,
        }
    }

    #[must_use]
    pub fn daemon_config(&self) -> DaemonConfig {
        DaemonConfig::new(self.sync.node_id.as_str())
            .with_sync_interval(Duration::from_secs(self.sync.sync_interval_secs))
            .with_health_interval(Duration::from_secs(self.sync.health_interval_secs))
            .with_status_timeout(Duration::from_secs(self.sync.status_timeout_secs))
            .with_peer_timeout(Duration::from_millis(self.sync.peer_timeout_ms))
    }

    #[must_use]
    pub fn peers(&self) -> Vec<NodeId> {
        self.sync.peers.iter().map(|p| NodeId::new(p.as_str())).collect()
    }

    /// Validated owner table
    ///
    /// # Errors
    /// `Invalid` on an empty prefix or owner.
    pub fn owner_registry(&self) -> Result<OwnerRegistry, ConfigError> {
        OwnerRegistry::new(
            self.sync
                .owners
                .iter()
                .map(|(prefix, owner)| (prefix.as_str(), owner.as_str())),
        )
        .map_err(|e| ConfigError::invalid(e.to_string()))
    }
}

fn unit_interval(field: &str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::invalid(format!(
            "{field} must be within 0..=1, got {value}"
        )))
    }
}
