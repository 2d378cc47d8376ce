//! Specification store - the only component that reads specification files
//!
//! Resolves names to files, parses and stamps documents, and caches results
//! by canonical name for the configured time-to-live.

use crate::cache::{CacheStats, SpecCache, DEFAULT_CAPACITY, DEFAULT_TTL};
use crate::error::LoadError;
use crate::locator::SpecLocator;
use crate::parser::parse_specification;
use crate::resolver::{KnownModules, ModuleResolver};
use crate::validate::{ValidationReport, Validator};
use arbor_spec::{ContentHash, Specification};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Default maximum file size to parse (bytes)
pub const DEFAULT_MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

/// Loader and cache for specifications
#[derive(Debug, Clone)]
pub struct SpecStore {
    locator: SpecLocator,
    cache: SpecCache,
    validator: Validator,
    max_file_size: usize,
}

impl SpecStore {
    /// Create store over `dir` with default cache settings
    ///
    /// Code references resolve relative to `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            validator: Validator::new(dir.clone(), Arc::new(KnownModules::default())),
            locator: SpecLocator::new(dir),
            cache: SpecCache::with_ttl(DEFAULT_CAPACITY, DEFAULT_TTL),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }

    #[must_use]
    pub fn with_extension(mut self, extension: &str) -> Self {
        self.locator = SpecLocator::with_extension(self.locator.dir().to_path_buf(), extension);
        self
    }

    #[must_use]
    pub fn with_cache(mut self, capacity: u64, ttl: Duration) -> Self {
        self.cache = SpecCache::with_ttl(capacity, ttl);
        self
    }

    #[must_use]
    pub fn with_source_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.validator = Validator::new(root, Arc::clone(self.validator.resolver()));
        self
    }

    #[must_use]
    pub fn with_resolver(mut self, resolver: Arc<dyn ModuleResolver>) -> Self {
        self.validator = Validator::new(self.validator.source_root().to_path_buf(), resolver);
        self
    }

    #[must_use]
    pub fn with_max_file_size(mut self, max: usize) -> Self {
        self.max_file_size = max;
        self
    }

    #[inline]
    #[must_use]
    pub fn locator(&self) -> &SpecLocator {
        &self.locator
    }

    #[inline]
    #[must_use]
    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    /// Load specification `name`, serving from cache within the TTL
    ///
    /// # Errors
    /// - `LoadError::NotFound` if the resolved file does not exist
    /// - `LoadError::Syntax` if the file is not valid YAML
    /// - `LoadError::Invalid` if required fields are missing
    ///
    /// Failed loads never populate the cache.
    pub async fn load(&self, name: &str) -> Result<Arc<Specification>, LoadError> {
        let key = self.locator.canonical_name(name);
        if let Some(cached) = self.cache.get(&key).await {
            tracing::debug!("Cache hit for specification {}", key);
            return Ok(cached);
        }

        let spec = Arc::new(self.load_fresh(name).await?);
        self.cache.insert(key, Arc::clone(&spec)).await;
        Ok(spec)
    }

    /// Load bypassing the cache, leaving it untouched
    ///
    /// # Errors
    /// As [`SpecStore::load`].
    pub async fn load_fresh(&self, name: &str) -> Result<Specification, LoadError> {
        let path = self.locator.resolve(name);
        let content = self.read(name, &path).await?;
        let spec = parse_specification(&path, &content)?;

        if !spec.structural_errors.is_empty() {
            tracing::warn!(
                "Specification {} loaded with {} structural errors",
                spec.id,
                spec.structural_errors.len()
            );
        }
        tracing::info!(
            "Loaded specification {} ({} components, checksum {})",
            spec.id,
            spec.component_count(),
            spec.checksum().short()
        );
        Ok(spec)
    }

    /// Checksum of the current file content without parsing it
    ///
    /// # Errors
    /// `LoadError::NotFound`, `LoadError::Io` or `LoadError::TooLarge`.
    pub async fn checksum(&self, name: &str) -> Result<ContentHash, LoadError> {
        let path = self.locator.resolve(name);
        let content = self.read(name, &path).await?;
        Ok(ContentHash::compute(content.as_bytes()))
    }

    /// Load and deep-validate specification `name`
    ///
    /// # Errors
    /// Only when the specification cannot be loaded; validation problems are
    /// reported as findings.
    pub async fn validate(&self, name: &str) -> Result<ValidationReport, LoadError> {
        let spec = self.load(name).await?;
        Ok(self.validator.validate(&spec).await)
    }

    /// Names of every specification in the directory
    ///
    /// # Errors
    /// `LoadError::Io` when the directory cannot be read.
    pub async fn list(&self) -> Result<Vec<String>, LoadError> {
        self.locator
            .list()
            .await
            .map_err(|e| LoadError::io_error("*", self.locator.dir(), e))
    }

    /// Load every specification in the directory
    ///
    /// Specifications that fail to load are returned as errors next to their
    /// names instead of aborting the scan.
    ///
    /// # Errors
    /// `LoadError::Io` when the directory cannot be read.
    pub async fn load_all(
        &self,
    ) -> Result<Vec<(String, Result<Arc<Specification>, LoadError>)>, LoadError> {
        let names = self.list().await?;
        let loads = names.iter().map(|name| self.load(name));
        let results = futures::future::join_all(loads).await;
        Ok(names.into_iter().zip(results).collect())
    }

    pub async fn invalidate(&self, name: &str) {
        self.cache.invalidate(&self.locator.canonical_name(name)).await;
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Apply pending cache expirations now
    pub async fn run_pending_tasks(&self) {
        self.cache.run_pending_tasks().await;
    }

    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Whether `name` is cached and unexpired
    pub async fn is_cached(&self, name: &str) -> bool {
        self.cache.contains(&self.locator.canonical_name(name)).await
    }

    async fn read(&self, name: &str, path: &Path) -> Result<String, LoadError> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| LoadError::io_error(name, path, e))?;
        let size = usize::try_from(metadata.len()).unwrap_or(usize::MAX);
        if size > self.max_file_size {
            return Err(LoadError::TooLarge {
                path: path.to_path_buf(),
                size,
                max: self.max_file_size,
            });
        }
        tokio::fs::read_to_string(path)
            .await
            .map_err(|e| LoadError::io_error(name, path, e))
    }
}
