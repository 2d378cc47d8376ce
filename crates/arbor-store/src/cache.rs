//! Time-to-live specification cache using moka
//!
//! Readers never block each other; inserts and evictions lock per key.
//! Expired entries are dropped lazily on the next lookup, or eagerly when the
//! owner calls [`SpecCache::run_pending_tasks`].

use arbor_spec::Specification;
use moka::future::Cache;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Default time-to-live for cached specifications
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Default maximum number of cached specifications
pub const DEFAULT_CAPACITY: u64 = 1_000;

/// Statistics for cache monitoring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Number of entries in cache
    pub entry_count: u64,
    pub hits: u64,
    pub misses: u64,
}

/// Specification cache keyed by canonical name
#[derive(Debug, Clone)]
pub struct SpecCache {
    inner: Cache<String, Arc<Specification>>,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
}

impl SpecCache {
    /// Create cache with time-based expiration
    #[must_use]
    pub fn with_ttl(max_capacity: u64, ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Cached specification, if present and not expired
    pub async fn get(&self, name: &str) -> Option<Arc<Specification>> {
        let found = self.inner.get(name).await;
        let counter = if found.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    #[inline]
    pub async fn insert(&self, name: impl Into<String>, spec: Arc<Specification>) {
        self.inner.insert(name.into(), spec).await;
    }

    #[inline]
    pub async fn invalidate(&self, name: &str) {
        self.inner.invalidate(name).await;
    }

    /// Invalidate all entries
    #[inline]
    pub fn clear(&self) {
        self.inner.invalidate_all();
    }

    /// Check presence without touching hit/miss counters
    pub async fn contains(&self, name: &str) -> bool {
        self.inner.get(name).await.is_some()
    }

    /// Apply pending evictions and expirations now
    pub async fn run_pending_tasks(&self) {
        self.inner.run_pending_tasks().await;
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entry_count: self.inner.entry_count(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl Default for SpecCache {
    fn default() -> Self {
        Self::with_ttl(DEFAULT_CAPACITY, DEFAULT_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_spec::SourceInfo;

    fn spec(id: &str) -> Arc<Specification> {
        let raw = format!("id: {id}\nname: {id}\nversion: '1'\n");
        let document = serde_yaml::from_str(&raw).unwrap();
        Arc::new(
            Specification::from_document(document, SourceInfo::stamp("t.yaml", raw.as_bytes()))
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn insert_and_get() {
        let cache = SpecCache::default();
        cache.insert("auth", spec("auth")).await;

        let got = cache.get("auth").await.unwrap();
        assert_eq!(got.id, "auth");
        assert!(cache.get("missing").await.is_none());

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn invalidate_and_clear() {
        let cache = SpecCache::default();
        cache.insert("a", spec("a")).await;
        cache.insert("b", spec("b")).await;

        cache.invalidate("a").await;
        assert!(!cache.contains("a").await);
        assert!(cache.contains("b").await);

        cache.clear();
        assert!(!cache.contains("b").await);
    }

    #[tokio::test]
    async fn entries_expire_after_ttl() {
        let cache = SpecCache::with_ttl(10, Duration::from_millis(50));
        cache.insert("a", spec("a")).await;
        assert!(cache.contains("a").await);

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(cache.get("a").await.is_none());
    }

    #[tokio::test]
    async fn entry_within_ttl_is_same_value() {
        let cache = SpecCache::default();
        let stored = spec("a");
        cache.insert("a", Arc::clone(&stored)).await;
        let got = cache.get("a").await.unwrap();
        assert!(Arc::ptr_eq(&stored, &got));
    }
}
