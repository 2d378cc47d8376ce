//! Local specification checksums for the sync daemon

use arbor_spec::ContentHash;
use arbor_store::SpecStore;
use arbor_sync::{SpecSource, SyncError};
use async_trait::async_trait;
use std::collections::BTreeMap;

/// [`SpecSource`] reading checksums straight from the store's directory
#[derive(Debug, Clone)]
pub struct StoreSpecSource {
    store: SpecStore,
}

impl StoreSpecSource {
    #[must_use]
    pub fn new(store: SpecStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl SpecSource for StoreSpecSource {
    async fn checksums(&self) -> Result<BTreeMap<String, ContentHash>, SyncError> {
        let names = self.store.list().await.map_err(SyncError::source_error)?;
        let mut checksums = BTreeMap::new();
        for name in names {
            match self.store.checksum(&name).await {
                Ok(checksum) => {
                    checksums.insert(name, checksum);
                }
                // File vanished between listing and reading
                Err(err) => tracing::warn!("Skipping {} in sync scan: {}", name, err),
            }
        }
        Ok(checksums)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scans_every_specification() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.yaml"), "id: a\nname: a\nversion: '1'\n").unwrap();
        std::fs::write(dir.path().join("b.yaml"), "id: b\nname: b\nversion: '1'\n").unwrap();

        let source = StoreSpecSource::new(SpecStore::new(dir.path()));
        let checksums = source.checksums().await.unwrap();

        assert_eq!(checksums.len(), 2);
        assert_eq!(
            checksums["a"],
            ContentHash::compute(b"id: a\nname: a\nversion: '1'\n")
        );
    }

    #[tokio::test]
    async fn missing_directory_is_a_source_error() {
        let source = StoreSpecSource::new(SpecStore::new("/nonexistent/arbor/specs"));
        assert!(matches!(source.checksums().await, Err(SyncError::Source(_))));
    }
}
