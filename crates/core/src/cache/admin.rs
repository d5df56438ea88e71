//! Administrative view over the store and the version state.

use serde::{Deserialize, Serialize};

use super::store::CacheStore;
use crate::Error;
use crate::state::StateDb;

/// Store plus the persisted version record, as one unit for admin operations.
#[derive(Debug, Clone)]
pub struct AssetCache {
    store: CacheStore,
    state: StateDb,
}

/// What `cache_summary` reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CacheSummary {
    /// Identity of the last reconciled manifest, if any.
    pub manifest_version: Option<String>,
    /// Sum of stored entry lengths.
    pub size_bytes: u64,
    /// Human-readable rendering of `size_bytes`.
    pub size: String,
    /// Number of stored entries.
    pub entry_count: usize,
}

impl AssetCache {
    pub fn new(store: CacheStore, state: StateDb) -> Self {
        Self { store, state }
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    pub fn state(&self) -> &StateDb {
        &self.state
    }

    /// Delete all entries and reset the version state.
    pub async fn clear_cache(&self) -> Result<(), Error> {
        self.store.clear().await?;
        self.state.reset_version_state().await?;
        tracing::info!(root = %self.store.root().display(), "asset cache cleared");
        Ok(())
    }

    pub async fn cache_size(&self) -> Result<u64, Error> {
        self.store.total_size().await
    }

    pub async fn cache_summary(&self) -> Result<CacheSummary, Error> {
        let version = self.state.version_state().await?;
        let size_bytes = self.store.total_size().await?;
        let entry_count = self.store.entry_count().await?;
        Ok(CacheSummary {
            manifest_version: version.last_manifest_version,
            size_bytes,
            size: format_size(size_bytes),
            entry_count,
        })
    }
}

/// Render a byte count as `B`, `KB` or `MB` (integer division).
pub fn format_size(bytes: u64) -> String {
    match bytes {
        b if b < 1024 => format!("{b} B"),
        b if b < 1024 * 1024 => format!("{} KB", b / 1024),
        b => format!("{} MB", b / (1024 * 1024)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn make_cache(dir: &std::path::Path) -> AssetCache {
        let store = CacheStore::open(dir).await.unwrap();
        let state = StateDb::open_in_memory().await.unwrap();
        AssetCache::new(store, state)
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(2048), "2 KB");
        assert_eq!(format_size(5 * 1024 * 1024 + 1), "5 MB");
    }

    #[tokio::test]
    async fn test_summary_of_empty_cache() {
        let dir = tempdir().unwrap();
        let cache = make_cache(dir.path()).await;

        let summary = cache.cache_summary().await.unwrap();
        assert_eq!(summary.manifest_version, None);
        assert_eq!(summary.size_bytes, 0);
        assert_eq!(summary.entry_count, 0);
    }

    #[tokio::test]
    async fn test_summary_reflects_entries_and_version() {
        let dir = tempdir().unwrap();
        let cache = make_cache(dir.path()).await;
        cache.store().write("a.css", b"abc").await.unwrap();
        cache.store().write("b.js", b"defg").await.unwrap();
        cache.state().record_manifest("v1", "[]").await.unwrap();

        let summary = cache.cache_summary().await.unwrap();
        assert_eq!(summary.manifest_version.as_deref(), Some("v1"));
        assert_eq!(summary.size_bytes, 7);
        assert_eq!(summary.size, "7 B");
        assert_eq!(summary.entry_count, 2);
        assert_eq!(cache.cache_size().await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_clear_resets_store_and_version() {
        let dir = tempdir().unwrap();
        let cache = make_cache(dir.path()).await;
        cache.store().write("a.css", b"abc").await.unwrap();
        cache.state().record_manifest("v1", "[]").await.unwrap();

        cache.clear_cache().await.unwrap();

        let summary = cache.cache_summary().await.unwrap();
        assert_eq!(summary.manifest_version, None);
        assert_eq!(summary.entry_count, 0);
        assert!(cache.state().last_manifest_json().await.unwrap().is_none());
    }
}
