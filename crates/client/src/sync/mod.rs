//! Reconciliation of the local store against the remote manifest.
//!
//! ### Per-asset algorithm
//! - Stored bytes that verify are left untouched (no network traffic).
//! - Stored bytes that do not verify are evicted before anything else, so
//!   they can never be served while a replacement is in flight.
//! - Missing assets are downloaded, checked, written atomically, re-read and
//!   re-verified. A mismatch removes the entry and is recorded as a failure.
//!
//! ### Pass semantics
//! - Assets are processed by a bounded worker pool; one failure never aborts
//!   the others.
//! - The cancellation token is checked before every download and every
//!   write. A cancelled pass leaves version state and the published
//!   manifest snapshot unchanged.
//! - A completed pass records the manifest identity (advisory only; every
//!   pass verifies every asset) and publishes the manifest to interceptors.

pub mod report;
pub mod task;

pub use report::{AssetOutcome, SyncReport};
pub use task::SyncTask;

use std::sync::Arc;
use std::time::Instant;

use assetsync_core::{
    AppConfig, AssetCache, AssetDescriptor, CacheStore, CacheSummary, DigestAlgorithm, Error, Manifest,
};
use tokio::sync::{Mutex, Semaphore, watch};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::manifest::ManifestFetcher;
use crate::source::{AssetSource, HttpAssetSource};

/// Default number of concurrent asset downloads.
const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Receiving side of the published manifest snapshot.
pub type ManifestSnapshot = watch::Receiver<Option<Arc<Manifest>>>;

/// Keeps the asset cache in line with the remote manifest.
pub struct SyncEngine {
    cache: AssetCache,
    fetcher: ManifestFetcher,
    source: Arc<dyn AssetSource>,
    algorithm: DigestAlgorithm,
    max_concurrency: usize,
    snapshot: watch::Sender<Option<Arc<Manifest>>>,
    pass_lock: Mutex<()>,
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("manifest_url", &self.fetcher.url().as_str())
            .field("algorithm", &self.algorithm)
            .field("max_concurrency", &self.max_concurrency)
            .finish_non_exhaustive()
    }
}

impl SyncEngine {
    pub fn new(
        cache: AssetCache, fetcher: ManifestFetcher, source: Arc<dyn AssetSource>, algorithm: DigestAlgorithm,
    ) -> Self {
        let (snapshot, _) = watch::channel(None);
        Self {
            cache,
            fetcher,
            source,
            algorithm,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            snapshot,
            pass_lock: Mutex::new(()),
        }
    }

    /// Build an engine with HTTP manifest and asset sources from `config`.
    pub fn from_config(config: &AppConfig, cache: AssetCache) -> Result<Self, Error> {
        let fetcher = ManifestFetcher::from_config(config)?;
        let source = HttpAssetSource::from_config(config)?;
        Ok(Self::new(cache, fetcher, Arc::new(source), config.digest_algorithm)
            .with_max_concurrency(config.max_concurrency))
    }

    /// Cap concurrent downloads within one pass (minimum 1).
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn cache(&self) -> &AssetCache {
        &self.cache
    }

    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    /// Subscribe to the manifest snapshot used for interception decisions.
    pub fn subscribe(&self) -> ManifestSnapshot {
        self.snapshot.subscribe()
    }

    /// The manifest most recently published to interceptors.
    pub fn current_manifest(&self) -> Option<Arc<Manifest>> {
        self.snapshot.borrow().clone()
    }

    /// Publish the last persisted manifest so interception works before the
    /// first pass completes (or with no network at all).
    ///
    /// Returns whether a manifest was restored.
    pub async fn restore_snapshot(&self) -> Result<bool, Error> {
        let Some(json) = self.cache.state().last_manifest_json().await? else {
            return Ok(false);
        };
        let manifest = Manifest::from_json(json.as_bytes(), self.algorithm)?;
        tracing::info!(version = manifest.version(), assets = manifest.len(), "restored last reconciled manifest");
        self.snapshot.send_replace(Some(Arc::new(manifest)));
        Ok(true)
    }

    /// Fetch the manifest and reconcile against it.
    ///
    /// On `Error::ManifestUnavailable` nothing is touched: the store, the
    /// version state and the published snapshot stay as they were.
    pub async fn run_pass(&self, cancel: &CancellationToken) -> Result<SyncReport, Error> {
        let _pass = self.pass_lock.lock().await;

        let manifest = match self.fetcher.fetch(cancel).await {
            Ok(manifest) => manifest,
            Err(Error::Cancelled) => return Err(Error::Cancelled),
            Err(e) => {
                tracing::warn!(error = %e, "manifest unavailable; keeping cached assets");
                return Err(e);
            }
        };

        Ok(self.reconcile_locked(manifest, cancel).await)
    }

    /// Reconcile the store against an already-fetched manifest.
    pub async fn reconcile(&self, manifest: Manifest, cancel: &CancellationToken) -> SyncReport {
        let _pass = self.pass_lock.lock().await;
        self.reconcile_locked(manifest, cancel).await
    }

    async fn reconcile_locked(&self, manifest: Manifest, cancel: &CancellationToken) -> SyncReport {
        let start = Instant::now();
        let manifest = Arc::new(manifest);

        let version_changed = match self.cache.state().version_state().await {
            Ok(state) => state.last_manifest_version.as_deref() != Some(manifest.version()),
            Err(e) => {
                tracing::warn!(error = %e, "could not read version state");
                true
            }
        };
        if version_changed {
            tracing::info!(version = manifest.version(), "new manifest version detected");
        } else {
            tracing::debug!(version = manifest.version(), "manifest version unchanged; verifying entries");
        }

        let mut report = SyncReport::new(manifest.version(), version_changed, manifest.len());
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut join_set = JoinSet::new();

        for asset in manifest.assets() {
            let permit = tokio::select! {
                biased;
                () = cancel.cancelled() => None,
                permit = semaphore.clone().acquire_owned() => permit.ok(),
            };
            let Some(permit) = permit else {
                report.record(asset.path.clone(), AssetOutcome::Skipped);
                continue;
            };

            let store = self.cache.store().clone();
            let source = Arc::clone(&self.source);
            let algorithm = self.algorithm;
            let asset = asset.clone();
            let cancel = cancel.clone();

            join_set.spawn(async move {
                let _permit = permit;
                let outcome = sync_asset(&store, source.as_ref(), algorithm, &asset, &cancel).await;
                (asset.path, outcome)
            });
        }

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((path, outcome)) => report.record(path, outcome),
                Err(e) => {
                    tracing::error!(error = %e, "asset task aborted");
                    report.record("<aborted task>".to_string(), AssetOutcome::Failed(e.to_string()));
                }
            }
        }

        report.cancelled = cancel.is_cancelled();
        report.duration_ms = start.elapsed().as_millis() as u64;
        report.finished_at = chrono::Utc::now().to_rfc3339();

        if report.cancelled {
            tracing::info!(
                skipped = report.skipped,
                succeeded = report.succeeded,
                "sync pass cancelled; version state left unchanged"
            );
            return report;
        }

        match manifest.to_json() {
            Ok(json) => {
                if let Err(e) = self.cache.state().record_manifest(manifest.version(), &json).await {
                    tracing::warn!(error = %e, "failed to record version state");
                }
            }
            Err(e) => tracing::warn!(error = %e, "failed to serialize manifest"),
        }
        self.snapshot.send_replace(Some(manifest));

        tracing::info!(
            attempted = report.attempted,
            succeeded = report.succeeded,
            fetched = report.fetched,
            failed = report.failed,
            duration_ms = report.duration_ms,
            "sync pass complete"
        );

        report
    }

    /// Delete every entry, reset version state and drop the published
    /// snapshot.
    pub async fn clear_cache(&self) -> Result<(), Error> {
        let _pass = self.pass_lock.lock().await;
        self.cache.clear_cache().await?;
        self.snapshot.send_replace(None);
        Ok(())
    }

    pub async fn cache_size(&self) -> Result<u64, Error> {
        self.cache.cache_size().await
    }

    pub async fn cache_summary(&self) -> Result<CacheSummary, Error> {
        self.cache.cache_summary().await
    }
}

async fn sync_asset(
    store: &CacheStore, source: &dyn AssetSource, algorithm: DigestAlgorithm, asset: &AssetDescriptor,
    cancel: &CancellationToken,
) -> AssetOutcome {
    let path = asset.path.as_str();

    match store.read(path).await {
        Ok(bytes) if algorithm.verify(&bytes, &asset.digest) => {
            tracing::trace!(path, "cache entry valid");
            return AssetOutcome::AlreadyValid;
        }
        Ok(bytes) => {
            tracing::warn!(
                path,
                expected = %asset.digest,
                actual = %algorithm.digest(&bytes),
                "cache entry failed verification; evicting"
            );
            if let Err(e) = store.delete(path).await {
                return AssetOutcome::Failed(e.to_string());
            }
        }
        Err(Error::NotFound(_)) => {}
        Err(e) => {
            tracing::warn!(path, error = %e, "unreadable cache entry; treating as absent");
            if let Err(e) = store.delete(path).await {
                return AssetOutcome::Failed(e.to_string());
            }
        }
    }

    if cancel.is_cancelled() {
        return AssetOutcome::Skipped;
    }

    tracing::debug!(path, "downloading asset");
    let body = match source.fetch_asset(path, cancel).await {
        Ok(body) => body,
        Err(Error::Cancelled) => return AssetOutcome::Skipped,
        Err(e) => {
            tracing::warn!(path, error = %e, "asset download failed");
            return AssetOutcome::Failed(e.reason());
        }
    };

    if !algorithm.verify(&body, &asset.digest) {
        let err = Error::IntegrityMismatch {
            path: path.to_string(),
            expected: asset.digest.clone(),
            actual: algorithm.digest(&body),
        };
        tracing::warn!(path, error = %err, "downloaded asset failed verification");
        return AssetOutcome::Failed(err.to_string());
    }

    if cancel.is_cancelled() {
        return AssetOutcome::Skipped;
    }

    if let Err(e) = store.write(path, &body).await {
        tracing::warn!(path, error = %e, "failed to store asset");
        return AssetOutcome::Failed(e.to_string());
    }

    match store.read(path).await {
        Ok(stored) if algorithm.verify(&stored, &asset.digest) => {
            tracing::info!(path, bytes = stored.len(), "asset cached");
            AssetOutcome::Fetched
        }
        Ok(stored) => {
            let err = Error::IntegrityMismatch {
                path: path.to_string(),
                expected: asset.digest.clone(),
                actual: algorithm.digest(&stored),
            };
            tracing::warn!(path, error = %err, "stored asset failed re-verification; deleting");
            if let Err(e) = store.delete(path).await {
                tracing::warn!(path, error = %e, "failed to delete corrupt entry");
            }
            AssetOutcome::Failed(err.to_string())
        }
        Err(e) => {
            tracing::warn!(path, error = %e, "stored asset unreadable after write");
            if let Err(e) = store.delete(path).await {
                tracing::warn!(path, error = %e, "failed to delete unreadable entry");
            }
            AssetOutcome::Failed(e.to_string())
        }
    }
}
