//! Request interception: serve a resource from the local store or let it
//! pass through to the network.
//!
//! The decision never fails. Any internal error, a timeout, or an
//! unrecognized URL becomes [`Interception::PassThrough`].

pub mod mime;

pub use mime::mime_for_path;

use std::sync::Arc;
use std::time::Duration;

use assetsync_core::{AppConfig, CacheStore, DigestAlgorithm, Error, InterceptMode};
use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use crate::allowlist::{AllowList, fetch_through};
use crate::fetch::Origin;
use crate::source::AssetSource;
use crate::sync::{ManifestSnapshot, SyncEngine};

/// Character encoding reported with every served response.
pub const SERVED_ENCODING: &str = "UTF-8";

/// A resource answered from the local store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServedResponse {
    /// Logical asset path the request resolved to.
    pub path: String,
    pub mime_type: &'static str,
    pub encoding: &'static str,
    pub body: Bytes,
}

impl ServedResponse {
    fn new(path: String, body: Vec<u8>) -> Self {
        let mime_type = mime_for_path(&path);
        Self { path, mime_type, encoding: SERVED_ENCODING, body: Bytes::from(body) }
    }
}

/// Outcome of an interception decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interception {
    Served(ServedResponse),
    PassThrough,
}

impl Interception {
    pub fn is_served(&self) -> bool {
        matches!(self, Interception::Served(_))
    }
}

/// Which paths are recognized, and what happens on a miss.
enum Catalog {
    /// Paths in the last reconciled manifest. Misses pass through.
    Manifest { snapshot: ManifestSnapshot, algorithm: DigestAlgorithm, verify_on_serve: bool },
    /// Fixed allow-list. Misses are fetched, stored and served.
    AllowList { list: AllowList, source: Arc<dyn AssetSource> },
}

/// Decides, per request URL, whether to serve from the store.
pub struct Interceptor {
    origin: Origin,
    store: CacheStore,
    catalog: Catalog,
    budget: Duration,
    cancel: CancellationToken,
}

impl std::fmt::Debug for Interceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interceptor")
            .field("origin", &self.origin.as_url().as_str())
            .field("mode", &self.mode())
            .field("budget", &self.budget)
            .finish_non_exhaustive()
    }
}

/// Default bound on one interception decision.
const DEFAULT_BUDGET: Duration = Duration::from_secs(15);

impl Interceptor {
    /// Interceptor backed by the manifest snapshot published by a sync engine.
    pub fn for_manifest(
        origin: Origin, store: CacheStore, snapshot: ManifestSnapshot, algorithm: DigestAlgorithm,
    ) -> Self {
        Self::with_catalog(origin, store, Catalog::Manifest { snapshot, algorithm, verify_on_serve: true })
    }

    /// Interceptor for a fixed allow-list with write-through on miss.
    pub fn for_allow_list(origin: Origin, store: CacheStore, list: AllowList, source: Arc<dyn AssetSource>) -> Self {
        Self::with_catalog(origin, store, Catalog::AllowList { list, source })
    }

    fn with_catalog(origin: Origin, store: CacheStore, catalog: Catalog) -> Self {
        Self { origin, store, catalog, budget: DEFAULT_BUDGET, cancel: CancellationToken::new() }
    }

    /// Build the interceptor selected by `config.intercept_mode`.
    pub fn from_config(config: &AppConfig, engine: &SyncEngine, source: Arc<dyn AssetSource>) -> Result<Self, Error> {
        let origin = Origin::parse(&config.origin_url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let store = engine.cache().store().clone();

        let interceptor = match config.intercept_mode {
            InterceptMode::Manifest => {
                Self::for_manifest(origin, store, engine.subscribe(), engine.algorithm())
                    .with_verify_on_serve(config.verify_on_serve)
            }
            InterceptMode::AllowList => {
                Self::for_allow_list(origin, store, AllowList::new(&config.allow_list), source)
            }
        };

        Ok(interceptor.with_budget(config.connect_timeout() + config.read_timeout()))
    }

    /// Re-verify stored bytes before serving (manifest mode only).
    pub fn with_verify_on_serve(mut self, enabled: bool) -> Self {
        if let Catalog::Manifest { verify_on_serve, .. } = &mut self.catalog {
            *verify_on_serve = enabled;
        }
        self
    }

    /// Upper bound on a single decision, including any on-demand fetch.
    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }

    /// Token that aborts on-demand fetches (host teardown).
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn mode(&self) -> InterceptMode {
        match self.catalog {
            Catalog::Manifest { .. } => InterceptMode::Manifest,
            Catalog::AllowList { .. } => InterceptMode::AllowList,
        }
    }

    /// Decide how to answer `request_url`.
    pub async fn intercept(&self, request_url: &str) -> Interception {
        let Some(path) = self.origin.logical_path(request_url) else {
            tracing::trace!(url = request_url, "not under origin; passing through");
            return Interception::PassThrough;
        };

        match tokio::time::timeout(self.budget, self.lookup(&path)).await {
            Ok(Ok(Some(body))) => {
                tracing::debug!(path = %path, bytes = body.len(), "serving from cache");
                Interception::Served(ServedResponse::new(path, body))
            }
            Ok(Ok(None)) => Interception::PassThrough,
            Ok(Err(e)) => {
                tracing::warn!(path = %path, error = %e, "interception failed; passing through");
                Interception::PassThrough
            }
            Err(_) => {
                tracing::warn!(path = %path, budget_ms = self.budget.as_millis() as u64, "interception timed out; passing through");
                Interception::PassThrough
            }
        }
    }

    async fn lookup(&self, path: &str) -> Result<Option<Vec<u8>>, Error> {
        match &self.catalog {
            Catalog::Manifest { snapshot, algorithm, verify_on_serve } => {
                let manifest = snapshot.borrow().clone();
                let Some(asset) = manifest.as_deref().and_then(|m| m.get(path)).cloned() else {
                    return Ok(None);
                };

                let body = match self.store.read(path).await {
                    Ok(body) => body,
                    Err(Error::NotFound(_)) => return Ok(None),
                    Err(e) => return Err(e),
                };

                if *verify_on_serve && !algorithm.verify(&body, &asset.digest) {
                    tracing::warn!(path, expected = %asset.digest, "cached entry failed verification; not serving");
                    return Ok(None);
                }
                Ok(Some(body))
            }
            Catalog::AllowList { list, source } => {
                if !list.contains(path) {
                    return Ok(None);
                }
                let cancel = self.cancel.child_token();
                fetch_through(&self.store, source.as_ref(), path, &cancel).await.map(Some)
            }
        }
    }
}
