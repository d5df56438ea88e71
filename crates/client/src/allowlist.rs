//! Fixed allow-list of cacheable paths (no manifest, no digests).
//!
//! Entries are trust-on-write: the first successful download is stored with
//! `write_once` and served unconditionally afterwards.

use std::collections::{BTreeMap, BTreeSet};

use assetsync_core::cache::WriteOnce;
use assetsync_core::{CacheStore, Error};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::source::AssetSource;

/// Set of origin-relative paths that may be cached.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
    paths: BTreeSet<String>,
}

impl AllowList {
    /// Build from configured paths. A leading `/` is ignored and blank
    /// entries are dropped.
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let paths = paths
            .into_iter()
            .map(|p| p.as_ref().trim().trim_start_matches('/').to_string())
            .filter(|p| !p.is_empty())
            .collect();
        Self { paths }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains(path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }
}

/// Result of warming the store from an allow-list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PreloadReport {
    pub attempted: usize,
    /// Newly downloaded and stored.
    pub stored: usize,
    /// Already in the store; not downloaded.
    pub already_present: usize,
    pub failed: usize,
    pub failures: BTreeMap<String, String>,
    pub cancelled: bool,
}

/// Return the stored bytes for `path`, downloading and storing them first if
/// absent.
pub(crate) async fn fetch_through(
    store: &CacheStore, source: &dyn AssetSource, path: &str, cancel: &CancellationToken,
) -> Result<Vec<u8>, Error> {
    match store.read(path).await {
        Ok(bytes) => return Ok(bytes),
        Err(Error::NotFound(_)) => {}
        Err(e) => return Err(e),
    }

    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }
    let body = source.fetch_asset(path, cancel).await?;
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }

    match store.write_once(path, &body).await? {
        WriteOnce::Written => {
            tracing::info!(path, bytes = body.len(), "allow-listed asset stored");
            Ok(body.to_vec())
        }
        // A concurrent request stored it first; serve what is on disk.
        WriteOnce::AlreadyPresent => store.read(path).await,
    }
}

/// Download every allow-listed path that is not yet stored.
///
/// Failures are logged and reported; they never abort the remaining paths.
pub async fn preload(
    list: &AllowList, store: &CacheStore, source: &dyn AssetSource, cancel: &CancellationToken,
) -> PreloadReport {
    let mut report = PreloadReport { attempted: list.len(), ..Default::default() };

    for path in list.iter() {
        if cancel.is_cancelled() {
            report.cancelled = true;
            break;
        }
        if store.exists(path).await {
            report.already_present += 1;
            continue;
        }
        match fetch_through(store, source, path, cancel).await {
            Ok(_) => report.stored += 1,
            Err(Error::Cancelled) => {
                report.cancelled = true;
                break;
            }
            Err(e) => {
                tracing::warn!(path, error = %e, "allow-list preload failed");
                report.failed += 1;
                report.failures.insert(path.to_string(), e.reason());
            }
        }
    }

    tracing::info!(
        attempted = report.attempted,
        stored = report.stored,
        already_present = report.already_present,
        failed = report.failed,
        "allow-list preload complete"
    );
    report
}
