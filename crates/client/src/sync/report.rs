//! Outcome of one reconcile pass.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// What happened to one asset during a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetOutcome {
    /// Stored bytes already matched the manifest digest; no network traffic.
    AlreadyValid,
    /// Downloaded, stored and re-verified.
    Fetched,
    /// Fetch, write or verification failed; the entry is absent.
    Failed(String),
    /// The pass was cancelled before this asset finished.
    Skipped,
}

/// Aggregate result of a reconcile pass.
///
/// `failures` is for observability only; a partial failure never aborts the
/// pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SyncReport {
    /// Version identity of the reconciled manifest.
    pub manifest_version: String,
    /// Whether the identity differs from the recorded version state.
    pub version_changed: bool,
    /// Assets considered.
    pub attempted: usize,
    /// Assets valid at the end of the pass (already valid + fetched).
    pub succeeded: usize,
    /// Assets downloaded during this pass.
    pub fetched: usize,
    /// Assets left untouched because they already verified.
    pub already_valid: usize,
    /// Assets that failed.
    pub failed: usize,
    /// Assets not processed because the pass was cancelled.
    pub skipped: usize,
    /// Failing paths and the reason for each.
    pub failures: BTreeMap<String, String>,
    /// Whether the pass stopped on a cancellation request.
    pub cancelled: bool,
    /// Wall-clock duration of the pass.
    pub duration_ms: u64,
    /// RFC 3339 timestamp of when the pass ended.
    pub finished_at: String,
}

impl SyncReport {
    pub(crate) fn new(manifest_version: &str, version_changed: bool, attempted: usize) -> Self {
        Self { manifest_version: manifest_version.to_string(), version_changed, attempted, ..Default::default() }
    }

    pub(crate) fn record(&mut self, path: String, outcome: AssetOutcome) {
        match outcome {
            AssetOutcome::AlreadyValid => {
                self.already_valid += 1;
                self.succeeded += 1;
            }
            AssetOutcome::Fetched => {
                self.fetched += 1;
                self.succeeded += 1;
            }
            AssetOutcome::Failed(reason) => {
                self.failed += 1;
                self.failures.insert(path, reason);
            }
            AssetOutcome::Skipped => self.skipped += 1,
        }
    }

    /// True when every asset is valid in the store.
    pub fn is_complete(&self) -> bool {
        !self.cancelled && self.succeeded == self.attempted
    }
}
