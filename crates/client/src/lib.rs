//! Network-facing side of assetsync.
//!
//! This crate provides the HTTP fetch pipeline, manifest retrieval, the sync
//! engine that reconciles the local store against the manifest, and the
//! request interceptor that serves cached assets.

pub mod allowlist;
pub mod fetch;
pub mod intercept;
pub mod manifest;
pub mod source;
pub mod sync;

pub use allowlist::{AllowList, PreloadReport, preload};
pub use fetch::{FetchClient, FetchConfig, FetchError, FetchResponse, Origin};
pub use intercept::{Interception, Interceptor, ServedResponse, mime_for_path};
pub use manifest::ManifestFetcher;
pub use source::{AssetSource, HttpAssetSource};
pub use sync::{AssetOutcome, ManifestSnapshot, SyncEngine, SyncReport, SyncTask};
