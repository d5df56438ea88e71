//! Core types and shared functionality for assetsync.
//!
//! This crate provides:
//! - Manifest model and version identity
//! - On-disk asset store with atomic writes and integrity digests
//! - SQLite-backed version state
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod manifest;
pub mod state;

pub use cache::{AssetCache, CacheStore, CacheSummary, DigestAlgorithm};
pub use config::{AppConfig, ConfigError, InterceptMode};
pub use error::Error;
pub use manifest::{AssetDescriptor, Manifest};
pub use state::{StateDb, VersionState};
