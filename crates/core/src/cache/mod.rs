//! Content cache: on-disk asset store, digests, and admin operations.
//!
//! - Flat, injective file keys derived from asset paths
//! - Atomic publish of entries (stage, then rename)
//! - MD5 or SHA-256 content digests
//! - Clear/size/summary over the store and the version state

pub mod admin;
pub mod digest;
pub mod key;
pub mod store;

pub use admin::{AssetCache, CacheSummary, format_size};
pub use digest::DigestAlgorithm;
pub use key::sanitize_key;
pub use store::{CacheStore, WriteOnce};
