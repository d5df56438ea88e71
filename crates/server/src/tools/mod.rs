//! MCP tool implementations.
//!
//! This module contains all tools exposed by the assetsync server.

pub mod cache;

pub use cache::{CacheClearParams, CacheLookupParams, CacheSummaryParams, CacheSyncParams};
