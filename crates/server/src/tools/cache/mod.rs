//! Cache-related MCP tools.
//!
//! This module exposes sync, summary, clear and lookup over the asset cache.

pub mod clear;
pub mod lookup;
pub mod summary;
pub mod sync;

pub use clear::{CacheClearParams, clear_impl};
pub use lookup::{CacheLookupParams, lookup_impl};
pub use summary::{CacheSummaryParams, summary_impl};
pub use sync::{CacheSyncParams, sync_impl};

use assetsync_core::Error;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

/// Render a tool output as pretty JSON text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
