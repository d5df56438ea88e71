//! cache_clear tool implementation.
//!
//! Deletes every cached asset and resets the recorded manifest version.

use assetsync_core::Error;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;
use crate::state::AppState;

/// Parameters for the cache_clear tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheClearParams {
    /// Must be true; guards against accidental wipes.
    pub confirm: bool,
}

/// Output from the cache_clear tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheClearOutput {
    /// Number of entries removed.
    pub deleted: usize,
    /// Bytes freed.
    pub freed_bytes: u64,
}

/// Implementation of the cache_clear tool.
pub async fn clear_impl(state: &AppState, params: CacheClearParams) -> Result<CallToolResult, McpError> {
    if !params.confirm {
        return Err(Error::InvalidInput("confirm must be true to clear the cache".to_string()).into());
    }

    let before = state.engine.cache_summary().await?;
    state.engine.clear_cache().await?;

    json_result(&CacheClearOutput { deleted: before.entry_count, freed_bytes: before.size_bytes })
}
