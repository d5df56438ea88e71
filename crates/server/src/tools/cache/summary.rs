//! cache_summary tool implementation.

use assetsync_core::CacheSummary;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;
use crate::state::AppState;

/// Parameters for the cache_summary tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheSummaryParams {}

/// Implementation of the cache_summary tool.
pub async fn summary_impl(state: &AppState, _params: CacheSummaryParams) -> Result<CallToolResult, McpError> {
    let summary: CacheSummary = state.engine.cache_summary().await?;
    json_result(&summary)
}
