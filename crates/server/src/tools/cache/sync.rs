//! cache_sync tool implementation.
//!
//! Runs one sync pass now (manifest mode) or warms the store from the
//! allow-list (allow-list mode).

use assetsync_client::{PreloadReport, SyncReport, preload};
use assetsync_core::InterceptMode;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;
use crate::state::AppState;

/// Parameters for the cache_sync tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheSyncParams {}

/// Output from the cache_sync tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheSyncOutput {
    /// Interception mode the server runs in.
    pub mode: InterceptMode,
    /// Reconcile report (manifest mode).
    pub sync: Option<SyncReport>,
    /// Preload report (allow-list mode).
    pub preload: Option<PreloadReport>,
}

/// Implementation of the cache_sync tool.
pub async fn sync_impl(state: &AppState, _params: CacheSyncParams) -> Result<CallToolResult, McpError> {
    let cancel = state.cancel.child_token();

    let output = match state.mode {
        InterceptMode::Manifest => {
            let report = state.engine.run_pass(&cancel).await?;
            CacheSyncOutput { mode: state.mode, sync: Some(report), preload: None }
        }
        InterceptMode::AllowList => {
            let report = preload(&state.allow_list, state.engine.cache().store(), state.source.as_ref(), &cancel).await;
            CacheSyncOutput { mode: state.mode, sync: None, preload: Some(report) }
        }
    };

    json_result(&output)
}
