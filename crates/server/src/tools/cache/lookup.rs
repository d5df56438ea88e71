//! cache_lookup tool implementation.
//!
//! Runs the interception decision for a URL and reports what the host would
//! receive.

use assetsync_client::Interception;
use assetsync_core::Error;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;
use crate::state::AppState;

/// Parameters for the cache_lookup tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheLookupParams {
    /// The request URL to resolve.
    pub url: String,
}

/// Output from the cache_lookup tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheLookupOutput {
    pub url: String,
    /// "served" or "pass_through".
    pub decision: String,
    /// Logical asset path (served only).
    pub path: Option<String>,
    pub mime_type: Option<String>,
    pub encoding: Option<String>,
    pub size_bytes: Option<usize>,
}

/// Implementation of the cache_lookup tool.
pub async fn lookup_impl(state: &AppState, params: CacheLookupParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }

    let output = match state.interceptor.intercept(&params.url).await {
        Interception::Served(response) => CacheLookupOutput {
            url: params.url,
            decision: "served".into(),
            path: Some(response.path),
            mime_type: Some(response.mime_type.to_string()),
            encoding: Some(response.encoding.to_string()),
            size_bytes: Some(response.body.len()),
        },
        Interception::PassThrough => CacheLookupOutput {
            url: params.url,
            decision: "pass_through".into(),
            path: None,
            mime_type: None,
            encoding: None,
            size_bytes: None,
        },
    };

    json_result(&output)
}
