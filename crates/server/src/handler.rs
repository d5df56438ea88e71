//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::state::AppState;
use crate::tools::cache::{
    CacheClearParams, CacheLookupParams, CacheSummaryParams, CacheSyncParams, clear_impl, lookup_impl, summary_impl,
    sync_impl,
};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The main MCP server handler for assetsync.
#[derive(Clone)]
pub struct AssetSyncServer {
    state: Arc<AppState>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl AssetSyncServer {
    /// Create a new server handler.
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state, tool_router: Self::tool_router() }
    }

    #[tool(
        description = "Run a sync pass now: fetch the manifest and download missing or corrupt assets. In allow-list mode, download any allow-listed asset not yet stored."
    )]
    async fn cache_sync(&self, params: Parameters<CacheSyncParams>) -> Result<CallToolResult, McpError> {
        sync_impl(&self.state, params.0).await
    }

    #[tool(description = "Report the cached manifest version, total size and entry count.")]
    async fn cache_summary(&self, params: Parameters<CacheSummaryParams>) -> Result<CallToolResult, McpError> {
        summary_impl(&self.state, params.0).await
    }

    #[tool(description = "Delete every cached asset and reset the recorded manifest version. Requires confirm=true.")]
    async fn cache_clear(&self, params: Parameters<CacheClearParams>) -> Result<CallToolResult, McpError> {
        clear_impl(&self.state, params.0).await
    }

    #[tool(
        description = "Resolve a request URL the way the interceptor would: served from cache (with MIME type and size) or passed through to the network."
    )]
    async fn cache_lookup(&self, params: Parameters<CacheLookupParams>) -> Result<CallToolResult, McpError> {
        lookup_impl(&self.state, params.0).await
    }
}

impl ServerHandler for AssetSyncServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "assetsync".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::cache::testing::state_for;
    use assetsync_core::InterceptMode;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_router_lists_cache_tools() {
        let dir = tempdir().unwrap();
        let state = state_for(&dir, "http://127.0.0.1:9", InterceptMode::Manifest, &[]).await;
        let server = AssetSyncServer::new(Arc::new(state));

        let mut names: Vec<String> = server.tool_router.list_all().into_iter().map(|t| t.name.to_string()).collect();
        names.sort();

        assert_eq!(names, vec!["cache_clear", "cache_lookup", "cache_summary", "cache_sync"]);
    }

    #[tokio::test]
    async fn test_server_info() {
        let dir = tempdir().unwrap();
        let state = state_for(&dir, "http://127.0.0.1:9", InterceptMode::Manifest, &[]).await;
        let info = AssetSyncServer::new(Arc::new(state)).get_info();

        assert_eq!(info.server_info.name, "assetsync");
    }
}
