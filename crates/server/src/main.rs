//! assetsync server entry point.
//!
//! Boots the asset cache, starts background sync, and serves the MCP tools on
//! stdio transport. Logging goes to stderr to avoid interfering with the
//! JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::{Context, Result};
use assetsync_core::AppConfig;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod handler;
mod state;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("failed to load configuration")?;
    tracing::info!(
        origin = %config.origin_url,
        manifest = %config.manifest_url,
        cache_dir = %config.cache_dir.display(),
        mode = ?config.intercept_mode,
        "Starting assetsync server on stdio transport"
    );

    let state = Arc::new(state::AppState::open(&config).await.context("failed to open asset cache")?);
    let background = state.start(&config).await;

    let handler = handler::AssetSyncServer::new(Arc::clone(&state));
    let server = serve_server(handler, stdio()).await?;

    tokio::select! {
        result = server.waiting() => {
            if let Err(e) = result {
                tracing::error!(error = %e, "MCP service stopped with error");
            }
        }
        _ = tokio::signal::ctrl_c() => tracing::info!("interrupt received"),
    }

    state.shutdown();
    background.shutdown().await;
    tracing::info!("assetsync server stopped");

    Ok(())
}
