//! Runtime wiring shared by the MCP handler and the background task.

use std::sync::Arc;

use assetsync_client::{AllowList, AssetSource, HttpAssetSource, Interceptor, PreloadReport, SyncEngine, SyncTask, preload};
use assetsync_core::{AppConfig, AssetCache, CacheStore, Error, InterceptMode, StateDb};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Everything the tools operate on.
pub struct AppState {
    pub mode: InterceptMode,
    pub engine: Arc<SyncEngine>,
    pub interceptor: Interceptor,
    pub allow_list: AllowList,
    pub source: Arc<dyn AssetSource>,
    pub cancel: CancellationToken,
}

/// Background work started at boot.
pub enum Background {
    Sync(SyncTask),
    Preload(JoinHandle<PreloadReport>),
}

impl Background {
    /// Wait for the work to stop. Call after [`AppState::shutdown`].
    pub async fn shutdown(self) {
        match self {
            Background::Sync(task) => task.shutdown().await,
            Background::Preload(handle) => {
                if let Err(e) = handle.await {
                    tracing::error!(error = %e, "preload task panicked");
                }
            }
        }
    }
}

impl AppState {
    /// Open the store and state database and build the engine and interceptor.
    pub async fn open(config: &AppConfig) -> Result<Self, Error> {
        let store = CacheStore::open(&config.cache_dir).await?;
        let state = StateDb::open(&config.state_db_path).await?;
        let engine = Arc::new(SyncEngine::from_config(config, AssetCache::new(store, state))?);
        let source: Arc<dyn AssetSource> = Arc::new(HttpAssetSource::from_config(config)?);
        let cancel = CancellationToken::new();

        let interceptor =
            Interceptor::from_config(config, &engine, Arc::clone(&source))?.with_cancel(cancel.child_token());

        Ok(Self {
            mode: config.intercept_mode,
            engine,
            interceptor,
            allow_list: AllowList::new(&config.allow_list),
            source,
            cancel,
        })
    }

    /// Restore the persisted snapshot and start the mode's background work.
    pub async fn start(&self, config: &AppConfig) -> Background {
        match self.mode {
            InterceptMode::Manifest => {
                match self.engine.restore_snapshot().await {
                    Ok(true) => {}
                    Ok(false) => tracing::info!("no persisted manifest; interception starts empty"),
                    Err(e) => tracing::warn!(error = %e, "failed to restore persisted manifest"),
                }
                Background::Sync(SyncTask::spawn(
                    Arc::clone(&self.engine),
                    config.sync_interval(),
                    self.cancel.child_token(),
                ))
            }
            InterceptMode::AllowList => {
                let list = self.allow_list.clone();
                let store = self.engine.cache().store().clone();
                let source = Arc::clone(&self.source);
                let cancel = self.cancel.child_token();
                Background::Preload(tokio::spawn(async move {
                    preload(&list, &store, source.as_ref(), &cancel).await
                }))
            }
        }
    }

    /// Host teardown: abort in-flight passes and on-demand fetches.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}
