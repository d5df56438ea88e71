//! Background sync loop.

use std::sync::Arc;
use std::time::Duration;

use assetsync_core::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::SyncEngine;

/// Handle to a running background sync loop.
///
/// The loop runs one pass immediately, then one pass per `interval`. With no
/// interval it runs a single pass and exits.
#[derive(Debug)]
pub struct SyncTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl SyncTask {
    pub fn spawn(engine: Arc<SyncEngine>, interval: Option<Duration>, cancel: CancellationToken) -> Self {
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            loop {
                match engine.run_pass(&token).await {
                    Ok(report) if report.cancelled => break,
                    Err(Error::Cancelled) => break,
                    // Failures are logged by the engine; retry on the next tick.
                    _ => {}
                }

                let Some(interval) = interval else { break };
                tokio::select! {
                    () = token.cancelled() => break,
                    () = tokio::time::sleep(interval) => {}
                }
            }
            tracing::debug!("sync loop stopped");
        });

        Self { cancel, handle }
    }

    /// Request cancellation of the in-flight pass and of future passes.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Cancel and wait for the loop to exit.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.handle.await {
            tracing::error!(error = %e, "sync loop panicked");
        }
    }

    /// Wait for the loop to exit on its own (single-pass mode).
    pub async fn join(self) {
        if let Err(e) = self.handle.await {
            tracing::error!(error = %e, "sync loop panicked");
        }
    }
}
