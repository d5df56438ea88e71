//! Unified error types for assetsync.
//!
//! Every variant renders with a stable upper-case code prefix so log lines and
//! MCP error messages can be grepped by failure class.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error types for the asset cache engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The manifest could not be fetched or parsed; the sync pass is skipped.
    #[error("MANIFEST_UNAVAILABLE: {0}")]
    ManifestUnavailable(String),

    /// Network failure while downloading a single asset.
    #[error("ASSET_FETCH_FAILED: {path}: {reason}")]
    AssetFetchFailed { path: String, reason: String },

    /// Stored or downloaded bytes do not match the declared digest.
    #[error("INTEGRITY_MISMATCH: {path} (expected {expected}, got {actual})")]
    IntegrityMismatch { path: String, expected: String, actual: String },

    /// Local storage read/write/delete failure.
    #[error("IO_FAILURE: {0}")]
    Io(#[from] std::io::Error),

    /// No cache entry exists for the given path.
    #[error("NOT_FOUND: {0}")]
    NotFound(String),

    /// The operation observed a cancellation request and stopped.
    #[error("CANCELLED")]
    Cancelled,

    /// Invalid input parameters.
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// State database operation failed.
    #[error("STATE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("STATE_ERROR: migration failed: {0}")]
    MigrationFailed(String),
}

impl Error {
    /// Short reason string recorded in sync reports.
    pub fn reason(&self) -> String {
        match self {
            Error::AssetFetchFailed { reason, .. } => reason.clone(),
            other => other.to_string(),
        }
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::InvalidInput(err.to_string())
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let code = match &err {
            Error::InvalidInput(_) => -32602,
            Error::ManifestUnavailable(_) => -32001,
            Error::AssetFetchFailed { .. } => -32002,
            Error::IntegrityMismatch { .. } => -32003,
            Error::Io(_) => -32004,
            Error::NotFound(_) => -32005,
            Error::Cancelled => -32006,
            Error::InvalidUrl(_) => -32007,
            Error::Database(_) | Error::MigrationFailed(_) => -32008,
        };

        McpError { code: ErrorCode(code), message: err.to_string().into(), data: None }
    }
}
