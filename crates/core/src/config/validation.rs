//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::{AppConfig, InterceptMode};
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

const MIN_TIMEOUT_MS: u64 = 100;
const MAX_TIMEOUT_MS: u64 = 300_000;
const MAX_BYTES_LIMIT: usize = 50 * 1024 * 1024;
const MAX_CONCURRENCY_LIMIT: usize = 16;

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - a URL does not parse as http(s)
    /// - a timeout is below 100ms or above 5 minutes
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `max_concurrency` is outside 1..=16
    /// - `user_agent` is empty
    ///
    /// Returns `ConfigError::Missing` if `allow_list` mode has no paths.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_url("origin_url", &self.origin_url)?;
        check_url("manifest_url", &self.manifest_url)?;

        for (field, value) in [
            ("connect_timeout_ms", self.connect_timeout_ms),
            ("read_timeout_ms", self.read_timeout_ms),
            ("asset_read_timeout_ms", self.asset_read_timeout_ms),
        ] {
            if value < MIN_TIMEOUT_MS {
                return Err(ConfigError::Invalid { field: field.into(), reason: "must be at least 100ms".into() });
            }
            if value > MAX_TIMEOUT_MS {
                return Err(ConfigError::Invalid {
                    field: field.into(),
                    reason: "must not exceed 5 minutes (300000ms)".into(),
                });
            }
        }

        if self.max_bytes == 0 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must be greater than 0".into() });
        }
        if self.max_bytes > MAX_BYTES_LIMIT {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must not exceed 50MB".into() });
        }

        if self.max_concurrency == 0 || self.max_concurrency > MAX_CONCURRENCY_LIMIT {
            return Err(ConfigError::Invalid {
                field: "max_concurrency".into(),
                reason: format!("must be between 1 and {MAX_CONCURRENCY_LIMIT}"),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        match self.intercept_mode {
            InterceptMode::AllowList if self.allow_list.is_empty() => {
                return Err(ConfigError::Missing {
                    field: "allow_list".into(),
                    hint: "allow_list mode needs at least one cacheable path (ASSETSYNC_ALLOW_LIST)".into(),
                });
            }
            InterceptMode::Manifest if !self.allow_list.is_empty() => {
                tracing::warn!(
                    allow_list_count = self.allow_list.len(),
                    "allow_list is set but intercept_mode is manifest; the allow_list is ignored"
                );
            }
            _ => {}
        }

        Ok(())
    }
}

fn check_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let parsed = url::Url::parse(value)
        .map_err(|e| ConfigError::Invalid { field: field.into(), reason: format!("invalid URL: {e}") })?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(ConfigError::Invalid { field: field.into(), reason: format!("unsupported scheme: {scheme}") }),
    }
}
