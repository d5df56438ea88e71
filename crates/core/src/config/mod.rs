//! Engine configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (ASSETSYNC_*)
//! 2. TOML config file (if ASSETSYNC_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::cache::DigestAlgorithm;

mod validation;

pub use validation::ConfigError;

/// How the interceptor treats a recognized path that is not stored yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum InterceptMode {
    /// Catalog comes from the remote manifest. Misses pass through to the
    /// network and the next sync pass fills the store.
    #[default]
    Manifest,
    /// Catalog is the fixed `allow_list`. Misses are fetched, stored and
    /// served on the spot (write-through-on-demand), with no digest check.
    AllowList,
}

/// Engine configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (ASSETSYNC_*)
/// 2. TOML config file (if ASSETSYNC_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Base URL that asset paths are resolved against and stripped from.
    ///
    /// Set via ASSETSYNC_ORIGIN_URL environment variable.
    #[serde(default = "default_origin_url")]
    pub origin_url: String,

    /// Location of the manifest document.
    ///
    /// Set via ASSETSYNC_MANIFEST_URL environment variable.
    #[serde(default = "default_manifest_url")]
    pub manifest_url: String,

    /// Directory holding cache entries.
    ///
    /// Set via ASSETSYNC_CACHE_DIR environment variable.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Path to the SQLite version-state database.
    ///
    /// Set via ASSETSYNC_STATE_DB_PATH environment variable.
    #[serde(default = "default_state_db_path")]
    pub state_db_path: PathBuf,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via ASSETSYNC_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// TCP/TLS connect timeout in milliseconds.
    ///
    /// Set via ASSETSYNC_CONNECT_TIMEOUT_MS environment variable.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Read timeout for the manifest document in milliseconds.
    ///
    /// Set via ASSETSYNC_READ_TIMEOUT_MS environment variable.
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    /// Read timeout for asset bodies in milliseconds.
    ///
    /// Set via ASSETSYNC_ASSET_READ_TIMEOUT_MS environment variable.
    #[serde(default = "default_asset_read_timeout_ms")]
    pub asset_read_timeout_ms: u64,

    /// Maximum bytes accepted for a single response body.
    ///
    /// Set via ASSETSYNC_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Concurrent asset downloads within one sync pass.
    ///
    /// Set via ASSETSYNC_MAX_CONCURRENCY environment variable.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Seconds between background sync passes; 0 runs a single pass.
    ///
    /// Set via ASSETSYNC_SYNC_INTERVAL_SECS environment variable.
    #[serde(default = "default_sync_interval_secs")]
    pub sync_interval_secs: u64,

    /// Miss behaviour of the interceptor.
    ///
    /// Set via ASSETSYNC_INTERCEPT_MODE (`manifest` or `allow_list`).
    #[serde(default)]
    pub intercept_mode: InterceptMode,

    /// Cacheable paths for `allow_list` mode.
    ///
    /// Set via ASSETSYNC_ALLOW_LIST environment variable (`[a, b]` syntax).
    #[serde(default)]
    pub allow_list: Vec<String>,

    /// Re-verify stored bytes against the manifest digest before serving.
    ///
    /// Set via ASSETSYNC_VERIFY_ON_SERVE environment variable.
    #[serde(default = "default_true")]
    pub verify_on_serve: bool,

    /// Digest algorithm used by the manifest.
    ///
    /// Set via ASSETSYNC_DIGEST_ALGORITHM (`md5` or `sha256`).
    #[serde(default)]
    pub digest_algorithm: DigestAlgorithm,
}

fn default_origin_url() -> String {
    "http://localhost:3000/".into()
}

fn default_manifest_url() -> String {
    "http://localhost:3000/manifest".into()
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("./assetsync-cache")
}

fn default_state_db_path() -> PathBuf {
    PathBuf::from("./assetsync-state.sqlite")
}

fn default_user_agent() -> String {
    "assetsync/0.1".into()
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}

fn default_read_timeout_ms() -> u64 {
    10_000
}

fn default_asset_read_timeout_ms() -> u64 {
    30_000
}

fn default_max_bytes() -> usize {
    20 * 1024 * 1024
}

fn default_max_concurrency() -> usize {
    4
}

fn default_sync_interval_secs() -> u64 {
    300
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            origin_url: default_origin_url(),
            manifest_url: default_manifest_url(),
            cache_dir: default_cache_dir(),
            state_db_path: default_state_db_path(),
            user_agent: default_user_agent(),
            connect_timeout_ms: default_connect_timeout_ms(),
            read_timeout_ms: default_read_timeout_ms(),
            asset_read_timeout_ms: default_asset_read_timeout_ms(),
            max_bytes: default_max_bytes(),
            max_concurrency: default_max_concurrency(),
            sync_interval_secs: default_sync_interval_secs(),
            intercept_mode: InterceptMode::default(),
            allow_list: Vec::new(),
            verify_on_serve: true,
            digest_algorithm: DigestAlgorithm::default(),
        }
    }
}

impl AppConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn asset_read_timeout(&self) -> Duration {
        Duration::from_millis(self.asset_read_timeout_ms)
    }

    /// Interval between sync passes, `None` for a single pass.
    pub fn sync_interval(&self) -> Option<Duration> {
        (self.sync_interval_secs > 0).then(|| Duration::from_secs(self.sync_interval_secs))
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `ASSETSYNC_`
    /// 2. TOML file from `ASSETSYNC_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("ASSETSYNC_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("ASSETSYNC_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.origin_url, "http://localhost:3000/");
        assert_eq!(config.manifest_url, "http://localhost:3000/manifest");
        assert_eq!(config.cache_dir, PathBuf::from("./assetsync-cache"));
        assert_eq!(config.user_agent, "assetsync/0.1");
        assert_eq!(config.connect_timeout_ms, 5_000);
        assert_eq!(config.read_timeout_ms, 10_000);
        assert_eq!(config.max_concurrency, 4);
        assert_eq!(config.intercept_mode, InterceptMode::Manifest);
        assert_eq!(config.digest_algorithm, DigestAlgorithm::Md5);
        assert!(config.verify_on_serve);
        assert!(config.allow_list.is_empty());
    }

    #[test]
    fn test_durations() {
        let config = AppConfig::default();
        assert_eq!(config.connect_timeout(), Duration::from_millis(5_000));
        assert_eq!(config.read_timeout(), Duration::from_millis(10_000));
        assert_eq!(config.asset_read_timeout(), Duration::from_millis(30_000));
        assert_eq!(config.sync_interval(), Some(Duration::from_secs(300)));
    }

    #[test]
    fn test_zero_interval_means_single_pass() {
        let config = AppConfig { sync_interval_secs: 0, ..Default::default() };
        assert_eq!(config.sync_interval(), None);
    }

    #[test]
    fn test_load_from_env_and_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "assetsync.toml",
                r#"
                origin_url = "https://cdn.example.com/"
                intercept_mode = "allow_list"
                allow_list = ["static/assets/a.css"]
                "#,
            )?;
            jail.set_env("ASSETSYNC_CONFIG_FILE", "assetsync.toml");
            jail.set_env("ASSETSYNC_MAX_CONCURRENCY", "8");
            jail.set_env("ASSETSYNC_DIGEST_ALGORITHM", "sha256");

            let config = AppConfig::load().expect("config should load");
            assert_eq!(config.origin_url, "https://cdn.example.com/");
            assert_eq!(config.intercept_mode, InterceptMode::AllowList);
            assert_eq!(config.allow_list, vec!["static/assets/a.css".to_string()]);
            assert_eq!(config.max_concurrency, 8);
            assert_eq!(config.digest_algorithm, DigestAlgorithm::Sha256);
            Ok(())
        });
    }
}
