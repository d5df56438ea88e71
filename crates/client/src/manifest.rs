//! Manifest retrieval.
//!
//! Every failure mode (timeout, status, oversize body, malformed document)
//! collapses into `Error::ManifestUnavailable`; the caller skips the pass.

use assetsync_core::{AppConfig, DigestAlgorithm, Error, Manifest};
use reqwest::Url;
use tokio_util::sync::CancellationToken;

use crate::fetch::{FetchClient, FetchConfig, FetchError, canonicalize};

/// Fetches and parses the remote manifest document.
#[derive(Debug, Clone)]
pub struct ManifestFetcher {
    client: FetchClient,
    url: Url,
    algorithm: DigestAlgorithm,
}

impl ManifestFetcher {
    pub fn new(client: FetchClient, manifest_url: &str, algorithm: DigestAlgorithm) -> Result<Self, Error> {
        let url = canonicalize(manifest_url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(Self { client, url, algorithm })
    }

    /// Build a fetcher using the manifest timeouts from `config`.
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let client = FetchClient::new(FetchConfig {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            connect_timeout: config.connect_timeout(),
            read_timeout: config.read_timeout(),
            ..Default::default()
        })
        .map_err(|e| Error::ManifestUnavailable(format!("failed to build HTTP client: {e}")))?;
        Self::new(client, &config.manifest_url, config.digest_algorithm)
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Fetch and validate the manifest.
    ///
    /// A cancelled fetch reports `Error::Cancelled` instead.
    pub async fn fetch(&self, cancel: &CancellationToken) -> Result<Manifest, Error> {
        let response = self.client.fetch(&self.url, cancel).await.map_err(|e| match e {
            FetchError::Cancelled => Error::Cancelled,
            other => Error::ManifestUnavailable(format!("{}: {other}", self.url)),
        })?;

        let manifest = Manifest::from_json(&response.bytes, self.algorithm)
            .map_err(|e| Error::ManifestUnavailable(format!("malformed manifest: {e}")))?;

        tracing::debug!(
            url = %self.url,
            assets = manifest.len(),
            version = manifest.version(),
            "manifest fetched"
        );

        Ok(manifest)
    }
}
