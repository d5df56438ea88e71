//! Where asset bodies come from.
//!
//! The sync engine and the allow-list interceptor only need "bytes for this
//! path"; the `AssetSource` trait keeps them independent of HTTP details.

use assetsync_core::{AppConfig, Error};
use async_trait::async_trait;
use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use crate::fetch::{FetchClient, FetchConfig, FetchError, Origin};

/// Source of asset bodies keyed by origin-relative path.
#[async_trait]
pub trait AssetSource: Send + Sync {
    /// Download the body of `path`.
    ///
    /// Returns `Error::Cancelled` if `cancel` fires first and
    /// `Error::AssetFetchFailed` for any other failure.
    async fn fetch_asset(&self, path: &str, cancel: &CancellationToken) -> Result<Bytes, Error>;
}

/// HTTP asset source resolving paths against an [`Origin`].
#[derive(Debug, Clone)]
pub struct HttpAssetSource {
    client: FetchClient,
    origin: Origin,
}

impl HttpAssetSource {
    pub fn new(client: FetchClient, origin: Origin) -> Self {
        Self { client, origin }
    }

    /// Build a source using the asset timeouts from `config`.
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let origin = Origin::parse(&config.origin_url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let client = FetchClient::new(FetchConfig {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            connect_timeout: config.connect_timeout(),
            read_timeout: config.asset_read_timeout(),
            ..Default::default()
        })
        .map_err(|e| Error::InvalidInput(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::new(client, origin))
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }
}

#[async_trait]
impl AssetSource for HttpAssetSource {
    async fn fetch_asset(&self, path: &str, cancel: &CancellationToken) -> Result<Bytes, Error> {
        let url = self.origin.asset_url(path).map_err(|e| Error::AssetFetchFailed {
            path: path.to_string(),
            reason: e.to_string(),
        })?;

        match self.client.fetch(&url, cancel).await {
            Ok(response) => Ok(response.bytes),
            Err(FetchError::Cancelled) => Err(Error::Cancelled),
            Err(e) => Err(Error::AssetFetchFailed { path: path.to_string(), reason: e.to_string() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    #[tokio::test]
    async fn test_fetch_asset_resolves_against_origin() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/static/assets/a.js")
            .with_status(200)
            .with_body("console.log(1)")
            .create_async()
            .await;

        let source = HttpAssetSource::new(
            FetchClient::new(FetchConfig::default()).unwrap(),
            Origin::parse(&server.url()).unwrap(),
        );
        let bytes = source.fetch_asset("static/assets/a.js", &CancellationToken::new()).await.unwrap();

        assert_eq!(bytes.as_ref(), b"console.log(1)");
    }

    #[tokio::test]
    async fn test_fetch_asset_failure_names_path() {
        let mut server = Server::new_async().await;
        let _m = server.mock("GET", "/gone.png").with_status(404).create_async().await;

        let source = HttpAssetSource::new(
            FetchClient::new(FetchConfig::default()).unwrap(),
            Origin::parse(&server.url()).unwrap(),
        );
        let result = source.fetch_asset("gone.png", &CancellationToken::new()).await;

        assert!(matches!(result, Err(Error::AssetFetchFailed { path, reason }) if path == "gone.png" && reason.contains("404")));
    }

    #[test]
    fn test_from_config_rejects_bad_origin() {
        let config = AppConfig { origin_url: "::".into(), ..Default::default() };
        assert!(matches!(HttpAssetSource::from_config(&config), Err(Error::InvalidUrl(_))));
    }
}
