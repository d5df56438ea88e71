//! HTTP fetch pipeline with bounded timeouts and cancellation.
//!
//! ### Timeouts
//! - Connect timeout bounds TCP/TLS establishment.
//! - Read timeout bounds every read of the response.
//! - The whole exchange is capped at connect + read so a trickling body
//!   cannot stall a sync pass.
//!
//! ### Safety Gates
//! - Non-2xx statuses are errors.
//! - Bodies larger than `max_bytes` are rejected while streaming.
//! - Every request races a `CancellationToken`.

pub mod url;

use bytes::{Bytes, BytesMut};
use reqwest::{Client, StatusCode, Url};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

pub use url::{Origin, UrlError, canonicalize};

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "assetsync/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 20MB)
    pub max_bytes: usize,

    /// Connect timeout (default: 5s)
    pub connect_timeout: Duration,

    /// Read timeout (default: 10s)
    pub read_timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "assetsync/0.1".to_string(),
            max_bytes: 20 * 1024 * 1024,
            connect_timeout: Duration::from_millis(5_000),
            read_timeout: Duration::from_millis(10_000),
            max_redirects: 5,
        }
    }
}

/// Errors from the fetch pipeline.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    /// Connect or read timeout elapsed.
    #[error("request timeout")]
    Timeout,

    /// Non-success HTTP status.
    #[error("HTTP status {0}")]
    Status(u16),

    /// Body exceeded the configured limit.
    #[error("response too large: {size} bytes exceeds {limit}")]
    TooLarge { size: u64, limit: usize },

    /// Transport-level failure.
    #[error("network error: {0}")]
    Network(Arc<reqwest::Error>),

    /// The cancellation token fired before the exchange completed.
    #[error("cancelled")]
    Cancelled,
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { FetchError::Timeout } else { FetchError::Network(Arc::new(err)) }
    }
}

/// Response from a fetch operation.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// The URL requested
    pub url: Url,
    /// HTTP status code
    pub status: StatusCode,
    /// Content-Type header
    pub content_type: Option<String>,
    /// Response body bytes
    pub bytes: Bytes,
    /// Time taken to fetch in milliseconds
    pub fetch_ms: u64,
}

/// HTTP client with bounded timeouts.
#[derive(Debug, Clone)]
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .timeout(config.connect_timeout + config.read_timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()?;

        Ok(Self { http, config })
    }

    /// Fetch a URL, returning raw bytes and metadata.
    ///
    /// Returns `FetchError::Cancelled` without touching the network if the
    /// token is already cancelled, and promptly if it fires mid-flight.
    pub async fn fetch(&self, url: &Url, cancel: &CancellationToken) -> Result<FetchResponse, FetchError> {
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }

        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                tracing::debug!(%url, "fetch cancelled");
                Err(FetchError::Cancelled)
            }
            result = self.fetch_inner(url) => result,
        }
    }

    async fn fetch_inner(&self, url: &Url) -> Result<FetchResponse, FetchError> {
        let start = Instant::now();

        let mut response = self.http.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        if let Some(len) = response.content_length()
            && len > self.config.max_bytes as u64
        {
            return Err(FetchError::TooLarge { size: len, limit: self.config.max_bytes });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let mut body = BytesMut::new();
        while let Some(chunk) = response.chunk().await? {
            if body.len() + chunk.len() > self.config.max_bytes {
                return Err(FetchError::TooLarge {
                    size: (body.len() + chunk.len()) as u64,
                    limit: self.config.max_bytes,
                });
            }
            body.extend_from_slice(&chunk);
        }

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(%url, status = status.as_u16(), bytes = body.len(), fetch_ms, "fetched");

        Ok(FetchResponse { url: url.clone(), status, content_type, bytes: body.freeze(), fetch_ms })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    fn client_with(config: FetchConfig) -> FetchClient {
        FetchClient::new(config).unwrap()
    }

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, "assetsync/0.1");
        assert_eq!(config.max_bytes, 20 * 1024 * 1024);
        assert_eq!(config.connect_timeout, Duration::from_millis(5_000));
        assert_eq!(config.read_timeout, Duration::from_millis(10_000));
        assert_eq!(config.max_redirects, 5);
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/static/a.css")
            .with_status(200)
            .with_header("content-type", "text/css")
            .with_body("body{}")
            .create_async()
            .await;

        let client = client_with(FetchConfig::default());
        let url = Url::parse(&format!("{}/static/a.css", server.url())).unwrap();
        let response = client.fetch(&url, &CancellationToken::new()).await.unwrap();

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.bytes.as_ref(), b"body{}");
        assert_eq!(response.content_type.as_deref(), Some("text/css"));
    }

    #[tokio::test]
    async fn test_fetch_non_success_status() {
        let mut server = Server::new_async().await;
        let _m = server.mock("GET", "/missing.js").with_status(404).create_async().await;

        let client = client_with(FetchConfig::default());
        let url = Url::parse(&format!("{}/missing.js", server.url())).unwrap();
        let result = client.fetch(&url, &CancellationToken::new()).await;

        assert!(matches!(result, Err(FetchError::Status(404))));
    }

    #[tokio::test]
    async fn test_fetch_too_large() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/big.png")
            .with_status(200)
            .with_body(vec![0u8; 64])
            .create_async()
            .await;

        let client = client_with(FetchConfig { max_bytes: 16, ..Default::default() });
        let url = Url::parse(&format!("{}/big.png", server.url())).unwrap();
        let result = client.fetch(&url, &CancellationToken::new()).await;

        assert!(matches!(result, Err(FetchError::TooLarge { limit: 16, .. })));
    }

    #[tokio::test]
    async fn test_fetch_cancelled_before_start() {
        let mut server = Server::new_async().await;
        let mock = server.mock("GET", "/a.js").with_status(200).expect(0).create_async().await;

        let client = client_with(FetchConfig::default());
        let url = Url::parse(&format!("{}/a.js", server.url())).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = client.fetch(&url, &cancel).await;
        assert!(matches!(result, Err(FetchError::Cancelled)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_read_timeout() {
        // Accepts connections but never answers.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _server = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let client = client_with(FetchConfig {
            connect_timeout: Duration::from_millis(200),
            read_timeout: Duration::from_millis(200),
            ..Default::default()
        });
        let url = Url::parse(&format!("http://{addr}/manifest")).unwrap();

        let started = Instant::now();
        let result = client.fetch(&url, &CancellationToken::new()).await;

        assert!(matches!(result, Err(FetchError::Timeout)), "got {result:?}");
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_fetch_cancelled_mid_flight() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _server = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let client = client_with(FetchConfig {
            read_timeout: Duration::from_secs(30),
            ..Default::default()
        });
        let url = Url::parse(&format!("http://{addr}/slow.js")).unwrap();
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let result = client.fetch(&url, &cancel).await;

        assert!(matches!(result, Err(FetchError::Cancelled)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
