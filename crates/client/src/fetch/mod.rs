//! Network access for the cache manager.
//!
//! ### Network seam
//! - Every origin fetch goes through the [`Network`] trait, so strategies can be
//!   exercised against a scripted double.
//! - A response with any status is a successful fetch; only transport failures
//!   (DNS, connect, TLS, timeout, body read) are errors. Strategies decide what
//!   a non-2xx status means for them.
//!
//! ### Cache bypass
//! - Requests in [`CacheMode::Reload`] carry `Cache-Control: no-cache` and
//!   `Pragma: no-cache` so install and update never read intermediaries.
//!
//! ### URL Canonicalization
//! - Lowercase host, remove fragments, preserve query string.

#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod request;
pub mod response;
pub mod url;

use reqwest::{Client, header};
use std::time::{Duration, Instant};

pub use reqwest::{Method, StatusCode};
pub use request::{CacheMode, Destination, Request, RequestMode};
pub use response::Response;
pub use self::url::{UrlError, canonicalize, resolve};

use shellcache_core::{AppConfig, Error};

/// The path from the cache manager to the origin.
#[async_trait::async_trait]
pub trait Network: Send + Sync {
    /// Perform the request against the network.
    async fn fetch(&self, request: &Request) -> Result<Response, Error>;
}

/// Configuration for the HTTP network.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "shellcache/0.1")
    pub user_agent: String,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { user_agent: "shellcache/0.1".to_string(), timeout: Duration::from_millis(20000), max_redirects: 5 }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self { user_agent: config.user_agent.clone(), timeout: config.timeout(), ..Default::default() }
    }
}

/// `Accept` header a browser would send for this destination.
fn accept_for(destination: Destination) -> &'static str {
    match destination {
        Destination::Document => "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        Destination::Image => "image/avif,image/webp,image/svg+xml,image/*,*/*;q=0.8",
        Destination::Style => "text/css,*/*;q=0.1",
        Destination::Video => "video/*,*/*;q=0.8",
        Destination::Script | Destination::Font | Destination::Empty => "*/*",
    }
}

/// HTTP network backed by reqwest.
pub struct HttpNetwork {
    http: Client,
    config: FetchConfig,
}

impl HttpNetwork {
    /// Create a new HTTP network with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

#[async_trait::async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let start = Instant::now();

        let mut builder = self
            .http
            .request(request.method.clone(), request.url.clone())
            .header(header::ACCEPT, accept_for(request.destination));

        if request.cache == CacheMode::Reload {
            builder = builder
                .header(header::CACHE_CONTROL, "no-cache")
                .header(header::PRAGMA, "no-cache");
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::Network(format!("{}: {e}", request.url)))?;

        let status = response.status();
        let headers = response.headers().clone();

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::Network(format!("{}: failed to read response: {e}", request.url)))?;

        tracing::debug!(
            "fetched {} {} -> {} in {}ms ({} bytes)",
            request.method,
            request.url,
            status.as_u16(),
            start.elapsed().as_millis(),
            body.len()
        );

        Ok(Response::new(status, headers, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, "shellcache/0.1");
        assert_eq!(config.timeout, Duration::from_millis(20000));
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_fetch_config_from_app_config() {
        let app = AppConfig { user_agent: "custom/1.0".into(), timeout_ms: 1500, ..Default::default() };
        let config = FetchConfig::from(&app);
        assert_eq!(config.user_agent, "custom/1.0");
        assert_eq!(config.timeout, Duration::from_millis(1500));
    }

    #[test]
    fn test_accept_for_document() {
        assert!(accept_for(Destination::Document).starts_with("text/html"));
        assert_eq!(accept_for(Destination::Script), "*/*");
    }

    #[tokio::test]
    async fn test_http_network_new() {
        let network = HttpNetwork::new(FetchConfig::default());
        assert!(network.is_ok());
    }

    #[tokio::test]
    #[ignore = "requires network"]
    async fn test_fetch_live_page() {
        let network = HttpNetwork::new(FetchConfig::default()).unwrap();
        let request = Request::navigate(canonicalize("https://example.com").unwrap());
        let response = network.fetch(&request).await.unwrap();
        assert!(response.ok());
        assert!(response.text().contains("Example Domain"));
    }
}
