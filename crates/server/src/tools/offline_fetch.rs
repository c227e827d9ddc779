//! offline_fetch tool implementation.
//!
//! Sends one request through the cache manager, the way a page would.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_client::fetch::Method;
use shellcache_client::{Destination, Registration, Request, RequestMode, Route, Source};
use shellcache_core::Error;

use super::json_result;
use crate::error::ServerError;

/// Input parameters for offline_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OfflineFetchParams {
    /// Absolute URL, or a path resolved against the site origin.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default)]
    pub method: Option<String>,

    /// Request mode: "navigate" for page loads (default: "cors").
    #[serde(default)]
    pub mode: Option<RequestMode>,

    /// Request destination, e.g. "image" or "document" (default: "empty").
    #[serde(default)]
    pub destination: Option<Destination>,
}

/// Output structure for offline_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OfflineFetchOutput {
    pub url: String,
    pub route: Route,
    pub source: Source,
    pub status: u16,
    pub content_type: Option<String>,
    /// Body size in bytes.
    pub size: usize,
    /// Body text, for textual content types only.
    pub body: Option<String>,
}

fn is_textual(content_type: &str) -> bool {
    let mime = content_type.split(';').next().unwrap_or_default().trim();
    mime.starts_with("text/")
        || mime.ends_with("json")
        || mime.ends_with("xml")
        || mime.ends_with("javascript")
        || mime == "image/svg+xml"
}

fn build_request(registration: &Registration, params: &OfflineFetchParams) -> Result<Request, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }
    let url = registration.resolve_url(params.url.trim())?;

    let method = match params.method.as_deref() {
        Some(method) => Method::from_bytes(method.trim().to_ascii_uppercase().as_bytes())
            .map_err(|e| ServerError::InvalidInput(format!("method {method:?}: {e}")))?,
        None => Method::GET,
    };

    let mut request = match params.mode {
        Some(RequestMode::Navigate) => Request::navigate(url),
        Some(mode) => Request { mode, ..Request::get(url) },
        None => Request::get(url),
    };
    if let Some(destination) = params.destination {
        request = request.with_destination(destination);
    }
    Ok(request.with_method(method))
}

/// Implementation of the offline_fetch tool.
pub async fn fetch_impl(registration: &Registration, params: OfflineFetchParams) -> Result<CallToolResult, McpError> {
    let request = build_request(registration, &params)?;
    let served = registration.handle(&request).await?;

    let content_type = served.response.content_type().map(str::to_string);
    let body = content_type
        .as_deref()
        .filter(|ct| is_textual(ct))
        .map(|_| served.response.text().into_owned());

    let output = OfflineFetchOutput {
        url: request.url.to_string(),
        route: served.route,
        source: served.source,
        status: served.response.status.as_u16(),
        content_type,
        size: served.response.body.len(),
        body,
    };

    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{output, registration, site};

    fn params(url: &str) -> OfflineFetchParams {
        OfflineFetchParams { url: url.into(), method: None, mode: None, destination: None }
    }

    #[test]
    fn test_is_textual() {
        assert!(is_textual("text/html; charset=utf-8"));
        assert!(is_textual("application/json"));
        assert!(is_textual("image/svg+xml"));
        assert!(!is_textual("image/gif"));
    }

    #[tokio::test]
    async fn test_fetch_empty_url() {
        let reg = registration(site()).await;
        assert!(fetch_impl(&reg, params("  ")).await.is_err());
    }

    #[tokio::test]
    async fn test_fetch_bad_method() {
        let reg = registration(site()).await;
        let result = fetch_impl(&reg, OfflineFetchParams { method: Some("BR EW".into()), ..params("/struct/") }).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_fetch_served_from_cache() {
        let network = site();
        let reg = registration(network.clone()).await;
        reg.register(None).await.unwrap();
        network.set_offline(true);

        let result = fetch_impl(&reg, params("/struct/css/main.css")).await.unwrap();
        let value = output(&result);
        assert_eq!(value["route"], "static_asset");
        assert_eq!(value["source"], "cache");
        assert_eq!(value["status"], 200);
        assert_eq!(value["body"], "body{}");
    }

    #[tokio::test]
    async fn test_fetch_navigation_shell() {
        let network = site();
        let reg = registration(network.clone()).await;
        reg.register(None).await.unwrap();
        network.set_offline(true);

        let fetch = OfflineFetchParams { mode: Some(RequestMode::Navigate), ..params("/struct/missing/") };
        let value = output(&fetch_impl(&reg, fetch).await.unwrap());
        assert_eq!(value["route"], "navigation");
        assert_eq!(value["source"], "shell");
        assert_eq!(value["body"], "<html>shell</html>");
    }

    #[tokio::test]
    async fn test_fetch_binary_body_omitted() {
        let network = site();
        let reg = registration(network.clone()).await;
        reg.register(None).await.unwrap();

        let value = output(&fetch_impl(&reg, params("/struct/demos/basic-usage.gif")).await.unwrap());
        assert_eq!(value["route"], "demo_asset");
        assert_eq!(value["size"], 6);
        assert!(value["body"].is_null());
    }
}
