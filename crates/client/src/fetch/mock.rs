//! Scripted network for tests.
//!
//! URLs answer with whatever was registered for them; unknown URLs answer 404
//! like a real origin would. Individual URLs, or the whole network, can be
//! made to fail at the transport level. Every fetch is recorded.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use reqwest::StatusCode;
use reqwest::header::{self, HeaderMap, HeaderValue};
use shellcache_core::Error;

use super::{CacheMode, Network, Request, Response};

#[derive(Debug, Clone)]
struct Reply {
    status: StatusCode,
    content_type: String,
    body: Vec<u8>,
}

/// A recorded fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    pub method: String,
    pub url: String,
    pub cache: CacheMode,
}

/// In-process [`Network`] with scripted replies and failure injection.
#[derive(Debug, Default)]
pub struct MockNetwork {
    replies: Mutex<HashMap<String, Reply>>,
    failing: Mutex<HashSet<String>>,
    offline: AtomicBool,
    calls: Mutex<Vec<MockCall>>,
}

impl MockNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `url` with a 200 and the given body.
    pub fn with_body(self, url: &str, content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        self.set_reply(url, StatusCode::OK, content_type, body);
        self
    }

    /// Answer `url` with an empty body and the given status.
    pub fn with_status(self, url: &str, status: StatusCode) -> Self {
        self.set_reply(url, status, "text/plain", Vec::new());
        self
    }

    /// Make fetches of `url` fail at the transport level.
    pub fn with_failure(self, url: &str) -> Self {
        self.fail(url);
        self
    }

    pub fn set_reply(&self, url: &str, status: StatusCode, content_type: &str, body: impl Into<Vec<u8>>) {
        let reply = Reply { status, content_type: content_type.to_string(), body: body.into() };
        self.lock_replies().insert(url.to_string(), reply);
    }

    pub fn fail(&self, url: &str) {
        self.failing.lock().unwrap_or_else(|e| e.into_inner()).insert(url.to_string());
    }

    pub fn recover(&self, url: &str) {
        self.failing.lock().unwrap_or_else(|e| e.into_inner()).remove(url);
    }

    /// Fail every fetch while set.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// All fetches so far, in order.
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Number of fetches of one URL.
    pub fn calls_to(&self, url: &str) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|call| call.url == url)
            .count()
    }

    fn lock_replies(&self) -> std::sync::MutexGuard<'_, HashMap<String, Reply>> {
        self.replies.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait::async_trait]
impl Network for MockNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let url = request.url.as_str().to_string();
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).push(MockCall {
            method: request.method.as_str().to_string(),
            url: url.clone(),
            cache: request.cache,
        });

        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Network(format!("{url}: network unreachable")));
        }
        if self.failing.lock().unwrap_or_else(|e| e.into_inner()).contains(&url) {
            return Err(Error::Network(format!("{url}: connection reset")));
        }

        let reply = self.lock_replies().get(&url).cloned();
        let Some(reply) = reply else {
            return Ok(Response::new(StatusCode::NOT_FOUND, HeaderMap::new(), Vec::new()));
        };

        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(&reply.content_type) {
            headers.insert(header::CONTENT_TYPE, value);
        }
        Ok(Response::new(reply.status, headers, reply.body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn get(url: &str) -> Request {
        Request::get(Url::parse(url).unwrap())
    }

    #[tokio::test]
    async fn test_scripted_reply() {
        let network = MockNetwork::new().with_body("https://example.com/a.css", "text/css", "a{}");
        let response = network.fetch(&get("https://example.com/a.css")).await.unwrap();
        assert!(response.ok());
        assert_eq!(response.content_type(), Some("text/css"));
        assert_eq!(network.calls_to("https://example.com/a.css"), 1);
    }

    #[tokio::test]
    async fn test_unknown_url_is_404() {
        let network = MockNetwork::new();
        let response = network.fetch(&get("https://example.com/missing")).await.unwrap();
        assert_eq!(response.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let network = MockNetwork::new()
            .with_body("https://example.com/a.css", "text/css", "a{}")
            .with_failure("https://example.com/a.css");
        assert!(network.fetch(&get("https://example.com/a.css")).await.is_err());

        network.recover("https://example.com/a.css");
        assert!(network.fetch(&get("https://example.com/a.css")).await.is_ok());

        network.set_offline(true);
        assert!(network.fetch(&get("https://example.com/a.css")).await.is_err());
        assert_eq!(network.call_count(), 3);
    }
}
