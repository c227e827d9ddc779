//! Intercepted request model.

use reqwest::Method;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_core::compute_request_key;
use url::Url;

/// Why the page issued the request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    /// Loading a new top-level document.
    Navigate,
    SameOrigin,
    NoCors,
    #[default]
    Cors,
}

/// What the response will be used as.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    Document,
    Image,
    Script,
    Style,
    Font,
    Video,
    #[default]
    Empty,
}

/// HTTP cache behavior for the outgoing fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum CacheMode {
    #[default]
    Default,
    /// Bypass any intermediate HTTP cache.
    Reload,
}

/// A request as seen by the cache manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub mode: RequestMode,
    pub destination: Destination,
    pub cache: CacheMode,
}

impl Request {
    /// A plain GET subresource request.
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            mode: RequestMode::default(),
            destination: Destination::default(),
            cache: CacheMode::default(),
        }
    }

    /// A top-level document load.
    pub fn navigate(url: Url) -> Self {
        Self { mode: RequestMode::Navigate, destination: Destination::Document, ..Self::get(url) }
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    /// Same request, fetched past any HTTP cache.
    pub fn reload(mut self) -> Self {
        self.cache = CacheMode::Reload;
        self
    }

    pub fn is_get(&self) -> bool {
        self.method == Method::GET
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }

    /// Storage key for this request.
    pub fn key(&self) -> String {
        compute_request_key(self.method.as_str(), self.url.as_str())
    }
}
