//! cache_match tool implementation.
//!
//! Finds the stored entry for a request across all caches, oldest cache first.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_client::Registration;
use shellcache_core::{EntrySummary, Error, compute_request_key};

use crate::tools::json_result;

/// Parameters for the cache_match tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheMatchParams {
    /// Absolute URL, or a path resolved against the site origin.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default)]
    pub method: Option<String>,
}

/// Output from the cache_match tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheMatchOutput {
    /// Hex request key the entry is stored under.
    pub key: String,
    pub entry: EntrySummary,
}

/// Implementation of the cache_match tool.
pub async fn match_impl(registration: &Registration, params: CacheMatchParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }

    let url = registration.resolve_url(params.url.trim())?;
    let method = params.method.as_deref().unwrap_or("GET");
    let key = compute_request_key(method, url.as_str());

    let entry = registration
        .db()
        .match_any(&key)
        .await?
        .ok_or_else(|| Error::CacheMiss(format!("{method} {url}")))?;

    json_result(&CacheMatchOutput { key, entry: entry.summary() })
}
