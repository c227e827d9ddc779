//! offline_message tool implementation.
//!
//! Posts a control message (`SKIP_WAITING`, `UPDATE_CACHE`) to the cache
//! manager.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_client::Registration;
use shellcache_core::Error;

use super::json_result;

/// Input parameters for offline_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OfflineMessageParams {
    /// Message type: "SKIP_WAITING" or "UPDATE_CACHE". Other types are ignored.
    #[serde(rename = "type")]
    pub message_type: String,
}

/// Implementation of the offline_message tool.
pub async fn message_impl(
    registration: &Registration, params: OfflineMessageParams,
) -> Result<CallToolResult, McpError> {
    if params.message_type.trim().is_empty() {
        return Err(Error::InvalidInput("type cannot be empty".into()).into());
    }

    let data = serde_json::json!({ "type": params.message_type.trim() });
    let outcome = registration.post_message(&data).await?;
    json_result(&outcome)
}
