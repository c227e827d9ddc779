//! offline_status tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use shellcache_client::Registration;

use super::json_result;

/// Active and waiting versions plus every cache with its entry count.
pub async fn status_impl(registration: &Registration) -> Result<CallToolResult, McpError> {
    let status = registration.status().await?;
    json_result(&status)
}
