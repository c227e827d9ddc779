//! offline_register tool implementation.
//!
//! Installs a cache version and activates it unless it has to wait.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_client::Registration;

use super::json_result;

/// Input parameters for offline_register tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct OfflineRegisterParams {
    /// Cache version to install (default: the configured version).
    #[serde(default)]
    pub version: Option<String>,
}

/// Implementation of the offline_register tool.
pub async fn register_impl(
    registration: &Registration, params: OfflineRegisterParams,
) -> Result<CallToolResult, McpError> {
    let report = registration.register(params.version.as_deref()).await?;
    json_result(&report)
}
