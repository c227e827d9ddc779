//! offline_sync tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_client::Registration;

use super::json_result;

/// Input parameters for offline_sync tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OfflineSyncParams {
    /// Sync tag; only "background-sync" is handled.
    pub tag: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OfflineSyncOutput {
    pub tag: String,
    pub handled: bool,
}

/// Implementation of the offline_sync tool.
pub fn sync_impl(registration: &Registration, params: OfflineSyncParams) -> Result<CallToolResult, McpError> {
    let handled = registration.sync(&params.tag);
    json_result(&OfflineSyncOutput { tag: params.tag, handled })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{output, registration, site};

    #[tokio::test]
    async fn test_sync_tags() {
        let reg = registration(site()).await;
        let value = output(&sync_impl(&reg, OfflineSyncParams { tag: "background-sync".into() }).unwrap());
        assert_eq!(value["handled"], true);

        let value = output(&sync_impl(&reg, OfflineSyncParams { tag: "periodic".into() }).unwrap());
        assert_eq!(value["handled"], false);
    }
}
