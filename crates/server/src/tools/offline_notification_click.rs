//! offline_notification_click tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_client::Registration;

use super::json_result;

/// Input parameters for offline_notification_click tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NotificationClickParams {
    /// The clicked action ("view", "dismiss"), or empty for the body.
    #[serde(default)]
    pub action: String,
}

/// Implementation of the offline_notification_click tool.
pub fn click_impl(registration: &Registration, params: NotificationClickParams) -> Result<CallToolResult, McpError> {
    json_result(&registration.notification_click(&params.action))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{output, registration, site};

    #[tokio::test]
    async fn test_view_opens_root() {
        let reg = registration(site()).await;
        let value = output(&click_impl(&reg, NotificationClickParams { action: "view".into() }).unwrap());
        assert_eq!(value["closed"], true);
        assert_eq!(value["open_window"], "/");
    }

    #[tokio::test]
    async fn test_dismiss_only_closes() {
        let reg = registration(site()).await;
        let value = output(&click_impl(&reg, NotificationClickParams { action: "dismiss".into() }).unwrap());
        assert!(value["open_window"].is_null());
    }
}
