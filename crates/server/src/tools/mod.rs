//! MCP tool implementations.
//!
//! This module contains all tools exposed by the shellcache server.

pub mod cache;
pub mod offline_fetch;
pub mod offline_message;
pub mod offline_notification_click;
pub mod offline_push;
pub mod offline_register;
pub mod offline_status;
pub mod offline_sync;

pub use offline_fetch::OfflineFetchParams;
pub use offline_message::OfflineMessageParams;
pub use offline_notification_click::NotificationClickParams;
pub use offline_register::OfflineRegisterParams;
pub use offline_sync::OfflineSyncParams;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

use crate::error::ServerError;

/// Pretty JSON of `output` as a successful tool result.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output).map_err(|e| ServerError::Serialize(e.to_string()))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
