//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::tools::{
    NotificationClickParams, OfflineFetchParams, OfflineMessageParams, OfflineRegisterParams, OfflineSyncParams,
    cache::{CacheMatchParams, match_impl},
    offline_fetch::fetch_impl,
    offline_message::message_impl,
    offline_notification_click::click_impl,
    offline_push::push_impl,
    offline_register::register_impl,
    offline_status::status_impl,
    offline_sync::sync_impl,
};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use shellcache_client::{PushPayload, Registration};

/// The main MCP server handler for shellcache.
#[derive(Clone)]
pub struct ShellcacheServer {
    registration: Arc<Registration>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl ShellcacheServer {
    /// Create a new server handler around a registration.
    pub fn new(registration: Arc<Registration>) -> Self {
        Self { registration, tool_router: Self::tool_router() }
    }

    #[tool(
        description = "Send a request through the offline cache manager. Returns the route taken, where the response came from (network, cache, shell, placeholder, offline), status, and body for textual content."
    )]
    async fn offline_fetch(&self, params: Parameters<OfflineFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.registration, params.0).await
    }

    #[tool(description = "Post a control message: SKIP_WAITING activates a waiting version, UPDATE_CACHE re-fetches the primary manifest.")]
    async fn offline_message(&self, params: Parameters<OfflineMessageParams>) -> Result<CallToolResult, McpError> {
        message_impl(&self.registration, params.0).await
    }

    /// Install a cache version.
    ///
    /// The primary manifest must cache completely or the version is discarded;
    /// demo files are cached best-effort. Stale caches are pruned on activation.
    #[tool(description = "Install a cache version and activate it. Returns install and activation reports.")]
    async fn offline_register(&self, params: Parameters<OfflineRegisterParams>) -> Result<CallToolResult, McpError> {
        register_impl(&self.registration, params.0).await
    }

    #[tool(description = "Show active and waiting versions and every cache with its entry count.")]
    async fn offline_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.registration).await
    }

    #[tool(description = "Build the notification shown for a push payload {title, body}.")]
    async fn offline_push(&self, params: Parameters<PushPayload>) -> Result<CallToolResult, McpError> {
        push_impl(&self.registration, params.0)
    }

    #[tool(description = "Handle a notification click. The 'view' action opens the site root; anything else just closes.")]
    async fn offline_notification_click(
        &self, params: Parameters<NotificationClickParams>,
    ) -> Result<CallToolResult, McpError> {
        click_impl(&self.registration, params.0)
    }

    #[tool(description = "Deliver a background sync event. Only the 'background-sync' tag is handled.")]
    async fn offline_sync(&self, params: Parameters<OfflineSyncParams>) -> Result<CallToolResult, McpError> {
        sync_impl(&self.registration, params.0)
    }

    #[tool(description = "Look up the cached entry for a URL across all caches. Returns entry metadata and the cache holding it.")]
    async fn cache_match(&self, params: Parameters<CacheMatchParams>) -> Result<CallToolResult, McpError> {
        match_impl(&self.registration, params.0).await
    }
}

impl ServerHandler for ShellcacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "shellcache".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
