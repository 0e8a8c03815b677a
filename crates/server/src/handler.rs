//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the offline proxy.
use std::sync::Arc;

use cours_offline_client::OfflineProxy;
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

use crate::tools::{
    FetchParams, MessageParams, NotificationClickParams, PushParams, SyncParams, control, fetch, status,
};

/// The MCP server handler exposing the offline proxy.
#[derive(Clone)]
pub struct OfflineProxyServer {
    proxy: Arc<OfflineProxy>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl OfflineProxyServer {
    pub fn new(proxy: Arc<OfflineProxy>) -> Self {
        Self { proxy, tool_router: Self::tool_router() }
    }

    #[tool(
        description = "Send a request from the application through the offline proxy. Returns the response and whether it came from the network, a cache generation or the offline placeholder."
    )]
    async fn proxy_fetch(&self, params: Parameters<FetchParams>) -> Result<CallToolResult, McpError> {
        fetch::fetch_impl(&self.proxy, params.0).await
    }

    #[tool(description = "Post a control message: {\"type\": \"SKIP_WAITING\"} or {\"type\": \"CACHE_UPDATE\"}.")]
    async fn proxy_message(&self, params: Parameters<MessageParams>) -> Result<CallToolResult, McpError> {
        control::message_impl(&self.proxy, params.0).await
    }

    #[tool(description = "Deliver a push payload. Raises a notification when the payload carries a title.")]
    async fn proxy_push(&self, params: Parameters<PushParams>) -> Result<CallToolResult, McpError> {
        control::push_impl(&self.proxy, params.0).await
    }

    #[tool(description = "Report a click on a notification action. \"explore\" opens the application.")]
    async fn notification_click(
        &self, params: Parameters<NotificationClickParams>,
    ) -> Result<CallToolResult, McpError> {
        control::notification_click_impl(&self.proxy, params.0).await
    }

    #[tool(description = "Deliver a background sync event for a tag.")]
    async fn proxy_sync(&self, params: Parameters<SyncParams>) -> Result<CallToolResult, McpError> {
        control::sync_impl(&self.proxy, params.0).await
    }

    #[tool(description = "List cache generations with their entry counts.")]
    async fn cache_list(&self) -> Result<CallToolResult, McpError> {
        status::cache_list_impl(&self.proxy).await
    }

    #[tool(description = "Show the installing, waiting and active proxy instances.")]
    async fn proxy_status(&self) -> Result<CallToolResult, McpError> {
        status::status_impl(&self.proxy).await
    }
}

impl ServerHandler for OfflineProxyServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "cours-offline".into(),
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::proxy;

    #[tokio::test]
    async fn test_lists_every_tool() {
        let server = OfflineProxyServer::new(proxy("http://127.0.0.1:9", &[]).await);

        let mut names: Vec<String> = server.tool_router.list_all().into_iter().map(|t| t.name.to_string()).collect();
        names.sort();

        assert_eq!(
            names,
            vec![
                "cache_list",
                "notification_click",
                "proxy_fetch",
                "proxy_message",
                "proxy_push",
                "proxy_status",
                "proxy_sync"
            ]
        );
    }
}
