//! Control channel tools: proxy_message, proxy_push, notification_click and
//! proxy_sync.
//!
//! Malformed messages and payloads are not errors; the outputs report that
//! nothing happened.

use cours_offline_client::OfflineProxy;
use cours_offline_core::{ControlMessage, Notification};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// Parameters for the proxy_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MessageParams {
    /// Posted message, e.g. `{"type": "SKIP_WAITING"}` or `{"type": "CACHE_UPDATE"}`.
    pub message: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct MessageOutput {
    /// False when the message was malformed and dropped.
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<ControlMessage>,
}

pub async fn message_impl(proxy: &OfflineProxy, params: MessageParams) -> Result<CallToolResult, McpError> {
    let message = proxy.post_message(&params.message).await;
    json_result(&MessageOutput { accepted: message.is_some(), message })
}

/// Parameters for the proxy_push tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PushParams {
    /// Raw push data as delivered by the push service.
    pub data: String,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct PushOutput {
    pub shown: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<Notification>,
}

pub async fn push_impl(proxy: &OfflineProxy, params: PushParams) -> Result<CallToolResult, McpError> {
    let notification = proxy.push(&params.data).await;
    json_result(&PushOutput { shown: notification.is_some(), notification })
}

/// Parameters for the notification_click tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NotificationClickParams {
    /// Title of the clicked notification.
    #[serde(default)]
    pub title: String,
    /// Clicked action: "explore" opens the application, anything else closes.
    pub action: String,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct NotificationClickOutput {
    /// View opened in response to the click.
    pub opened: Option<String>,
}

pub async fn notification_click_impl(
    proxy: &OfflineProxy, params: NotificationClickParams,
) -> Result<CallToolResult, McpError> {
    let opened = proxy.notification_click(&params.title, &params.action).await;
    json_result(&NotificationClickOutput { opened })
}

/// Parameters for the proxy_sync tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SyncParams {
    pub tag: String,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct SyncOutput {
    pub acknowledged: bool,
}

pub async fn sync_impl(proxy: &OfflineProxy, params: SyncParams) -> Result<CallToolResult, McpError> {
    let acknowledged = proxy.sync(&params.tag).await;
    json_result(&SyncOutput { acknowledged })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{output, proxy};
    use serde_json::json;

    const OFFLINE_ORIGIN: &str = "http://127.0.0.1:9";

    #[tokio::test]
    async fn test_message_cache_update() {
        let proxy = proxy(OFFLINE_ORIGIN, &[]).await;
        let params = MessageParams { message: json!({"type": "CACHE_UPDATE"}) };

        let out = output(&message_impl(&proxy, params).await.unwrap());

        assert_eq!(out["accepted"], true);
        assert_eq!(out["message"]["type"], "CACHE_UPDATE");
    }

    #[tokio::test]
    async fn test_message_malformed() {
        let proxy = proxy(OFFLINE_ORIGIN, &[]).await;
        let params = MessageParams { message: json!({"kind": "SKIP_WAITING"}) };

        let out = output(&message_impl(&proxy, params).await.unwrap());

        assert_eq!(out["accepted"], false);
        assert!(out.get("message").is_none());
    }

    #[tokio::test]
    async fn test_push_with_title() {
        let proxy = proxy(OFFLINE_ORIGIN, &[]).await;
        let params = PushParams { data: r#"{"title": "Nouvelle ressource"}"#.into() };

        let out = output(&push_impl(&proxy, params).await.unwrap());

        assert_eq!(out["shown"], true);
        assert_eq!(out["notification"]["title"], "Nouvelle ressource");
        assert_eq!(out["notification"]["badge"], "/icons/badge-72x72.png");
        assert_eq!(out["notification"]["actions"][0]["action"], "explore");
    }

    #[tokio::test]
    async fn test_push_missing_title() {
        let proxy = proxy(OFFLINE_ORIGIN, &[]).await;
        let params = PushParams { data: r#"{"body": "sans titre"}"#.into() };

        let out = output(&push_impl(&proxy, params).await.unwrap());

        assert_eq!(out["shown"], false);
    }

    #[tokio::test]
    async fn test_notification_click_explore() {
        let proxy = proxy(OFFLINE_ORIGIN, &[]).await;
        let params = NotificationClickParams { title: "Nouveau cours".into(), action: "explore".into() };

        let out = output(&notification_click_impl(&proxy, params).await.unwrap());

        assert_eq!(out["opened"], "/");
    }

    #[tokio::test]
    async fn test_sync_other_tag() {
        let proxy = proxy(OFFLINE_ORIGIN, &[]).await;
        let out = output(&sync_impl(&proxy, SyncParams { tag: "periodic".into() }).await.unwrap());
        assert_eq!(out["acknowledged"], false);
    }
}
