//! Inspection tools: cache_list and proxy_status.

use cours_offline_client::{GenerationInfo, OfflineProxy};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::Serialize;

use super::json_result;

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct CacheListOutput {
    /// Generations in creation order.
    pub generations: Vec<GenerationInfo>,
    pub total_entries: u64,
}

/// Implementation of the cache_list tool.
pub async fn cache_list_impl(proxy: &OfflineProxy) -> Result<CallToolResult, McpError> {
    let generations = proxy.generations().await?;
    let total_entries = generations.iter().map(|g| g.entries).sum();
    json_result(&CacheListOutput { generations, total_entries })
}

/// Implementation of the proxy_status tool.
pub async fn status_impl(proxy: &OfflineProxy) -> Result<CallToolResult, McpError> {
    json_result(&proxy.status().await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{output, proxy};

    #[tokio::test]
    async fn test_cache_list_empty() {
        let proxy = proxy("http://127.0.0.1:9", &[]).await;

        let out = output(&cache_list_impl(&proxy).await.unwrap());

        assert_eq!(out["generations"], serde_json::json!([]));
        assert_eq!(out["total_entries"], 0);
    }

    #[tokio::test]
    async fn test_status_after_start() {
        let proxy = proxy("http://127.0.0.1:9", &[]).await;
        proxy.start().await.unwrap();

        let out = output(&status_impl(&proxy).await.unwrap());

        assert_eq!(out["active"]["state"], "active");
        assert_eq!(out["active"]["versions"]["static_cache"], "static-v1");
        assert!(out["waiting"].is_null());

        let listed = output(&cache_list_impl(&proxy).await.unwrap());
        assert_eq!(listed["generations"][0]["name"], "static-v1");
        assert_eq!(listed["generations"][0]["current"], true);
    }
}
