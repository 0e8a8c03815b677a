//! proxy_fetch tool implementation.
//!
//! Routes one request from the application through the offline proxy.

use std::collections::BTreeMap;

use cours_offline_client::{OfflineProxy, RequestClass, ResponseSource};
use cours_offline_core::Destination;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;
use crate::error::ToolError;

/// Input parameters for the proxy_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FetchParams {
    /// Absolute URL, or a path relative to the application origin.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Request destination: "document", "script", "style", "image", "font"
    /// or empty (default).
    #[serde(default)]
    pub destination: String,

    /// Extra request headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Request body as text.
    #[serde(default)]
    pub body: Option<String>,
}

fn default_method() -> String {
    "GET".into()
}

/// Output structure for the proxy_fetch tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct FetchOutput {
    /// Request URL after resolution against the origin.
    pub url: String,
    /// URL the response was served from.
    pub final_url: String,
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    /// Body decoded as UTF-8, lossy.
    pub body: String,
    pub body_bytes: usize,
    pub source: ResponseSource,
    pub class: RequestClass,
}

/// Implementation of the proxy_fetch tool.
pub async fn fetch_impl(proxy: &OfflineProxy, params: FetchParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(ToolError::InvalidInput("url cannot be empty".into()).into());
    }
    if params.method.trim().is_empty() {
        return Err(ToolError::InvalidInput("method cannot be empty".into()).into());
    }

    let destination: Destination = params.destination.parse().unwrap_or_default();
    let mut request = proxy.request(params.method.trim(), &params.url, destination)?;
    for (name, value) in &params.headers {
        request = request.with_header(name, value);
    }
    if let Some(body) = params.body {
        request = request.with_body(body);
    }

    let served = proxy.fetch(&request).await?;
    let response = served.response;

    let output = FetchOutput {
        url: request.url.to_string(),
        final_url: response.url,
        status: response.status,
        headers: response.headers,
        body: String::from_utf8_lossy(&response.body).into_owned(),
        body_bytes: response.body.len(),
        source: served.source,
        class: served.class,
    };
    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{output, proxy};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn params(url: &str, destination: &str) -> FetchParams {
        FetchParams {
            url: url.into(),
            method: default_method(),
            destination: destination.into(),
            headers: BTreeMap::new(),
            body: None,
        }
    }

    #[tokio::test]
    async fn test_fetch_empty_url() {
        let proxy = proxy("http://127.0.0.1:9", &[]).await;
        let result = fetch_impl(&proxy, params("  ", "")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_fetch_static_asset_served_from_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/app.js"))
            .respond_with(ResponseTemplate::new(200).set_body_string("console.log(1)"))
            .expect(1)
            .mount(&server)
            .await;

        let proxy = proxy(&server.uri(), &["/"]).await;
        proxy.start().await.unwrap();

        let first = output(&fetch_impl(&proxy, params("/app.js", "script")).await.unwrap());
        let second = output(&fetch_impl(&proxy, params("/app.js", "script")).await.unwrap());

        assert_eq!(first["source"], "network");
        assert_eq!(second["source"], "cache");
        assert_eq!(second["class"], "static_asset");
        assert_eq!(second["body"], "console.log(1)");
    }

    #[tokio::test]
    async fn test_fetch_api_error_status_is_a_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/subjects"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let proxy = proxy(&server.uri(), &[]).await;
        let out = output(&fetch_impl(&proxy, params("/api/subjects", "")).await.unwrap());

        assert_eq!(out["status"], 503);
        assert_eq!(out["class"], "api");
    }
}
