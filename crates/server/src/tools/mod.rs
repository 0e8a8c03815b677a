//! MCP tool implementations.
//!
//! This module contains all tools exposed by the cours-offline server.

pub mod control;
pub mod fetch;
pub mod status;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

use crate::error::ToolError;

pub use control::{MessageParams, NotificationClickParams, PushParams, SyncParams};
pub use fetch::FetchParams;

/// Pretty JSON tool result.
fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output).map_err(|e| ToolError::OutputEncoding(e.to_string()))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
