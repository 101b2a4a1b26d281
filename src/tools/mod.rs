//! Remote Tool Module
//!
//! Interfaces to the remote tool services a pipeline calls.
//!
//! ## Architecture
//!
//! - **ToolClient**: invoke one tool on one remote service
//! - **ToolClientFactory**: hand out a client per service for a request
//! - **ToolService**: per-service record (endpoint, tool name, argument builder, result extractor)
//! - **AccountContext**: credentials presented to every service
//! - **McpHttpClient**: JSON-RPC over HTTP implementation of `ToolClient`

mod account;
mod mcp;
mod service;

pub use account::{AccountContext, AccountError};
pub use mcp::{McpClientFactory, McpHttpClient};
pub use service::{Artifact, ArgumentBuilder, ResultExtractor, ToolService};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Tool call errors
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Server returned status {0}")]
    ServerError(reqwest::StatusCode),
    #[error("Remote error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("Tool reported an error: {0}")]
    ToolFailed(String),
    #[error("Unexpected tool result: {0}")]
    UnexpectedResult(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Tool call timed out after {0:?}")]
    Timeout(Duration),
    #[error("Invalid endpoint {endpoint}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
}

/// One block of tool output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    Text { text: String },
    #[serde(other)]
    Other,
}

/// Raw result of a tool call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_content: Option<Value>,
    #[serde(default)]
    pub is_error: bool,
}

impl ToolResult {
    /// Result carrying a single text block
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::Text { text: text.into() }],
            ..Self::default()
        }
    }

    /// Text of the first text block, if any
    pub fn first_text(&self) -> Option<&str> {
        self.content.iter().find_map(|block| match block {
            ContentBlock::Text { text } => Some(text.as_str()),
            ContentBlock::Other => None,
        })
    }

    /// Structured payload: `structuredContent` when present, else the first
    /// text block parsed as JSON
    pub fn json_payload(&self) -> Result<Value, ToolError> {
        if let Some(value) = &self.structured_content {
            return Ok(value.clone());
        }
        let text = self
            .first_text()
            .ok_or_else(|| ToolError::UnexpectedResult("no text content".to_string()))?;
        Ok(serde_json::from_str(text)?)
    }
}

/// Invokes tools on one remote service
#[async_trait]
pub trait ToolClient: Send + Sync {
    async fn call_tool(&self, tool_name: &str, arguments: Value) -> Result<ToolResult, ToolError>;
}

/// Produces a client per remote service
///
/// `connect` only sets up connection context; it must not call a tool.
#[async_trait]
pub trait ToolClientFactory: Send + Sync {
    async fn connect(
        &self,
        service: &ToolService,
        account: &AccountContext,
    ) -> Result<Arc<dyn ToolClient>, ToolError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_payload_from_text_block() {
        let result = ToolResult::text(r#"{"url":"https://x/img.png"}"#);
        assert_eq!(result.json_payload().unwrap(), json!({"url": "https://x/img.png"}));
    }

    #[test]
    fn test_json_payload_prefers_structured_content() {
        let result = ToolResult {
            content: vec![ContentBlock::Text { text: "not json".to_string() }],
            structured_content: Some(json!({"url": "https://s"})),
            is_error: false,
        };
        assert_eq!(result.json_payload().unwrap()["url"], "https://s");
    }

    #[test]
    fn test_json_payload_without_text() {
        let result = ToolResult::default();
        assert!(matches!(result.json_payload(), Err(ToolError::UnexpectedResult(_))));
    }

    #[test]
    fn test_tool_result_parses_mcp_shape() {
        let raw = json!({
            "content": [
                {"type": "image", "data": "AAAA", "mimeType": "image/png"},
                {"type": "text", "text": "{\"url\":\"https://x\"}"}
            ],
            "isError": false
        });
        let result: ToolResult = serde_json::from_value(raw).unwrap();
        assert_eq!(result.content[0], ContentBlock::Other);
        assert_eq!(result.first_text(), Some("{\"url\":\"https://x\"}"));
        assert!(!result.is_error);
    }
}
