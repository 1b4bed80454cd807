//! Tool session traits: the abstraction over the remote capability provider.
//!
//! A session is exclusively owned by one run. Releasing it means dropping
//! it; implementations tear down their transport in `Drop`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::ToolError;
use crate::provider::ToolDefinition;

/// Raw result of a tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolOutput(pub serde_json::Value);

impl ToolOutput {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    /// Shorthand for an MCP-style single text block.
    pub fn text(text: impl Into<String>) -> Self {
        Self(serde_json::json!({
            "content": [{"type": "text", "text": text.into()}]
        }))
    }

    /// Whether the server flagged the result as an error.
    pub fn is_error(&self) -> bool {
        self.0.get("isError").and_then(|v| v.as_bool()).unwrap_or(false)
    }

    /// Text used when the output is placed into a prompt.
    ///
    /// Text content blocks are joined with newlines; anything else is
    /// rendered as compact JSON.
    pub fn to_prompt_text(&self) -> String {
        if let Some(s) = self.0.as_str() {
            return s.to_string();
        }
        if let Some(blocks) = self.0.get("content").and_then(|c| c.as_array()) {
            let texts: Vec<&str> = blocks
                .iter()
                .filter(|b| b.get("type").and_then(|t| t.as_str()) == Some("text"))
                .filter_map(|b| b.get("text").and_then(|t| t.as_str()))
                .collect();
            if !texts.is_empty() {
                return texts.join("\n");
            }
        }
        self.0.to_string()
    }
}

impl std::fmt::Display for ToolOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_prompt_text())
    }
}

/// A connected capability session.
#[async_trait]
pub trait ToolSession: Send {
    /// Tools the remote side currently offers.
    async fn list_tools(&mut self) -> Result<Vec<ToolDefinition>, ToolError>;

    /// Invoke a tool by name.
    async fn call_tool(
        &mut self,
        name: &str,
        arguments: serde_json::Map<String, serde_json::Value>,
    ) -> Result<ToolOutput, ToolError>;
}

/// Acquires a fresh session for one run.
#[async_trait]
pub trait ToolSessionConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn ToolSession>, ToolError>;
}
