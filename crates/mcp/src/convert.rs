//! MCP tool definitions and their translation to model-facing records.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use stepwise_core::error::ToolError;
use stepwise_core::provider::ToolDefinition;
use stepwise_core::tool::CapabilityDescriptor;

/// A tool as advertised by `tools/list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpToolDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "inputSchema", default)]
    pub input_schema: Value,
}

/// Result payload of `tools/list`.
#[derive(Debug, Clone, Deserialize)]
pub struct ListToolsResult {
    #[serde(default)]
    pub tools: Vec<McpToolDefinition>,
    #[serde(rename = "nextCursor", default)]
    pub next_cursor: Option<String>,
}

impl McpToolDefinition {
    pub fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone().unwrap_or_default(),
            parameters: if self.input_schema.is_null() {
                serde_json::json!({"type": "object", "properties": {}})
            } else {
                self.input_schema.clone()
            },
        }
    }

    pub fn to_descriptor(&self) -> Result<CapabilityDescriptor, ToolError> {
        CapabilityDescriptor::from_definition(&self.to_definition())
    }
}

/// OpenAI function-tool shape: `{type: "function", function: {...}}`.
pub fn to_function_tool(def: &ToolDefinition) -> Value {
    serde_json::json!({
        "type": "function",
        "function": {
            "name": def.name,
            "description": def.description,
            "parameters": def.parameters,
        }
    })
}
