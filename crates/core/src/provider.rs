//! Provider trait: the abstraction over the language model.
//!
//! A Provider is constructed with its model configuration (model id,
//! sampling parameters, endpoint) and only receives the per-call pieces:
//! messages, the tool catalog and an optional token cap.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::ProviderError;
use crate::message::{Message, MessageToolCall};

/// Per-call request to the model.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// The messages for this call
    pub messages: Vec<Message>,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Tools the model may call
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
}

impl ProviderRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            ..Default::default()
        }
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// A tool definition sent to the model so it knows what it can call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool name
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// JSON Schema describing the tool's parameters
    pub parameters: serde_json::Value,
}

/// Why the model stopped generating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    ToolCalls,
    Length,
    Other(String),
}

impl FinishReason {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "stop" => Self::Stop,
            "tool_calls" | "function_call" => Self::ToolCalls,
            "length" => Self::Length,
            other => Self::Other(other.to_string()),
        }
    }
}

/// A complete response from the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// The generated message
    pub message: Message,

    /// Finish reason reported by the model, when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,

    /// Token usage statistics
    pub usage: Option<Usage>,

    /// Which model actually responded
    pub model: String,
}

impl ProviderResponse {
    /// Collapse the response into the two shapes the reasoning loop acts on.
    ///
    /// Tool calls are dispatched only when the model finished with
    /// `tool_calls`, or reported no finish reason at all. Calls attached to
    /// any other reason (a `length` cut-off, say) are partial and ignored.
    pub fn into_reply(self) -> ModelReply {
        let wants_tools = matches!(self.finish_reason, None | Some(FinishReason::ToolCalls));
        if wants_tools && !self.message.tool_calls.is_empty() {
            ModelReply::ToolCallBatch(self.message.tool_calls)
        } else {
            ModelReply::PlainAnswer(self.message.content)
        }
    }
}

/// What the model wants next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelReply {
    /// A text answer, no tools requested
    PlainAnswer(String),
    /// One or more tool invocations, in the order the model listed them
    ToolCallBatch(Vec<MessageToolCall>),
}

/// Token usage information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// The model caller.
///
/// The reasoning loop calls `complete()` without knowing which backend is
/// behind it; tests plug in scripted implementations.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider.
    fn name(&self) -> &str;

    /// The model id requests are sent to.
    fn model(&self) -> &str;

    /// Send a request and get a complete response.
    async fn complete(&self, request: ProviderRequest) -> std::result::Result<ProviderResponse, ProviderError>;
}
