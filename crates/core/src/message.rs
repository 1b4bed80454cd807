//! Chat message value objects exchanged with the model caller.
//!
//! The reasoning loop never keeps a running conversation: every model call is
//! built from scratch out of the rendered step plan, so these types are plain
//! values with no history attached.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user (or the loop speaking on their behalf)
    User,
    /// The model
    Assistant,
    /// System instructions (the planning prompt)
    System,
}

/// A single chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: String,

    /// Who sent this message
    pub role: Role,

    /// The text content
    pub content: String,

    /// Tool calls requested by the assistant (if any)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<MessageToolCall>,

    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl Message {
    fn with_role(role: Role, content: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content,
            tool_calls: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content.into())
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, content.into())
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content.into())
    }

    /// An assistant message carrying a tool-call batch.
    pub fn assistant_tool_calls(tool_calls: Vec<MessageToolCall>) -> Self {
        let mut msg = Self::with_role(Role::Assistant, String::new());
        msg.tool_calls = tool_calls;
        msg
    }
}

/// A tool call embedded in an assistant message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageToolCall {
    /// Provider-assigned ID for this call
    pub id: String,

    /// Name of the tool to invoke
    pub name: String,

    /// Arguments as a JSON string, exactly as the model produced them
    pub arguments: String,
}

impl MessageToolCall {
    /// Parse the raw argument string into a JSON object.
    ///
    /// A blank string means "no arguments". Anything that is not a JSON
    /// object is rejected.
    pub fn parse_arguments(
        &self,
    ) -> std::result::Result<serde_json::Map<String, serde_json::Value>, String> {
        let raw = self.arguments.trim();
        if raw.is_empty() {
            return Ok(serde_json::Map::new());
        }
        match serde_json::from_str::<serde_json::Value>(raw) {
            Ok(serde_json::Value::Object(map)) => Ok(map),
            Ok(other) => Err(format!("expected a JSON object, got {other}")),
            Err(e) => Err(e.to_string()),
        }
    }
}
