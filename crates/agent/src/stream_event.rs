//! Progress events emitted by a reasoning run.
//!
//! `ProgressEvent` serializes as tagged JSON for structured delivery and
//! renders to the human-readable lines used by the plain-text stream and the
//! CLI.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Events emitted by the reasoning loop, in order:
/// - `plan`: the rendered plan after planning
/// - `step`: a round begins with the current step
/// - `tool_call`: the model requested a tool; emitted before invocation
/// - `finalizing`: no next step is left
/// - `final_answer`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    Plan { rendered: String },

    /// `round` is 1-based.
    Step { round: usize, step: Option<String> },

    /// `arguments` is the raw JSON string the model produced.
    ToolCall { name: String, arguments: String },

    Finalizing,

    FinalAnswer { answer: String },
}

impl ProgressEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Plan { .. } => "plan",
            Self::Step { .. } => "step",
            Self::ToolCall { .. } => "tool_call",
            Self::Finalizing => "finalizing",
            Self::FinalAnswer { .. } => "final_answer",
        }
    }
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plan { rendered } => write!(
                f,
                "----------当前计划----------\n{rendered}\n---------------------------"
            ),
            Self::Step { step, .. } => write!(
                f,
                "---------------------------\n{}",
                step.as_deref().unwrap_or("（无）")
            ),
            Self::ToolCall { name, arguments } => {
                write!(f, "调用工具: {name}, 参数: {arguments}")
            }
            Self::Finalizing => f.write_str("没有下一步了，直接输出结果"),
            Self::FinalAnswer { answer } => write!(f, "最终答案：{answer}"),
        }
    }
}
