//! Error types for the Stepwise domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each collaborator (model caller, tool session) has its own error family;
//! the reasoning loop adds the two run-level failures.

use thiserror::Error;

/// The top-level error type for all Stepwise operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Model caller errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Tool session / dispatch errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Run-level failures ---
    #[error("超过最大轮数仍未得到最终答案。(max_rounds = {max_rounds})")]
    RoundBudgetExhausted { max_rounds: usize },

    #[error("Model returned an empty final answer")]
    EmptyAnswer,
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Invalid response from provider: {0}")]
    InvalidResponse(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("工具 '{0}' 未注册或不可用")]
    NotRegistered(String),

    #[error("Tool session not ready")]
    SessionNotReady,

    #[error("Invalid tool arguments for {tool_name}: {reason}")]
    InvalidArguments { tool_name: String, reason: String },

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Tool transport error: {0}")]
    Transport(String),

    #[error("Tool protocol error: {0}")]
    Protocol(String),

    #[error("Tool request timed out: {method} after {timeout_secs}s")]
    Timeout { method: String, timeout_secs: u64 },

    #[error("Invalid capability catalog: {0}")]
    InvalidCatalog(String),
}
