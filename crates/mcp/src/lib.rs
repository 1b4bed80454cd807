//! MCP (Model Context Protocol) client for Stepwise.
//!
//! Speaks JSON-RPC 2.0 over the SSE transport: server messages arrive on a
//! long-lived event stream, client messages are POSTed to the endpoint the
//! server announces. [`McpConnector`] implements
//! `stepwise_core::ToolSessionConnector`, so the reasoning loop gets a fresh
//! session per run and releases it by dropping it.

pub mod convert;
pub mod jsonrpc;
pub mod session;
pub mod sse;
pub mod transport;

pub use convert::{McpToolDefinition, to_function_tool};
pub use session::{McpConnector, McpSession};
pub use transport::{McpTransport, SseTransport};
