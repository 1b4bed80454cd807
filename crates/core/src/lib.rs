//! # Stepwise Core
//!
//! Domain types, traits, and error definitions for the Stepwise
//! plan-execute-observe agent.
//! This crate has **zero framework dependencies**. It defines the domain model
//! that all other crates implement against.
//!
//! The two collaborators of the reasoning loop are traits here:
//! - [`Provider`]: the language model caller
//! - [`ToolSession`] / [`ToolSessionConnector`]: the remote capability session
//!
//! Implementations live in `stepwise-providers` and `stepwise-mcp`; tests use
//! scripted stand-ins.

pub mod error;
pub mod message;
pub mod provider;
pub mod session;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ProviderError, Result, ToolError};
pub use message::{Message, MessageToolCall, Role};
pub use provider::{FinishReason, ModelReply, Provider, ProviderRequest, ProviderResponse, ToolDefinition, Usage};
pub use session::{ToolOutput, ToolSession, ToolSessionConnector};
pub use tool::{CapabilityCatalog, CapabilityDescriptor, ParameterSchema, PropertySchema};
