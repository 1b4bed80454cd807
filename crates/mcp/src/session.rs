//! MCP client session: handshake, cached tool listing, guarded invocation.

use async_trait::async_trait;
use reqwest::Url;
use serde_json::{Map, Value, json};
use std::time::Duration;
use stepwise_config::McpConfig;
use stepwise_core::error::ToolError;
use stepwise_core::provider::ToolDefinition;
use stepwise_core::session::{ToolOutput, ToolSession, ToolSessionConnector};
use tracing::{debug, info, warn};

use crate::convert::ListToolsResult;
use crate::transport::{McpTransport, SseTransport};

pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// A connected MCP session over any transport.
///
/// Dropping the session drops the transport, which closes the connection.
pub struct McpSession<T: McpTransport> {
    transport: T,
    tools: Option<Vec<ToolDefinition>>,
    server_name: Option<String>,
}

impl<T: McpTransport> McpSession<T> {
    /// Perform the `initialize` / `notifications/initialized` handshake.
    pub async fn initialize(transport: T) -> Result<Self, ToolError> {
        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {
                "name": "stepwise",
                "version": env!("CARGO_PKG_VERSION"),
            }
        });
        let result = transport.request("initialize", Some(params)).await?;
        let server_name = result["serverInfo"]["name"].as_str().map(str::to_string);
        transport.notify("notifications/initialized", None).await?;

        info!(
            server = server_name.as_deref().unwrap_or("unknown"),
            protocol = result["protocolVersion"].as_str().unwrap_or(PROTOCOL_VERSION),
            "MCP session initialized"
        );

        Ok(Self {
            transport,
            tools: None,
            server_name,
        })
    }

    pub fn server_name(&self) -> Option<&str> {
        self.server_name.as_deref()
    }

    fn ensure_ready(&self) -> Result<(), ToolError> {
        if self.transport.is_alive() {
            Ok(())
        } else {
            Err(ToolError::SessionNotReady)
        }
    }

    async fn fetch_tools(&self) -> Result<Vec<ToolDefinition>, ToolError> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let params = cursor.as_ref().map(|c| json!({"cursor": c}));
            let result = self.transport.request("tools/list", params).await?;
            let page: ListToolsResult = serde_json::from_value(result)
                .map_err(|e| ToolError::Protocol(format!("invalid tools/list result: {e}")))?;
            tools.extend(page.tools.iter().map(|t| t.to_definition()));
            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => break,
            }
        }
        debug!(count = tools.len(), "MCP tools listed");
        Ok(tools)
    }
}

#[async_trait]
impl<T: McpTransport + 'static> ToolSession for McpSession<T> {
    async fn list_tools(&mut self) -> Result<Vec<ToolDefinition>, ToolError> {
        self.ensure_ready()?;
        if let Some(tools) = &self.tools {
            return Ok(tools.clone());
        }
        let tools = self.fetch_tools().await?;
        self.tools = Some(tools.clone());
        Ok(tools)
    }

    async fn call_tool(
        &mut self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<ToolOutput, ToolError> {
        self.ensure_ready()?;
        let advertised = self.list_tools().await?;
        if !advertised.iter().any(|t| t.name == name) {
            return Err(ToolError::NotRegistered(name.to_string()));
        }

        debug!(tool = name, "MCP tools/call");
        let result = self
            .transport
            .request("tools/call", Some(json!({"name": name, "arguments": arguments})))
            .await
            .map_err(|e| match e {
                ToolError::Protocol(reason) => ToolError::ExecutionFailed {
                    tool_name: name.to_string(),
                    reason,
                },
                other => other,
            })?;
        let output = ToolOutput::new(result);
        if output.is_error() {
            warn!(tool = name, output = %output, "MCP tool reported an error");
        }
        Ok(output)
    }
}

/// Connects a fresh SSE session per run.
pub struct McpConnector {
    url: Url,
    timeout: Duration,
}

impl McpConnector {
    /// Build from configuration; the API key becomes the `key` query parameter.
    pub fn from_config(config: &McpConfig) -> Result<Self, ToolError> {
        let mut url = Url::parse(&config.sse_url)
            .map_err(|e| ToolError::Transport(format!("invalid MCP SSE URL '{}': {e}", config.sse_url)))?;
        if let Some(key) = &config.api_key {
            url.query_pairs_mut().append_pair("key", key);
        }
        Ok(Self {
            url,
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }

    /// Connect and return the concrete session type.
    pub async fn connect_sse(&self) -> Result<McpSession<SseTransport>, ToolError> {
        debug!(host = self.url.host_str().unwrap_or(""), path = self.url.path(), "Connecting to MCP server");
        let transport = SseTransport::connect(self.url.clone(), self.timeout).await?;
        McpSession::initialize(transport).await
    }
}

#[async_trait]
impl ToolSessionConnector for McpConnector {
    async fn connect(&self) -> Result<Box<dyn ToolSession>, ToolError> {
        Ok(Box::new(self.connect_sse().await?))
    }
}
