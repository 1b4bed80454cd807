//! Shared test doubles for the reasoning loop.

use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use stepwise_core::error::{ProviderError, ToolError};
use stepwise_core::message::{Message, MessageToolCall};
use stepwise_core::provider::{
    FinishReason, Provider, ProviderRequest, ProviderResponse, ToolDefinition, Usage,
};
use stepwise_core::session::{ToolOutput, ToolSession, ToolSessionConnector};
use stepwise_core::tool::{CapabilityCatalog, CapabilityDescriptor, ParameterSchema, PropertySchema};

/// A mock provider that returns a sequence of scripted responses and records
/// every request it receives.
///
/// Panics if more calls are made than responses provided.
pub struct SequentialMockProvider {
    responses: Mutex<Vec<Result<ProviderResponse, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl SequentialMockProvider {
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(Ok).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Fails the first call with `error`.
    pub fn failing(error: ProviderError) -> Self {
        Self {
            responses: Mutex::new(vec![Err(error)]),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut requests = self.requests.lock().unwrap();
        let responses = self.responses.lock().unwrap();
        let index = requests.len();
        requests.push(request);

        match responses.get(index) {
            Some(response) => response.clone(),
            None => panic!(
                "SequentialMockProvider: no more responses (call #{}, have {})",
                index,
                responses.len()
            ),
        }
    }
}

/// Create a simple text response (no tool calls).
pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        finish_reason: Some(FinishReason::Stop),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

/// Create a response requesting the given tool calls.
pub fn make_tool_call_response(tool_calls: Vec<MessageToolCall>) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant_tool_calls(tool_calls),
        finish_reason: Some(FinishReason::ToolCalls),
        usage: None,
        model: "mock-model".into(),
    }
}

/// Helper to create a tool call.
pub fn make_tool_call(name: &str, args: Value) -> MessageToolCall {
    MessageToolCall {
        id: format!("call_{name}"),
        name: name.to_string(),
        arguments: serde_json::to_string(&args).unwrap(),
    }
}

/// Two-entry catalog: `maps_weather` and `maps_geo`.
pub fn test_catalog() -> CapabilityCatalog {
    CapabilityCatalog::new(vec![
        CapabilityDescriptor::new(
            "maps_weather",
            "根据城市名称或者标准adcode查询指定城市的天气",
            ParameterSchema::default().require("city", PropertySchema::string("城市名称或者adcode")),
        ),
        CapabilityDescriptor::new(
            "maps_geo",
            "将详细的结构化地址转换为经纬度坐标",
            ParameterSchema::default().require("address", PropertySchema::string("待解析的结构化地址信息")),
        ),
    ])
    .unwrap()
}

type CallLog = Arc<Mutex<Vec<(String, Map<String, Value>)>>>;

/// Hands out [`MockSession`]s sharing one call log.
#[derive(Default)]
pub struct MockConnector {
    calls: CallLog,
    connects: AtomicUsize,
    released: Arc<AtomicBool>,
    refuse: bool,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `connect` fails with a transport error.
    pub fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<(String, Map<String, Value>)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// True once the last session handed out has been dropped.
    pub fn released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ToolSessionConnector for MockConnector {
    async fn connect(&self) -> Result<Box<dyn ToolSession>, ToolError> {
        if self.refuse {
            return Err(ToolError::Transport("connection refused".into()));
        }
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.released.store(false, Ordering::SeqCst);
        Ok(Box::new(MockSession {
            calls: self.calls.clone(),
            released: self.released.clone(),
        }))
    }
}

/// Records calls and answers `"<tool>: <arguments>"`.
pub struct MockSession {
    calls: CallLog,
    released: Arc<AtomicBool>,
}

#[async_trait::async_trait]
impl ToolSession for MockSession {
    async fn list_tools(&mut self) -> Result<Vec<ToolDefinition>, ToolError> {
        Ok(test_catalog().definitions())
    }

    async fn call_tool(
        &mut self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<ToolOutput, ToolError> {
        let text = format!("{name}: {}", Value::Object(arguments.clone()));
        self.calls.lock().unwrap().push((name.to_string(), arguments));
        Ok(ToolOutput::text(text))
    }
}

impl Drop for MockSession {
    fn drop(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }
}
