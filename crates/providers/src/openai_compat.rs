//! OpenAI-compatible provider implementation.
//!
//! Works with DashScope's compatible mode (the default), OpenAI, vLLM and
//! any other `/chat/completions` endpoint.
//!
//! Supports:
//! - Chat completions (non-streaming)
//! - Tool use / function calling
//! - Sampling parameters taken from [`ModelConfig`]

use async_trait::async_trait;
use stepwise_config::ModelConfig;
use stepwise_core::error::ProviderError;
use stepwise_core::message::{Message, MessageToolCall, Role};
use stepwise_core::provider::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// An OpenAI-compatible model caller bound to one model configuration.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    config: ModelConfig,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a provider from a model configuration record.
    ///
    /// The record is validated first; an out-of-range sampling parameter is
    /// reported here rather than at the first request.
    pub fn from_config(config: &ModelConfig) -> Result<Self, ProviderError> {
        config
            .validate()
            .map_err(|e| ProviderError::NotConfigured(e.to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            name: "openai-compat".into(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().unwrap_or_default(),
            config: config.clone(),
            client,
        })
    }

    /// Override the provider name reported in logs.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Convert our Message types to OpenAI API format.
    fn to_api_messages(messages: &[Message]) -> Vec<ApiMessage> {
        messages
            .iter()
            .map(|m| ApiMessage {
                role: match m.role {
                    Role::User => "user".into(),
                    Role::Assistant => "assistant".into(),
                    Role::System => "system".into(),
                },
                content: Some(m.content.clone()),
                tool_calls: if m.tool_calls.is_empty() {
                    None
                } else {
                    Some(
                        m.tool_calls
                            .iter()
                            .map(|tc| ApiToolCall {
                                id: tc.id.clone(),
                                r#type: "function".into(),
                                function: ApiFunction {
                                    name: tc.name.clone(),
                                    arguments: tc.arguments.clone(),
                                },
                            })
                            .collect(),
                    )
                },
            })
            .collect()
    }

    /// Convert tool definitions to OpenAI API format.
    fn to_api_tools(tools: &[ToolDefinition]) -> Vec<ApiToolDefinition> {
        tools
            .iter()
            .map(|t| ApiToolDefinition {
                r#type: "function".into(),
                function: ApiToolFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.parameters.clone(),
                },
            })
            .collect()
    }

    /// Build the JSON body for one completion call.
    fn request_body(&self, request: &ProviderRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.config.name,
            "messages": Self::to_api_messages(&request.messages),
            "temperature": self.config.temperature,
            "stream": false,
        });

        if let Some(top_p) = self.config.top_p {
            body["top_p"] = serde_json::json!(top_p);
        }

        if let Some(penalty) = self.config.presence_penalty {
            body["presence_penalty"] = serde_json::json!(penalty);
        }

        if let Some(max_tokens) = request.max_tokens.or(self.config.max_tokens) {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        if !request.tools.is_empty() {
            body["tools"] = serde_json::json!(Self::to_api_tools(&request.tools));
        }

        body
    }

    /// Turn a parsed API response into our response type.
    ///
    /// The last choice is used, matching how single-choice endpoints behave
    /// and tolerating the ones that echo earlier candidates.
    fn parse_response(api_response: ApiResponse) -> Result<ProviderResponse, ProviderError> {
        let choice = api_response
            .choices
            .into_iter()
            .last()
            .ok_or_else(|| ProviderError::InvalidResponse("No choices in response".into()))?;

        let tool_calls: Vec<MessageToolCall> = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| MessageToolCall {
                id: tc.id,
                name: tc.function.name,
                arguments: tc.function.arguments,
            })
            .collect();

        let mut message = Message::assistant(choice.message.content.unwrap_or_default());
        message.tool_calls = tool_calls;

        let usage = api_response.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(ProviderResponse {
            message,
            finish_reason: choice.finish_reason.as_deref().map(FinishReason::parse),
            usage,
            model: api_response.model,
        })
    }
}

#[async_trait]
impl stepwise_core::Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        &self.config.name
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.request_body(&request);

        debug!(
            provider = %self.name,
            model = %self.config.name,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Sending completion request"
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(e.to_string())
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();

        if status == 429 {
            let retry_after_secs = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(5);
            return Err(ProviderError::RateLimited { retry_after_secs });
        }

        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Provider returned error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse response: {e}")))?;

        Self::parse_response(api_response)
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolCall {
    id: String,
    #[serde(default = "default_call_type")]
    r#type: String,
    function: ApiFunction,
}

fn default_call_type() -> String {
    "function".into()
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolDefinition {
    r#type: String,
    function: ApiToolFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    model: String,
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}
