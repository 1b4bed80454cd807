//! Configuration loading, validation, and management for Stepwise.
//!
//! Loads configuration from `~/.stepwise/config.toml` (or the file named by
//! `STEPWISE_CONFIG`) with environment variable overrides. Validates all
//! settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.stepwise/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application name, reported by the gateway
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Debug mode: verbose logging by default
    #[serde(default)]
    pub debug: bool,

    /// Language model used for planning, tool decisions and answers
    #[serde(default)]
    pub model: ModelConfig,

    /// Remote MCP tool server
    #[serde(default)]
    pub mcp: McpConfig,

    /// Reasoning loop settings
    #[serde(default)]
    pub agent: AgentConfig,

    /// HTTP / WebSocket gateway
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// JWT settings for authenticated endpoints
    #[serde(default)]
    pub auth: AuthConfig,
}

fn default_app_name() -> String {
    "stepwise".into()
}

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("app_name", &self.app_name)
            .field("debug", &self.debug)
            .field("model", &self.model)
            .field("mcp", &self.mcp)
            .field("agent", &self.agent)
            .field("gateway", &self.gateway)
            .field("auth", &self.auth)
            .finish()
    }
}

/// The language model configuration record.
///
/// Handed to the model caller at construction; nothing about the model is
/// global state.
#[derive(Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model id sent with every request
    #[serde(default = "default_model_name")]
    pub name: String,

    /// Human-readable label
    #[serde(default = "default_display_name")]
    pub display_name: String,

    /// OpenAI-compatible base URL (without `/chat/completions`)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Sampling temperature, `[0, 2)`
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Nucleus sampling, `(0, 1]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    /// Presence penalty, `[-2, 2]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// HTTP timeout per model call
    #[serde(default = "default_model_timeout")]
    pub timeout_secs: u64,
}

fn default_model_name() -> String {
    "qwen-turbo".into()
}
fn default_display_name() -> String {
    "通义千问-文本模型".into()
}
fn default_base_url() -> String {
    "https://dashscope.aliyuncs.com/compatible-mode/v1".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_model_timeout() -> u64 {
    120
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model_name(),
            display_name: default_display_name(),
            base_url: default_base_url(),
            api_key: None,
            temperature: default_temperature(),
            top_p: None,
            presence_penalty: None,
            max_tokens: None,
            timeout_secs: default_model_timeout(),
        }
    }
}

impl std::fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelConfig")
            .field("name", &self.name)
            .field("display_name", &self.display_name)
            .field("base_url", &self.base_url)
            .field("api_key", &redact(&self.api_key))
            .field("temperature", &self.temperature)
            .field("top_p", &self.top_p)
            .field("presence_penalty", &self.presence_penalty)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ModelConfig {
    /// Check sampling parameter ranges. Pure; no I/O.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::ValidationError("model.name must not be empty".into()));
        }
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::ValidationError("model.base_url must not be empty".into()));
        }
        if !(0.0..2.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationError(format!(
                "model.temperature must be in [0, 2), got {}",
                self.temperature
            )));
        }
        if let Some(top_p) = self.top_p
            && !(top_p > 0.0 && top_p <= 1.0)
        {
            return Err(ConfigError::ValidationError(format!(
                "model.top_p must be in (0, 1], got {top_p}"
            )));
        }
        if let Some(penalty) = self.presence_penalty
            && !(-2.0..=2.0).contains(&penalty)
        {
            return Err(ConfigError::ValidationError(format!(
                "model.presence_penalty must be in [-2, 2], got {penalty}"
            )));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::ValidationError("model.timeout_secs must be > 0".into()));
        }
        Ok(())
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct McpConfig {
    /// SSE endpoint of the MCP server
    #[serde(default = "default_sse_url")]
    pub sse_url: String,

    /// Appended to the SSE URL as the `key` query parameter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Timeout for connecting and for each JSON-RPC request
    #[serde(default = "default_mcp_timeout")]
    pub timeout_secs: u64,
}

fn default_sse_url() -> String {
    "https://mcp.amap.com/sse".into()
}
fn default_mcp_timeout() -> u64 {
    30
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            sse_url: default_sse_url(),
            api_key: None,
            timeout_secs: default_mcp_timeout(),
        }
    }
}

impl std::fmt::Debug for McpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpConfig")
            .field("sse_url", &self.sse_url)
            .field("api_key", &redact(&self.api_key))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Where the reasoning loop's capability catalog comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogSource {
    /// The compiled-in AMap catalog
    #[default]
    Builtin,
    /// Whatever the MCP server advertises at startup
    Remote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Round budget per run
    #[serde(default = "default_max_rounds")]
    pub max_rounds: usize,

    #[serde(default)]
    pub catalog: CatalogSource,
}

fn default_max_rounds() -> usize {
    6
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_rounds: default_max_rounds(),
            catalog: CatalogSource::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Expose the unauthenticated `/ws/test` echo endpoint
    #[serde(default)]
    pub enable_test_ws: bool,

    /// Largest text frame the `/ws` echo accepts
    #[serde(default = "default_max_ws_message_bytes")]
    pub max_ws_message_bytes: usize,
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    8000
}
fn default_max_ws_message_bytes() -> usize {
    1024
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            enable_test_ws: false,
            max_ws_message_bytes: default_max_ws_message_bytes(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret used to sign and verify JWTs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<String>,

    #[serde(default = "default_algorithm")]
    pub algorithm: String,
}

fn default_algorithm() -> String {
    "HS256".into()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret_key: None,
            algorithm: default_algorithm(),
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret_key", &redact(&self.secret_key))
            .field("algorithm", &self.algorithm)
            .finish()
    }
}

const SUPPORTED_ALGORITHMS: &[&str] = &["HS256", "HS384", "HS512"];

impl AppConfig {
    /// Load configuration from `STEPWISE_CONFIG` or `~/.stepwise/config.toml`,
    /// then apply environment overrides:
    /// - `STEPWISE_MODEL_API_KEY`, then `DASHSCOPE_API_KEY`
    /// - `STEPWISE_MODEL`, `STEPWISE_MODEL_URL`
    /// - `STEPWISE_MCP_KEY`, then `AMAP_KEY`
    /// - `STEPWISE_JWT_SECRET`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = std::env::var("STEPWISE_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| Self::config_path());
        let mut config = Self::load_from(&config_path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup (the process environment in
    /// production).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let first = |keys: &[&str]| keys.iter().find_map(|k| lookup(k).filter(|v| !v.is_empty()));

        if let Some(key) = first(&["STEPWISE_MODEL_API_KEY", "DASHSCOPE_API_KEY"]) {
            self.model.api_key = Some(key);
        }
        if let Some(model) = first(&["STEPWISE_MODEL"]) {
            self.model.name = model;
        }
        if let Some(url) = first(&["STEPWISE_MODEL_URL"]) {
            self.model.base_url = url;
        }
        if let Some(key) = first(&["STEPWISE_MCP_KEY", "AMAP_KEY"]) {
            self.mcp.api_key = Some(key);
        }
        if let Some(secret) = first(&["STEPWISE_JWT_SECRET"]) {
            self.auth.secret_key = Some(secret);
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".stepwise")
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.model.validate()?;

        if self.agent.max_rounds == 0 {
            return Err(ConfigError::ValidationError("agent.max_rounds must be >= 1".into()));
        }

        if self.mcp.timeout_secs == 0 {
            return Err(ConfigError::ValidationError("mcp.timeout_secs must be > 0".into()));
        }

        if self.gateway.max_ws_message_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "gateway.max_ws_message_bytes must be > 0".into(),
            ));
        }

        if !SUPPORTED_ALGORITHMS.contains(&self.auth.algorithm.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "auth.algorithm must be one of {SUPPORTED_ALGORITHMS:?}, got {}",
                self.auth.algorithm
            )));
        }

        Ok(())
    }

    pub fn has_model_key(&self) -> bool {
        self.model.api_key.is_some()
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            debug: false,
            model: ModelConfig::default(),
            mcp: McpConfig::default(),
            agent: AgentConfig::default(),
            gateway: GatewayConfig::default(),
            auth: AuthConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
