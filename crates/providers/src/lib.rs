//! Model caller implementations for Stepwise.
//!
//! All providers implement the `stepwise_core::Provider` trait.

pub mod openai_compat;

use std::sync::Arc;
use stepwise_core::Provider;
use stepwise_core::error::ProviderError;

pub use openai_compat::OpenAiCompatProvider;

/// Build the configured model caller.
///
/// A missing API key is not an error here: some compatible endpoints (local
/// vLLM, Ollama) accept anything. The endpoint will answer 401 if it cares.
pub fn build_from_config(
    config: &stepwise_config::AppConfig,
) -> Result<Arc<dyn Provider>, ProviderError> {
    if config.model.api_key.is_none() {
        tracing::warn!(
            model = %config.model.name,
            "No model API key configured (set STEPWISE_MODEL_API_KEY or DASHSCOPE_API_KEY)"
        );
    }
    let provider = OpenAiCompatProvider::from_config(&config.model)?
        .with_name(config.model.display_name.clone());
    tracing::info!(
        model = %config.model.name,
        display_name = %config.model.display_name,
        base_url = %config.model.base_url,
        "Model caller ready"
    );
    Ok(Arc::new(provider))
}
