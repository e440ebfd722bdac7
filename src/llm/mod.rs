//! LLM integration for customer replies.
//!
//! Uses rig-core's OpenAI client in chat-completions mode, so any
//! OpenAI-compatible endpoint works. The provider is optional: with no API
//! key configured, replies use a fixed template.

pub mod provider;
pub mod reply;
mod rig_adapter;

pub use provider::*;
pub use reply::ReplyGenerator;
pub use rig_adapter::RigAdapter;

use std::sync::Arc;

use rig::client::CompletionClient;
use secrecy::{ExposeSecret, SecretString};

use crate::config::LlmConfig;
use crate::error::LlmError;

/// Create an LLM provider from configuration, or `None` when no key is set.
pub fn create_provider(config: &LlmConfig) -> Result<Option<Arc<dyn LlmProvider>>, LlmError> {
    match &config.api_key {
        Some(api_key) => create_openai_provider(api_key, config).map(Some),
        None => Ok(None),
    }
}

fn create_openai_provider(
    api_key: &SecretString,
    config: &LlmConfig,
) -> Result<Arc<dyn LlmProvider>, LlmError> {
    use rig::providers::openai;

    let client: rig::client::Client<openai::client::OpenAICompletionsExt> =
        openai::Client::builder()
            .api_key(api_key.expose_secret())
            .base_url(&config.base_url)
            .build()
            .map_err(|e| LlmError::RequestFailed {
                provider: "openai".to_string(),
                reason: format!("Failed to create OpenAI client: {}", e),
            })?
            .completions_api();

    let model = client.completion_model(&config.model);
    tracing::info!(
        "Using OpenAI-compatible endpoint {} (model: {})",
        config.base_url,
        config.model
    );
    Ok(Arc::new(RigAdapter::new(model, &config.model)))
}
