//! Completion-service provider implementations.
//!
//! Concrete implementations of the [`LlmProvider`] trait defined in
//! `lorekeeper-core`, plus [`create_provider`] which builds the configured
//! provider behind a [`BoxLlmProvider`].
//!
//! [`LlmProvider`]: lorekeeper_core::llm::provider::LlmProvider

pub mod ollama;

use lorekeeper_core::llm::box_provider::BoxLlmProvider;
use lorekeeper_types::config::LlmConfig;
use lorekeeper_types::llm::LlmError;

use self::ollama::OllamaChatProvider;

/// Create a [`BoxLlmProvider`] from the `[llm]` configuration section.
pub fn create_provider(config: &LlmConfig) -> Result<BoxLlmProvider, LlmError> {
    if config.base_url.trim().is_empty() {
        return Err(LlmError::InvalidRequest("llm.base_url is empty".to_string()));
    }
    let provider = OllamaChatProvider::new(config)?;
    tracing::info!(base_url = %config.base_url, model = %config.model, "Chat provider ready");
    Ok(BoxLlmProvider::new(provider))
}
