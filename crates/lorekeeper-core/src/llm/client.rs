//! LlmClient: closed-book prompting over a completion provider.

use std::sync::Arc;

use lorekeeper_types::config::{ContextPlacement, LlmConfig};
use lorekeeper_types::lang::Lang;
use lorekeeper_types::llm::{CompletionRequest, LlmError, Message};
use tracing::info;

use super::box_provider::BoxLlmProvider;
use super::delta::DeltaStream;
use crate::prompt::system::SystemPrompts;

/// Deployment-fixed generation parameters, passed through verbatim.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub model: String,
    pub temperature: f64,
    pub context_window: u32,
    pub placement: ContextPlacement,
}

impl GenerationSettings {
    pub fn from_config(config: &LlmConfig) -> Self {
        Self {
            model: config.model.clone(),
            temperature: config.temperature,
            context_window: config.context_window,
            placement: config.context_placement,
        }
    }
}

/// Builds closed-book requests and runs them blocking or streaming.
pub struct LlmClient {
    provider: Arc<BoxLlmProvider>,
    settings: GenerationSettings,
    prompts: SystemPrompts,
}

impl LlmClient {
    pub fn new(
        provider: Arc<BoxLlmProvider>,
        settings: GenerationSettings,
        prompts: SystemPrompts,
    ) -> Self {
        Self {
            provider,
            settings,
            prompts,
        }
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    /// Assemble the turn list: system prompt, then `messages` in order.
    ///
    /// `messages` is the prior history followed by the current user turn.
    /// A non-empty `context` goes into the system prompt or, with
    /// [`ContextPlacement::BeforeLastTurn`], into its own system turn right
    /// before the last message.
    pub fn build_request(
        &self,
        messages: &[Message],
        context: &str,
        lang: Lang,
        stream: bool,
    ) -> CompletionRequest {
        let mut turns = Vec::with_capacity(messages.len() + 2);
        match self.settings.placement {
            ContextPlacement::System => {
                turns.push(Message::system(self.prompts.with_context(lang, context)));
                turns.extend_from_slice(messages);
            }
            ContextPlacement::BeforeLastTurn => {
                turns.push(Message::system(self.prompts.base(lang)));
                let split = messages.len().saturating_sub(1);
                turns.extend_from_slice(&messages[..split]);
                if !context.is_empty() {
                    turns.push(Message::system(SystemPrompts::context_block(lang, context)));
                }
                turns.extend_from_slice(&messages[split..]);
            }
        }

        CompletionRequest {
            model: self.settings.model.clone(),
            messages: turns,
            temperature: Some(self.settings.temperature),
            context_window: Some(self.settings.context_window),
            stream,
        }
    }

    /// Blocking completion. Returns the full answer text.
    pub async fn chat(
        &self,
        messages: &[Message],
        context: &str,
        lang: Lang,
    ) -> Result<String, LlmError> {
        let request = self.build_request(messages, context, lang, false);
        let response = self.provider.complete(&request).await?;
        info!(
            provider = self.provider.name(),
            model = %response.model,
            tokens = response.usage.map(|u| u.output_tokens),
            "Completion finished"
        );
        Ok(response.content)
    }

    /// Streaming completion. Each call issues a fresh upstream request.
    pub fn chat_stream(&self, messages: &[Message], context: &str, lang: Lang) -> DeltaStream {
        let request = self.build_request(messages, context, lang, true);
        DeltaStream::spawn(self.provider.stream(request))
    }
}
