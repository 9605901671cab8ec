//! OllamaChatProvider -- concrete [`LlmProvider`] for the Ollama chat API.
//!
//! Non-streaming requests are bounded by the configured timeout end to end.
//! Streaming requests bound each read instead, so a long answer that keeps
//! producing tokens is never cut off.

use std::time::Duration;

use lorekeeper_core::llm::provider::{EventStream, LlmProvider};
use lorekeeper_types::config::LlmConfig;
use lorekeeper_types::llm::{CompletionRequest, CompletionResponse, LlmError};

use super::streaming::decode_chat_stream;
use super::types::{OllamaChatChunk, OllamaChatRequest};

/// Ollama `/api/chat` provider.
pub struct OllamaChatProvider {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl OllamaChatProvider {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .read_timeout(timeout)
            .build()
            .map_err(|e| LlmError::Provider {
                message: format!("failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    fn url(&self) -> String {
        format!("{}/api/chat", self.base_url)
    }
}

/// Map a transport failure, keeping timeouts distinguishable.
fn request_error(e: reqwest::Error, timeout: Duration) -> LlmError {
    if e.is_timeout() {
        LlmError::Timeout(timeout.as_secs())
    } else {
        LlmError::Provider {
            message: format!("HTTP request failed: {e}"),
        }
    }
}

async fn send(
    request: reqwest::RequestBuilder,
    timeout: Duration,
) -> Result<reqwest::Response, LlmError> {
    let response = request
        .send()
        .await
        .map_err(|e| request_error(e, timeout))?;

    let status = response.status();
    if !status.is_success() {
        let error_body = response.text().await.unwrap_or_default();
        tracing::warn!(status = %status, body = %error_body, "Ollama chat API error response");
        return Err(LlmError::Provider {
            message: format!("HTTP {status}: {error_body}"),
        });
    }
    Ok(response)
}

impl LlmProvider for OllamaChatProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let mut body = OllamaChatRequest::from(request);
        body.stream = false;
        let url = self.url();

        tracing::debug!(url = %url, model = %body.model, messages = body.messages.len(), "Ollama chat request");

        let response = send(
            self.client.post(&url).timeout(self.timeout).json(&body),
            self.timeout,
        )
        .await?;

        let chunk: OllamaChatChunk = response.json().await.map_err(|e| {
            LlmError::Deserialization(format!("failed to parse response: {e}"))
        })?;

        if let Some(message) = chunk.error {
            return Err(LlmError::Provider { message });
        }

        Ok(CompletionResponse {
            content: chunk.content().to_string(),
            usage: chunk.usage(),
            model: if chunk.model.is_empty() {
                body.model
            } else {
                chunk.model
            },
        })
    }

    fn stream(&self, request: CompletionRequest) -> EventStream {
        let mut body = OllamaChatRequest::from(&request);
        body.stream = true;
        let builder = self.client.post(self.url()).json(&body);
        let timeout = self.timeout;

        Box::pin(async_stream::try_stream! {
            let response = send(builder, timeout).await?;
            let mut events = decode_chat_stream(response.bytes_stream());
            while let Some(event) = futures_util::StreamExt::next(&mut events).await {
                yield event?;
            }
        })
    }
}

// OllamaChatProvider intentionally does NOT derive Debug.
