//! Ollama embedding client.
//!
//! Implements the `Embedder` trait from `lorekeeper-core` against
//! `POST {base_url}/api/embed`. Every returned vector is checked against the
//! configured dimension before it leaves this module.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use lorekeeper_core::retrieval::embedder::Embedder;
use lorekeeper_types::config::EmbeddingConfig;
use lorekeeper_types::error::EmbeddingError;

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Option<Vec<Vec<f32>>>,
}

/// HTTP embedder for an Ollama-compatible `/api/embed` endpoint.
pub struct OllamaEmbedder {
    client: reqwest::Client,
    url: String,
    model: String,
    dimension: usize,
    api_token: Option<SecretString>,
}

impl OllamaEmbedder {
    pub fn new(config: &EmbeddingConfig, dimension: usize) -> Result<Self, EmbeddingError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EmbeddingError::Request(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: format!("{}/api/embed", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            dimension,
            api_token: config
                .api_token
                .as_ref()
                .map(|t| SecretString::from(t.clone())),
        })
    }
}

/// Validate the decoded body against the request.
fn parse_embeddings(
    body: EmbedResponse,
    expected_count: usize,
    dimension: usize,
) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    let embeddings = body
        .embeddings
        .ok_or_else(|| EmbeddingError::Malformed("missing embeddings array".to_string()))?;

    if embeddings.len() != expected_count {
        return Err(EmbeddingError::Malformed(format!(
            "expected {expected_count} embeddings, got {}",
            embeddings.len()
        )));
    }
    if let Some(bad) = embeddings.iter().find(|v| v.len() != dimension) {
        return Err(EmbeddingError::Dimension {
            expected: dimension,
            actual: bad.len(),
        });
    }
    Ok(embeddings)
}

impl Embedder for OllamaEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });

        let mut request = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .json(&body);
        if let Some(token) = &self.api_token {
            request = request.header("Authorization", format!("Bearer {}", token.expose_secret()));
        }

        let response = request.send().await.map_err(|e| {
            EmbeddingError::Request(format!("is the embedding service running at {}? {e}", self.url))
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, body = %error_body, "Embedding API error response");
            return Err(EmbeddingError::Status {
                status: status.as_u16(),
                body: error_body,
            });
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::Malformed(e.to_string()))?;

        parse_embeddings(parsed, texts.len(), self.dimension)
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
