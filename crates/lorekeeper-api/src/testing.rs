//! Test fixtures: real on-disk stores with deterministic model fakes.

use std::sync::Arc;

use lorekeeper_core::llm::box_provider::BoxLlmProvider;
use lorekeeper_core::llm::provider::{EventStream, LlmProvider};
use lorekeeper_core::retrieval::box_embedder::BoxEmbedder;
use lorekeeper_core::retrieval::embedder::Embedder;
use lorekeeper_infra::store::StorePool;
use lorekeeper_types::config::AppConfig;
use lorekeeper_types::document::{Metadata, NewDocument};
use lorekeeper_types::error::EmbeddingError;
use lorekeeper_types::llm::{CompletionRequest, CompletionResponse, LlmError, StreamEvent, Usage};

use crate::state::AppState;

pub(crate) const DIM: usize = 4;

/// Embeds by topic keyword so similarity is predictable.
pub(crate) struct TopicEmbedder;

impl TopicEmbedder {
    fn vector(text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        if lower.contains("boss") {
            vec![1.0, 0.0, 0.0, 0.0]
        } else if lower.contains("map") {
            vec![0.0, 1.0, 0.0, 0.0]
        } else {
            vec![0.0, 0.0, 1.0, 0.0]
        }
    }
}

impl Embedder for TopicEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }

    fn model_name(&self) -> &str {
        "topic"
    }

    fn dimension(&self) -> usize {
        DIM
    }
}

/// Replays fixed answer pieces, optionally failing after `fail_after` pieces.
#[derive(Clone)]
pub(crate) struct ScriptedProvider {
    pub pieces: Vec<&'static str>,
    pub fail_after: Option<usize>,
}

impl ScriptedProvider {
    pub(crate) fn answering(pieces: &[&'static str]) -> Self {
        Self {
            pieces: pieces.to_vec(),
            fail_after: None,
        }
    }

    pub(crate) fn failing_after(pieces: &[&'static str], fail_after: usize) -> Self {
        Self {
            pieces: pieces.to_vec(),
            fail_after: Some(fail_after),
        }
    }
}

impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, _request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        if self.fail_after.is_some() {
            return Err(LlmError::Provider {
                message: "upstream unavailable".to_string(),
            });
        }
        Ok(CompletionResponse {
            content: self.pieces.concat(),
            model: "scripted".to_string(),
            usage: None,
        })
    }

    fn stream(&self, _request: CompletionRequest) -> EventStream {
        let mut events: Vec<Result<StreamEvent, LlmError>> = Vec::new();
        for (i, piece) in self.pieces.iter().enumerate() {
            if self.fail_after == Some(i) {
                break;
            }
            events.push(Ok(StreamEvent::TextDelta {
                text: piece.to_string(),
            }));
        }
        if self.fail_after.is_some() {
            events.push(Err(LlmError::Stream("connection reset".to_string())));
        } else {
            events.push(Ok(StreamEvent::Usage(Usage {
                input_tokens: 12,
                output_tokens: self.pieces.len() as u32,
            })));
            events.push(Ok(StreamEvent::Done));
        }
        Box::pin(futures_util::stream::iter(events))
    }
}

fn doc(source_table: &str, source_id: &str, lang: &str, content: &str) -> NewDocument {
    NewDocument {
        source_table: source_table.to_string(),
        source_id: source_id.to_string(),
        lang: lang.to_string(),
        content: content.to_string(),
        metadata: Metadata::default(),
    }
}

/// Stores in a fresh temp directory, seeded with a handful of documents.
pub(crate) async fn test_state(provider: ScriptedProvider) -> AppState {
    let dir = tempfile::tempdir().unwrap();
    let mut config = AppConfig::default();
    config.database.url = format!(
        "sqlite://{}?mode=rwc",
        dir.path().join("chat.db").display()
    );
    config.database.min_connections = 1;
    config.vector.path = dir.path().join("vectors").display().to_string();
    config.vector.dimension = DIM;

    let store = StorePool::open(&config).await.unwrap();
    // Keep the directory alive for the duration of the test
    std::mem::forget(dir);

    let docs = vec![
        doc("boss_i18n", "killa", "en", "Killa is a boss who spawns on Interchange."),
        doc("boss_i18n", "tagilla", "en", "Tagilla is a boss who spawns on Factory."),
        doc("map_i18n", "customs", "en", "Customs is a map with two dorms."),
        doc("boss_i18n", "killa", "ko", "킬라는 인터체인지의 boss 입니다."),
    ];
    let vectors: Vec<Vec<f32>> = docs.iter().map(|d| TopicEmbedder::vector(&d.content)).collect();
    store.documents.upsert(&docs, &vectors).await.unwrap();

    AppState::assemble(
        store,
        Arc::new(BoxEmbedder::new(TopicEmbedder)),
        Arc::new(BoxLlmProvider::new(provider)),
        &config,
    )
}
