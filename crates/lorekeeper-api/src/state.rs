//! Application state wiring the pipeline together.
//!
//! AppState holds the shared handles used by both CLI commands and HTTP
//! handlers. The orchestrator is generic over its storage ports; AppState
//! pins it to the SQLite chat repository and the LanceDB document index.

use std::sync::Arc;

use lorekeeper_core::chat::history::HistoryStore;
use lorekeeper_core::llm::box_provider::BoxLlmProvider;
use lorekeeper_core::llm::client::{GenerationSettings, LlmClient};
use lorekeeper_core::pipeline::orchestrator::PipelineOrchestrator;
use lorekeeper_core::prompt::system::SystemPrompts;
use lorekeeper_core::retrieval::box_embedder::BoxEmbedder;
use lorekeeper_core::retrieval::retriever::VectorRetriever;
use lorekeeper_infra::llm::create_provider;
use lorekeeper_infra::sqlite::chat::SqliteChatRepository;
use lorekeeper_infra::store::StorePool;
use lorekeeper_infra::vector::document::LanceDocumentIndex;
use lorekeeper_infra::vector::embedder::OllamaEmbedder;
use lorekeeper_types::config::{AppConfig, PipelineConfig};

/// Orchestrator pinned to the concrete stores.
pub type ConcreteOrchestrator = PipelineOrchestrator<SqliteChatRepository, LanceDocumentIndex>;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<ConcreteOrchestrator>,
    pub embedder: Arc<BoxEmbedder>,
    pub store: StorePool,
    /// Request defaults applied when a caller omits a field.
    pub defaults: PipelineConfig,
}

impl AppState {
    /// Open the stores and build the Ollama-backed clients.
    pub async fn init(config: &AppConfig) -> anyhow::Result<Self> {
        let store = StorePool::open(config).await?;

        let embedder = match OllamaEmbedder::new(&config.embedding, config.vector.dimension) {
            Ok(embedder) => embedder,
            Err(e) => {
                store.close().await;
                return Err(e.into());
            }
        };
        let provider = match create_provider(&config.llm) {
            Ok(provider) => provider,
            Err(e) => {
                store.close().await;
                return Err(e.into());
            }
        };

        Ok(Self::assemble(
            store,
            Arc::new(BoxEmbedder::new(embedder)),
            Arc::new(provider),
            config,
        ))
    }

    /// Wire the pipeline from already-built collaborators.
    pub fn assemble(
        store: StorePool,
        embedder: Arc<BoxEmbedder>,
        provider: Arc<BoxLlmProvider>,
        config: &AppConfig,
    ) -> Self {
        let history = HistoryStore::new(store.chat_repository());
        let retriever = VectorRetriever::new(embedder.clone(), store.documents.clone());
        let llm = LlmClient::new(
            provider,
            GenerationSettings::from_config(&config.llm),
            SystemPrompts::new(config.llm.game_name.clone()),
        );
        let orchestrator =
            PipelineOrchestrator::new(Arc::new(history), Arc::new(retriever), Arc::new(llm));

        Self {
            orchestrator: Arc::new(orchestrator),
            embedder,
            store,
            defaults: config.pipeline.clone(),
        }
    }

    /// Release pooled connections.
    pub async fn shutdown(&self) {
        self.store.close().await;
    }
}
