use std::fmt;

use thiserror::Error;

use crate::llm::LlmError;

/// Errors from repository operations (used by trait definitions in lorekeeper-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error: {0}")]
    Connection(String),

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("timed out after {0}s")]
    Timeout(u64),
}

/// Errors from the embedding service.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding request failed: {0}")]
    Request(String),

    #[error("embedding service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed embedding response: {0}")]
    Malformed(String),

    #[error("unexpected embedding shape: expected dimension {expected}, got {actual}")]
    Dimension { expected: usize, actual: usize },
}

/// Pipeline step, used to tag log lines and failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Validate,
    HistoryFetch,
    PersistUser,
    Retrieve,
    BuildContext,
    Generate,
    PersistAssistant,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Validate => "validate",
            PipelineStage::HistoryFetch => "history_fetch",
            PipelineStage::PersistUser => "persist_user",
            PipelineStage::Retrieve => "retrieve",
            PipelineStage::BuildContext => "build_context",
            PipelineStage::Generate => "generate",
            PipelineStage::PersistAssistant => "persist_assistant",
        };
        f.write_str(name)
    }
}

/// Failure taxonomy of the chat pipeline.
///
/// `Validation` is a client fault; every other variant is a server fault.
#[derive(Debug, Error)]
pub enum RagError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("retrieval error: {0}")]
    Retrieval(String),

    #[error("generation error: {0}")]
    Generation(#[from] LlmError),

    #[error("persistence error: {0}")]
    Persistence(String),
}

impl RagError {
    pub fn is_client_fault(&self) -> bool {
        matches!(self, RagError::Validation(_))
    }
}

impl From<EmbeddingError> for RagError {
    fn from(e: EmbeddingError) -> Self {
        RagError::Retrieval(e.to_string())
    }
}
