//! Pipeline request, answer, and streaming event types.

use serde::{Deserialize, Serialize};

use crate::chat::{SessionId, SourceDoc};
use crate::document::RagDocument;

/// One chat turn to run through the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineRequest {
    pub session_id: SessionId,
    pub query: String,
    pub lang: String,
    pub rag_limit: usize,
    pub history_limit: usize,
    pub source_table: Option<String>,
}

/// Result of the blocking pipeline variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineAnswer {
    pub answer: String,
    /// Most similar first.
    pub docs: Vec<RagDocument>,
}

/// Server-to-client event of the streaming pipeline variant.
///
/// A successful stream is exactly one `Docs`, zero or more `Token`, and one
/// `Done`. A failed stream replaces `Done` with a single `Error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    Docs { docs: Vec<SourceDoc> },
    Token { content: String },
    Done,
    Error { message: String },
}

impl PipelineEvent {
    /// SSE event name.
    pub fn name(&self) -> &'static str {
        match self {
            PipelineEvent::Docs { .. } => "docs",
            PipelineEvent::Token { .. } => "token",
            PipelineEvent::Done => "done",
            PipelineEvent::Error { .. } => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineEvent::Done | PipelineEvent::Error { .. })
    }
}
