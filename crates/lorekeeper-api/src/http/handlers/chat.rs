//! Chat endpoints.
//!
//! - POST /api/rag/chat        - blocking, returns `{answer, docs}`
//! - POST /api/rag/chat/stream - Server-Sent Events
//!
//! SSE event types (each `data` is the JSON event with its `type` tag):
//! - `docs`  - retrieved provenance, emitted once before any token
//! - `token` - incremental answer text: `{ "content": "..." }`
//! - `done`  - answer generated and stored
//! - `error` - generation or storage failed; replaces `done`

use std::convert::Infallible;
use std::time::Duration;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::StreamExt;
use serde::Deserialize;
use tokio_stream::Stream;

use lorekeeper_types::chat::SessionId;
use lorekeeper_types::config::PipelineConfig;
use lorekeeper_types::error::RagError;
use lorekeeper_types::pipeline::{PipelineAnswer, PipelineEvent, PipelineRequest};

use crate::http::error::{AppError, require};
use crate::state::AppState;

/// Request body shared by both chat endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ChatRequest {
    pub session_id: Option<String>,
    pub query: Option<String>,
    pub lang: Option<String>,
    pub rag_limit: Option<usize>,
    pub history_limit: Option<usize>,
    pub source_table: Option<String>,
}

impl ChatRequest {
    /// Check required fields and fill the rest from `defaults`.
    pub fn into_pipeline(self, defaults: &PipelineConfig) -> Result<PipelineRequest, AppError> {
        let session_id = require(self.session_id, "session_id")?;
        let query = require(self.query, "query")?;
        let session_id = SessionId::new(session_id).map_err(RagError::Validation)?;

        Ok(PipelineRequest {
            session_id,
            query,
            lang: self.lang.unwrap_or_else(|| defaults.default_lang.clone()),
            rag_limit: self.rag_limit.unwrap_or(defaults.rag_limit),
            history_limit: self.history_limit.unwrap_or(defaults.history_limit),
            source_table: self.source_table.filter(|t| !t.trim().is_empty()),
        })
    }
}

/// POST /api/rag/chat
pub async fn chat(
    State(state): State<AppState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<PipelineAnswer>, AppError> {
    let Json(body) = body?;
    let request = body.into_pipeline(&state.defaults)?;
    let answer = state.orchestrator.run(&request).await?;
    Ok(Json(answer))
}

/// POST /api/rag/chat/stream
///
/// Validation, history, and retrieval failures are returned as plain HTTP
/// errors before the event stream opens.
pub async fn stream_chat(
    State(state): State<AppState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let Json(body) = body?;
    let request = body.into_pipeline(&state.defaults)?;
    let events = state.orchestrator.run_stream(request).await?;

    let sse_stream = events.map(|event| Ok::<_, Infallible>(sse_event(&event)));
    Ok(Sse::new(sse_stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))))
}

fn sse_event(event: &PipelineEvent) -> Event {
    match Event::default().event(event.name()).json_data(event) {
        Ok(sse) => sse,
        Err(e) => {
            tracing::error!(event = event.name(), error = %e, "Failed to encode SSE event");
            Event::default()
                .event("error")
                .data(r#"{"type":"error","message":"event encoding failed"}"#)
        }
    }
}
