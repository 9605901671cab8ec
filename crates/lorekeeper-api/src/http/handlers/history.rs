//! Chat history endpoints.
//!
//! - POST /api/rag/messages                - append one message
//! - GET  /api/rag/sessions/{id}/messages  - recent messages, oldest first

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use serde::Deserialize;

use lorekeeper_core::chat::history::parse_role;
use lorekeeper_core::pipeline::orchestrator::MAX_HISTORY_LIMIT;
use lorekeeper_types::chat::{ChatMessage, SavedMessage, SessionId, SourceDoc};
use lorekeeper_types::error::RagError;

use crate::http::error::{AppError, require};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SaveMessageRequest {
    pub session_id: Option<String>,
    pub role: Option<String>,
    pub content: Option<String>,
    pub lang: Option<String>,
    pub source_docs: Option<Vec<SourceDoc>>,
}

#[derive(Debug, Deserialize)]
pub struct MessageListQuery {
    pub limit: Option<usize>,
}

fn session_id(raw: String) -> Result<SessionId, AppError> {
    Ok(SessionId::new(raw).map_err(RagError::Validation)?)
}

/// POST /api/rag/messages
pub async fn save_message(
    State(state): State<AppState>,
    body: Result<Json<SaveMessageRequest>, JsonRejection>,
) -> Result<Json<SavedMessage>, AppError> {
    let Json(body) = body?;
    let session = session_id(require(body.session_id, "session_id")?)?;
    let role = parse_role(&require(body.role, "role")?)?;
    let content = require(body.content, "content")?;
    let lang = body
        .lang
        .unwrap_or_else(|| state.defaults.default_lang.clone());

    let saved = state
        .orchestrator
        .history()
        .save(
            &session,
            role,
            &content,
            &lang,
            body.source_docs.unwrap_or_default(),
        )
        .await?;
    Ok(Json(saved))
}

/// GET /api/rag/sessions/{id}/messages?limit=
pub async fn list_messages(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<MessageListQuery>,
) -> Result<Json<Vec<ChatMessage>>, AppError> {
    let session = session_id(id)?;
    let limit = query.limit.unwrap_or(state.defaults.history_limit);
    if limit > MAX_HISTORY_LIMIT {
        return Err(
            RagError::Validation(format!("limit must be at most {MAX_HISTORY_LIMIT}")).into(),
        );
    }

    let messages = state.orchestrator.history().messages(&session, limit).await?;
    Ok(Json(messages))
}
