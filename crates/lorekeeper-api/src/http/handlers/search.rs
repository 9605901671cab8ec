//! POST /api/rag/search - semantic document search without generation.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use serde::Deserialize;

use lorekeeper_core::pipeline::orchestrator::MAX_RAG_LIMIT;
use lorekeeper_types::document::RagDocument;
use lorekeeper_types::error::RagError;

use crate::http::error::{AppError, require};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SearchRequest {
    pub query: Option<String>,
    pub lang: Option<String>,
    pub limit: Option<usize>,
    pub source_table: Option<String>,
}

pub async fn search(
    State(state): State<AppState>,
    body: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<Vec<RagDocument>>, AppError> {
    let Json(body) = body?;
    let query = require(body.query, "query")?;
    if query.trim().is_empty() {
        return Err(RagError::Validation("query must not be empty".to_string()).into());
    }
    let limit = body.limit.unwrap_or(state.defaults.rag_limit);
    if limit == 0 || limit > MAX_RAG_LIMIT {
        return Err(
            RagError::Validation(format!("limit must be between 1 and {MAX_RAG_LIMIT}")).into(),
        );
    }
    let lang = body
        .lang
        .unwrap_or_else(|| state.defaults.default_lang.clone());
    let source_table = body.source_table.filter(|t| !t.trim().is_empty());

    let docs = state
        .orchestrator
        .retriever()
        .search(&query, &lang, limit, source_table.as_deref())
        .await?;
    Ok(Json(docs))
}
