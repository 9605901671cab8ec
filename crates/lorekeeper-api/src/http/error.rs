//! Application error type mapping to HTTP status codes.
//!
//! Every error body is `{"detail": "<message>"}`.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use lorekeeper_types::error::RagError;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// A required body field was absent.
    MissingParameter(&'static str),
    /// The body could not be decoded.
    BadBody(String),
    /// Pipeline, retrieval, or history failure.
    Rag(RagError),
}

impl From<RagError> for AppError {
    fn from(e: RagError) -> Self {
        AppError::Rag(e)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadBody(rejection.body_text())
    }
}

impl AppError {
    fn status_and_detail(&self) -> (StatusCode, String) {
        match self {
            AppError::MissingParameter(field) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("missing required parameter: {field}"),
            ),
            AppError::BadBody(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Rag(e) if e.is_client_fault() => (StatusCode::BAD_REQUEST, e.to_string()),
            AppError::Rag(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, detail) = self.status_and_detail();
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

/// Unwrap a required request field.
pub fn require<T>(value: Option<T>, field: &'static str) -> Result<T, AppError> {
    value.ok_or(AppError::MissingParameter(field))
}
