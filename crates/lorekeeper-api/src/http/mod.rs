//! HTTP API for Lorekeeper.
//!
//! Axum routes under `/api/rag/` with CORS and request tracing.

pub mod error;
pub mod handlers;
pub mod router;
