//! Vector-indexed document store backed by LanceDB.
//!
//! The Arrow schema defines the single `rag_documents` table; `document`
//! implements the retrieval port and the ingestion write path.

pub mod document;
pub mod embedder;
pub mod lance;
pub mod schema;
