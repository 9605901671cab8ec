//! Semantic document retrieval.
//!
//! - `Embedder` / `BoxEmbedder`: query text to vector
//! - `DocumentIndex`: nearest-neighbor port implemented by lorekeeper-infra
//! - `VectorRetriever`: embeds, searches, and ranks

pub mod box_embedder;
pub mod embedder;
pub mod index;
pub mod retriever;
