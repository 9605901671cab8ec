//! Infrastructure layer for Lorekeeper.
//!
//! Implementations of the ports defined in `lorekeeper-core`: SQLite chat
//! history, the LanceDB document index, Ollama embedding and chat clients,
//! plus the config loader and batch ingestion.

pub mod config;
pub mod ingest;
pub mod llm;
pub mod sqlite;
pub mod store;
pub mod vector;

#[cfg(test)]
mod testing;
