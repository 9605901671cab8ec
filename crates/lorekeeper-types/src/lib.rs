//! Shared domain types for Lorekeeper.
//!
//! This crate contains the types used across the retrieval-augmented chat
//! service: chat sessions and messages, retrieved documents, completion
//! requests and stream events, configuration, and the error taxonomy.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod chat;
pub mod config;
pub mod document;
pub mod error;
pub mod lang;
pub mod llm;
pub mod pipeline;
