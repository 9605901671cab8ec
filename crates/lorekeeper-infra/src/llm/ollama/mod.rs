//! Ollama chat provider.
//!
//! - `client`: [`OllamaChatProvider`] implementing `LlmProvider`
//! - `streaming`: newline-delimited JSON decoding of streamed answers
//! - `types`: request/response wire structs

pub mod client;
pub mod streaming;
pub mod types;

pub use client::OllamaChatProvider;
