//! Retrieval-augmented chat pipeline for Lorekeeper.
//!
//! This crate defines the "ports" (repository, index, embedder, and provider
//! traits) that the infrastructure layer implements, plus the logic built on
//! them. It depends only on `lorekeeper-types` -- never on
//! `lorekeeper-infra` or any database/IO crate.

pub mod chat;
pub mod llm;
pub mod pipeline;
pub mod prompt;
pub mod retrieval;

#[cfg(test)]
pub(crate) mod testing;
