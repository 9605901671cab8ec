//! Chat session and message types for Lorekeeper.
//!
//! A session is an append-only, ordered log of user questions and assistant
//! answers. Sessions are created implicitly by their first message and are
//! never deleted by the chat pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;

pub use crate::llm::MessageRole;

/// Opaque chat session key supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Wrap a caller-supplied key. Blank keys are rejected.
    pub fn new(raw: impl Into<String>) -> Result<Self, String> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err("session_id must not be empty".to_string());
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A chat session row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: SessionId,
    pub created_at: DateTime<Utc>,
    /// Bumped on every message append.
    pub updated_at: DateTime<Utc>,
}

/// Provenance of one retrieved document, as persisted on assistant messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDoc {
    pub source_table: String,
    pub source_id: String,
    pub similarity: f64,
}

/// A persisted message within a session.
///
/// Messages of a session are totally ordered by `created_at`; `id` is a
/// UUIDv7 and breaks ties between writes that share a timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub session_id: SessionId,
    pub role: MessageRole,
    pub content: String,
    pub lang: String,
    /// Empty for user messages.
    pub source_docs: Vec<SourceDoc>,
    pub created_at: DateTime<Utc>,
}

/// Descriptor returned after a message has been written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedMessage {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
}
