//! Session-scoped message log with role validation and chronological reads.

use chrono::Utc;
use lorekeeper_types::chat::{ChatMessage, MessageRole, SavedMessage, SessionId, SourceDoc};
use lorekeeper_types::error::RagError;
use lorekeeper_types::llm::Message;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::chat::repository::ChatRepository;

/// Parse a caller-supplied role string into a persistable role.
pub fn parse_role(raw: &str) -> Result<MessageRole, RagError> {
    let role: MessageRole = raw.parse().map_err(RagError::Validation)?;
    if !role.is_persistable() {
        return Err(RagError::Validation(format!(
            "role must be 'user' or 'assistant', got '{raw}'"
        )));
    }
    Ok(role)
}

/// Append-only message log for chat sessions.
///
/// Stateless beyond the repository handle; safe to share across requests.
pub struct HistoryStore<R: ChatRepository> {
    repo: R,
}

impl<R: ChatRepository> HistoryStore<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    /// Persist one message and bump the session's `updated_at`.
    ///
    /// Only `user` and `assistant` roles are accepted, and user messages
    /// carry no provenance.
    pub async fn save(
        &self,
        session_id: &SessionId,
        role: MessageRole,
        content: &str,
        lang: &str,
        source_docs: Vec<SourceDoc>,
    ) -> Result<SavedMessage, RagError> {
        if !role.is_persistable() {
            return Err(RagError::Validation(format!(
                "role must be 'user' or 'assistant', got '{role}'"
            )));
        }
        if role == MessageRole::User && !source_docs.is_empty() {
            return Err(RagError::Validation(
                "user messages cannot carry source documents".to_string(),
            ));
        }

        let message = ChatMessage {
            id: Uuid::now_v7(),
            session_id: session_id.clone(),
            role,
            content: content.to_string(),
            lang: lang.to_string(),
            source_docs,
            created_at: Utc::now(),
        };

        self.repo.save_message(&message).await.map_err(|e| {
            warn!(session_id = %session_id, role = %role, error = %e, "Message write failed");
            RagError::Persistence(e.to_string())
        })?;

        debug!(
            session_id = %session_id,
            role = %role,
            message_id = %message.id,
            "Message saved"
        );

        Ok(SavedMessage {
            id: message.id,
            created_at: message.created_at,
        })
    }

    /// The last `limit` turns of a session as prompt messages, oldest first.
    pub async fn get(&self, session_id: &SessionId, limit: usize) -> Result<Vec<Message>, RagError> {
        let messages = self.messages(session_id, limit).await?;
        Ok(messages
            .into_iter()
            .map(|m| Message {
                role: m.role,
                content: m.content,
            })
            .collect())
    }

    /// The last `limit` full message records of a session, oldest first.
    pub async fn messages(
        &self,
        session_id: &SessionId,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, RagError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut messages = self
            .repo
            .recent_messages(session_id, limit)
            .await
            .map_err(|e| RagError::Persistence(e.to_string()))?;
        // The repository hands back newest first.
        messages.reverse();
        Ok(messages)
    }
}
