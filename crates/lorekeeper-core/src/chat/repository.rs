//! ChatRepository trait definition.
//!
//! Persistence port for the append-only session message log.

use lorekeeper_types::chat::{ChatMessage, SessionId};
use lorekeeper_types::error::RepositoryError;

/// Repository trait for chat session and message persistence.
///
/// Implementations live in lorekeeper-infra (e.g., `SqliteChatRepository`).
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait ChatRepository: Send + Sync {
    /// Append a message and bump the owning session's `updated_at`.
    ///
    /// Creates the session row if it does not exist yet. The message insert
    /// and the session stamp are one transaction: either both land or
    /// neither does.
    fn save_message(
        &self,
        message: &ChatMessage,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// The most recent `limit` messages of a session, newest first.
    fn recent_messages(
        &self,
        session_id: &SessionId,
        limit: usize,
    ) -> impl std::future::Future<Output = Result<Vec<ChatMessage>, RepositoryError>> + Send;
}
