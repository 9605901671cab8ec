//! Process-wide storage handles.
//!
//! `StorePool` is opened once by the entry point and cloned into every
//! component that needs storage. Clones share connections.

use lorekeeper_types::config::AppConfig;
use lorekeeper_types::error::RepositoryError;

use crate::sqlite::chat::SqliteChatRepository;
use crate::sqlite::pool::DatabasePool;
use crate::vector::document::LanceDocumentIndex;
use crate::vector::lance::LanceVectorStore;

/// Relational and vector store handles.
#[derive(Clone)]
pub struct StorePool {
    pub database: DatabasePool,
    pub vectors: LanceVectorStore,
    pub documents: LanceDocumentIndex,
}

impl StorePool {
    /// Connect both stores. Fails fast if either is unreachable.
    pub async fn open(config: &AppConfig) -> Result<Self, RepositoryError> {
        let database = DatabasePool::connect(&config.database)
            .await
            .map_err(|e| RepositoryError::Connection(format!("chat database: {e}")))?;

        let vectors = match LanceVectorStore::open(&config.vector.path).await {
            Ok(vectors) => vectors,
            Err(e) => {
                database.close().await;
                return Err(RepositoryError::Connection(format!("vector store: {e}")));
            }
        };

        let documents = match LanceDocumentIndex::open(&vectors, &config.vector).await {
            Ok(documents) => documents,
            Err(e) => {
                database.close().await;
                return Err(e);
            }
        };

        tracing::info!(
            database = %config.database.url,
            vector_path = %config.vector.path,
            table = %config.vector.table,
            "Stores opened"
        );

        Ok(Self {
            database,
            vectors,
            documents,
        })
    }

    pub fn chat_repository(&self) -> SqliteChatRepository {
        SqliteChatRepository::new(self.database.clone())
    }

    /// Release pooled connections. LanceDB holds no pooled sockets and is
    /// released when the last clone drops.
    pub async fn close(&self) {
        self.database.close().await;
        tracing::info!("Stores closed");
    }
}
