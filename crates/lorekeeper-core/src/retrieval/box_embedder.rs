//! Type-erased embedding backend shared by retrieval and ingestion.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use lorekeeper_types::error::EmbeddingError;

use super::embedder::Embedder;

type EmbedFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<Vec<f32>>, EmbeddingError>> + Send + 'a>>;

trait ErasedEmbedder: Send + Sync {
    fn embed_erased<'a>(&'a self, texts: &'a [String]) -> EmbedFuture<'a>;
    fn model(&self) -> &str;
    fn width(&self) -> usize;
}

impl<E: Embedder> ErasedEmbedder for E {
    fn embed_erased<'a>(&'a self, texts: &'a [String]) -> EmbedFuture<'a> {
        Box::pin(self.embed(texts))
    }

    fn model(&self) -> &str {
        self.model_name()
    }

    fn width(&self) -> usize {
        self.dimension()
    }
}

/// The embedding model documents and queries are projected with.
pub struct BoxEmbedder {
    backend: Box<dyn ErasedEmbedder>,
}

impl BoxEmbedder {
    pub fn new<E: Embedder + 'static>(embedder: E) -> Self {
        Self {
            backend: Box::new(embedder),
        }
    }

    /// One vector per input text, in input order.
    pub async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.backend.embed_erased(texts).await
    }

    pub fn model_name(&self) -> &str {
        self.backend.model()
    }

    pub fn dimension(&self) -> usize {
        self.backend.width()
    }
}

impl fmt::Debug for BoxEmbedder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoxEmbedder")
            .field("model", &self.model_name())
            .field("dimension", &self.dimension())
            .finish()
    }
}
