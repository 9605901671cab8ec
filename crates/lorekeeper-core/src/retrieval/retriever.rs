//! VectorRetriever: query text in, ranked documents out.

use std::sync::Arc;

use lorekeeper_types::document::RagDocument;
use lorekeeper_types::error::{EmbeddingError, RagError};
use tracing::info;

use super::box_embedder::BoxEmbedder;
use super::index::{DocumentIndex, VectorQuery};

/// Embeds a query and returns its nearest documents, most similar first.
pub struct VectorRetriever<I: DocumentIndex> {
    embedder: Arc<BoxEmbedder>,
    index: I,
}

impl<I: DocumentIndex> VectorRetriever<I> {
    pub fn new(embedder: Arc<BoxEmbedder>, index: I) -> Self {
        Self { embedder, index }
    }

    pub fn embedder(&self) -> &Arc<BoxEmbedder> {
        &self.embedder
    }

    /// Search documents in `lang`, optionally restricted to one source table.
    ///
    /// Every returned similarity lies in [0, 1] and the sequence is sorted by
    /// non-increasing similarity, truncated to `limit`.
    pub async fn search(
        &self,
        query: &str,
        lang: &str,
        limit: usize,
        source_table: Option<&str>,
    ) -> Result<Vec<RagDocument>, RagError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let vector = self.embed_query(query).await?;
        let mut docs = self
            .index
            .nearest(&VectorQuery {
                vector: &vector,
                lang,
                source_table,
                limit,
            })
            .await
            .map_err(|e| RagError::Retrieval(e.to_string()))?;

        for doc in &mut docs {
            doc.similarity = doc.similarity.clamp(0.0, 1.0);
        }
        docs.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        docs.truncate(limit);

        info!(
            query_len = query.chars().count(),
            lang,
            source_table = source_table.unwrap_or("*"),
            results = docs.len(),
            "Vector search completed"
        );
        Ok(docs)
    }

    async fn embed_query(&self, query: &str) -> Result<Vec<f32>, EmbeddingError> {
        let vectors = self.embedder.embed(&[query.to_string()]).await?;
        let expected = self.embedder.dimension();
        let vector = vectors
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::Malformed("no embedding returned".to_string()))?;
        if vector.len() != expected {
            return Err(EmbeddingError::Dimension {
                expected,
                actual: vector.len(),
            });
        }
        Ok(vector)
    }
}
