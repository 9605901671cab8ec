//! Vector-indexed document store port.

use lorekeeper_types::document::RagDocument;
use lorekeeper_types::error::RepositoryError;

/// One nearest-neighbor lookup.
#[derive(Debug, Clone)]
pub struct VectorQuery<'a> {
    pub vector: &'a [f32],
    /// Required filter.
    pub lang: &'a str,
    pub source_table: Option<&'a str>,
    pub limit: usize,
}

/// Approximate nearest-neighbor search over stored documents.
///
/// Implementations rank by ascending cosine distance and report
/// `similarity = 1 - distance`. Any index tuning (probe counts and the like)
/// must apply to the single query only.
pub trait DocumentIndex: Send + Sync {
    fn nearest(
        &self,
        query: &VectorQuery<'_>,
    ) -> impl std::future::Future<Output = Result<Vec<RagDocument>, RepositoryError>> + Send;
}
