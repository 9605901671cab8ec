//! Batch ingestion of pre-rendered documents into the vector index.
//!
//! Input is JSON Lines, one document per line:
//! `{"source_table", "source_id", "lang", "content", "metadata"}`.
//! Rows that cannot be used (bad JSON, empty content, failed embedding) are
//! logged and skipped; only store write failures abort the run.

use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use lorekeeper_core::retrieval::box_embedder::BoxEmbedder;
use lorekeeper_types::document::{Metadata, NewDocument};
use lorekeeper_types::error::RepositoryError;

use crate::vector::document::LanceDocumentIndex;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error(transparent)]
    Store(#[from] RepositoryError),
}

/// Counts reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub read: usize,
    pub skipped_empty: usize,
    pub invalid: usize,
    pub embed_failed: usize,
    pub written: usize,
}

#[derive(Debug, Deserialize)]
struct RawDocument {
    source_table: String,
    source_id: String,
    lang: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    metadata: serde_json::Value,
}

impl RawDocument {
    fn into_document(self) -> Result<NewDocument, String> {
        Ok(NewDocument {
            metadata: Metadata::from_value(self.metadata)?,
            source_table: self.source_table,
            source_id: self.source_id,
            lang: self.lang,
            content: self.content,
        })
    }
}

/// Parse JSON Lines text into usable documents, tallying rejects in `report`.
pub fn parse_documents(text: &str, report: &mut IngestReport) -> Vec<NewDocument> {
    let mut docs = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        report.read += 1;

        let doc = serde_json::from_str::<RawDocument>(line)
            .map_err(|e| e.to_string())
            .and_then(RawDocument::into_document);
        match doc {
            Ok(doc) if doc.content.trim().is_empty() => {
                tracing::warn!(
                    line = lineno + 1,
                    source_table = %doc.source_table,
                    source_id = %doc.source_id,
                    "Skipping document with empty content"
                );
                report.skipped_empty += 1;
            }
            Ok(doc) => docs.push(doc),
            Err(e) => {
                tracing::warn!(line = lineno + 1, error = %e, "Skipping invalid document line");
                report.invalid += 1;
            }
        }
    }
    docs
}

/// Embeds documents in batches and upserts them into the index.
pub struct Ingestor {
    embedder: Arc<BoxEmbedder>,
    index: LanceDocumentIndex,
    batch_size: usize,
}

impl Ingestor {
    pub fn new(embedder: Arc<BoxEmbedder>, index: LanceDocumentIndex, batch_size: usize) -> Self {
        Self {
            embedder,
            index,
            batch_size: batch_size.max(1),
        }
    }

    pub fn index(&self) -> &LanceDocumentIndex {
        &self.index
    }

    /// Read a JSON Lines file and ingest every usable row.
    pub async fn ingest_file(&self, path: &Path) -> Result<IngestReport, IngestError> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| IngestError::Read {
                path: path.display().to_string(),
                source,
            })?;

        let mut report = IngestReport::default();
        let docs = parse_documents(&text, &mut report);
        self.ingest(docs, &mut report).await?;

        tracing::info!(
            read = report.read,
            written = report.written,
            skipped_empty = report.skipped_empty,
            invalid = report.invalid,
            embed_failed = report.embed_failed,
            "Ingestion finished"
        );
        Ok(report)
    }

    /// Embed and upsert `docs`, updating `report`.
    pub async fn ingest(
        &self,
        docs: Vec<NewDocument>,
        report: &mut IngestReport,
    ) -> Result<(), IngestError> {
        for batch in docs.chunks(self.batch_size) {
            let (kept, vectors) = self.embed_batch(batch, report).await;
            if kept.is_empty() {
                continue;
            }
            report.written += self.index.upsert(&kept, &vectors).await?;
            tracing::debug!(written = report.written, "Batch stored");
        }
        Ok(())
    }

    /// Embed a batch in one request, falling back to one request per
    /// document so a single bad row does not sink its neighbours.
    async fn embed_batch(
        &self,
        batch: &[NewDocument],
        report: &mut IngestReport,
    ) -> (Vec<NewDocument>, Vec<Vec<f32>>) {
        let texts: Vec<String> = batch.iter().map(|d| d.content.clone()).collect();
        match self.embedder.embed(&texts).await {
            Ok(vectors) => return (batch.to_vec(), vectors),
            Err(e) if batch.len() > 1 => {
                tracing::warn!(error = %e, size = batch.len(), "Batch embedding failed, retrying per document");
            }
            Err(e) => {
                tracing::warn!(
                    source_table = %batch[0].source_table,
                    source_id = %batch[0].source_id,
                    error = %e,
                    "Embedding failed, skipping document"
                );
                report.embed_failed += batch.len();
                return (vec![], vec![]);
            }
        }

        let mut kept = Vec::with_capacity(batch.len());
        let mut vectors = Vec::with_capacity(batch.len());
        for doc in batch {
            match self.embedder.embed(std::slice::from_ref(&doc.content)).await {
                Ok(mut v) if v.len() == 1 => {
                    kept.push(doc.clone());
                    vectors.append(&mut v);
                }
                Ok(v) => {
                    tracing::warn!(
                        source_table = %doc.source_table,
                        source_id = %doc.source_id,
                        vectors = v.len(),
                        "Embedding returned wrong vector count, skipping"
                    );
                    report.embed_failed += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        source_table = %doc.source_table,
                        source_id = %doc.source_id,
                        error = %e,
                        "Embedding failed, skipping document"
                    );
                    report.embed_failed += 1;
                }
            }
        }
        (kept, vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::lance::LanceVectorStore;
    use lorekeeper_core::retrieval::embedder::Embedder;
    use lorekeeper_core::retrieval::index::{DocumentIndex, VectorQuery};
    use lorekeeper_types::config::VectorConfig;
    use lorekeeper_types::error::EmbeddingError;

    const DIM: usize = 4;

    /// Deterministic embedder that fails on any text containing "FAIL".
    struct KeywordEmbedder;

    impl Embedder for KeywordEmbedder {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            texts
                .iter()
                .map(|t| {
                    if t.contains("FAIL") {
                        return Err(EmbeddingError::Status {
                            status: 500,
                            body: "boom".to_string(),
                        });
                    }
                    let mut v = vec![0.0; DIM];
                    v[t.len() % DIM] = 1.0;
                    Ok(v)
                })
                .collect()
        }

        fn model_name(&self) -> &str {
            "keyword"
        }

        fn dimension(&self) -> usize {
            DIM
        }
    }

    async fn test_ingestor(batch_size: usize) -> Ingestor {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = LanceVectorStore::open(temp_dir.path()).await.unwrap();
        // Keep the directory alive for the duration of the test
        std::mem::forget(temp_dir);
        let config = VectorConfig {
            dimension: DIM,
            ..VectorConfig::default()
        };
        let index = LanceDocumentIndex::open(&store, &config).await.unwrap();
        Ingestor::new(Arc::new(BoxEmbedder::new(KeywordEmbedder)), index, batch_size)
    }

    #[test]
    fn test_parse_documents_counts_and_normalizes() {
        let text = r#"
{"source_table":"boss_i18n","source_id":"killa","lang":"en","content":"Killa","metadata":{"map":"interchange"}}
{"source_table":"boss_i18n","source_id":"tagilla","lang":"en","content":"Tagilla","metadata":"{\"map\":\"factory\"}"}
{"source_table":"boss_i18n","source_id":"empty","lang":"en","content":"   "}
not json at all
{"source_table":"boss_i18n","source_id":"bad_meta","lang":"en","content":"x","metadata":[1]}
"#;
        let mut report = IngestReport::default();
        let docs = parse_documents(text, &mut report);

        assert_eq!(docs.len(), 2);
        assert_eq!(docs[1].metadata.get("map").unwrap(), "factory");
        assert_eq!(report.read, 5);
        assert_eq!(report.skipped_empty, 1);
        assert_eq!(report.invalid, 2);
    }

    #[tokio::test]
    async fn test_ingest_file_writes_and_is_searchable() {
        let ingestor = test_ingestor(2).await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docs.jsonl");
        tokio::fs::write(
            &path,
            concat!(
                r#"{"source_table":"map_i18n","source_id":"customs","lang":"ko","content":"세관"}"#,
                "\n",
                r#"{"source_table":"map_i18n","source_id":"woods","lang":"ko","content":"삼림 지대 맵"}"#,
                "\n",
                r#"{"source_table":"map_i18n","source_id":"lab","lang":"ko","content":"연구소 맵 정보"}"#,
                "\n"
            ),
        )
        .await
        .unwrap();

        let report = ingestor.ingest_file(&path).await.unwrap();
        assert_eq!(report.read, 3);
        assert_eq!(report.written, 3);
        assert_eq!(ingestor.index().count().await.unwrap(), 3);

        let vector = KeywordEmbedder.embed(&["세관".to_string()]).await.unwrap();
        let hits = ingestor
            .index()
            .nearest(&VectorQuery {
                vector: &vector[0],
                lang: "ko",
                source_table: None,
                limit: 1,
            })
            .await
            .unwrap();
        assert_eq!(hits[0].source_id, "customs");
    }

    #[tokio::test]
    async fn test_failed_rows_are_skipped() {
        let ingestor = test_ingestor(3).await;
        let docs = vec![
            NewDocument {
                source_table: "t".to_string(),
                source_id: "1".to_string(),
                lang: "en".to_string(),
                content: "good".to_string(),
                metadata: Metadata::default(),
            },
            NewDocument {
                source_table: "t".to_string(),
                source_id: "2".to_string(),
                lang: "en".to_string(),
                content: "FAIL here".to_string(),
                metadata: Metadata::default(),
            },
            NewDocument {
                source_table: "t".to_string(),
                source_id: "3".to_string(),
                lang: "en".to_string(),
                content: "also good".to_string(),
                metadata: Metadata::default(),
            },
        ];

        let mut report = IngestReport::default();
        ingestor.ingest(docs, &mut report).await.unwrap();
        assert_eq!(report.embed_failed, 1);
        assert_eq!(report.written, 2);
        assert_eq!(ingestor.index().count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_reingest_replaces_rows() {
        let ingestor = test_ingestor(10).await;
        let doc = NewDocument {
            source_table: "quest_i18n".to_string(),
            source_id: "q1".to_string(),
            lang: "en".to_string(),
            content: "first".to_string(),
            metadata: Metadata::default(),
        };
        let mut report = IngestReport::default();
        ingestor.ingest(vec![doc.clone()], &mut report).await.unwrap();
        ingestor.ingest(vec![doc], &mut report).await.unwrap();
        assert_eq!(ingestor.index().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_missing_file_is_error() {
        let ingestor = test_ingestor(10).await;
        let err = ingestor
            .ingest_file(Path::new("/nonexistent/docs.jsonl"))
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Read { .. }));
    }
}
