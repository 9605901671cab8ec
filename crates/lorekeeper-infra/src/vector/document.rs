//! LanceDB-backed knowledge-base document index.
//!
//! Implements `DocumentIndex` from `lorekeeper-core`. Rows are keyed by
//! `(source_table, source_id, lang)`; re-ingesting a document replaces its
//! row in place.

use std::sync::Arc;
use std::time::Duration;

use arrow_array::{
    Array, ArrayRef, FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator,
    StringArray,
};
use chrono::{SecondsFormat, Utc};
use futures_util::TryStreamExt;
use lancedb::index::Index;
use lancedb::index::vector::IvfPqIndexBuilder;
use lancedb::query::{ExecutableQuery, QueryBase};

use lorekeeper_core::retrieval::index::{DocumentIndex, VectorQuery};
use lorekeeper_types::config::VectorConfig;
use lorekeeper_types::document::{Metadata, NewDocument, RagDocument, similarity_from_distance};
use lorekeeper_types::error::RepositoryError;

use super::lance::LanceVectorStore;
use super::schema::{DOCUMENT_KEY, columns, rag_documents_schema, vector_item_field};

/// Document table handle plus per-query tuning.
#[derive(Clone)]
pub struct LanceDocumentIndex {
    table: lancedb::Table,
    dimension: usize,
    nprobes: usize,
    query_timeout: Duration,
}

impl LanceDocumentIndex {
    /// Open (or create) the configured document table.
    pub async fn open(
        store: &LanceVectorStore,
        config: &VectorConfig,
    ) -> Result<Self, RepositoryError> {
        let dimension = i32::try_from(config.dimension).map_err(|_| {
            RepositoryError::Connection(format!("vector dimension {} too large", config.dimension))
        })?;
        let table = store
            .ensure_table(&config.table, Arc::new(rag_documents_schema(dimension)))
            .await
            .map_err(|e| RepositoryError::Connection(format!("Failed to open document table: {e}")))?;

        Ok(Self {
            table,
            dimension: config.dimension,
            nprobes: config.nprobes,
            query_timeout: Duration::from_secs(config.query_timeout_secs),
        })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Insert or replace documents by their natural key.
    ///
    /// `vectors[i]` is the embedding of `docs[i]`. Returns the number of rows
    /// written.
    pub async fn upsert(
        &self,
        docs: &[NewDocument],
        vectors: &[Vec<f32>],
    ) -> Result<usize, RepositoryError> {
        if docs.len() != vectors.len() {
            return Err(RepositoryError::Query(format!(
                "{} documents but {} vectors",
                docs.len(),
                vectors.len()
            )));
        }
        if docs.is_empty() {
            return Ok(0);
        }

        let batch = self.build_record_batch(docs, vectors)?;
        let schema = batch.schema();
        let reader = RecordBatchIterator::new(vec![Ok(batch)], schema);

        let mut merge = self.table.merge_insert(&DOCUMENT_KEY);
        merge.when_matched_update_all(None).when_not_matched_insert_all();
        merge
            .execute(Box::new(reader))
            .await
            .map_err(|e| RepositoryError::Query(format!("Failed to upsert documents: {e}")))?;

        tracing::debug!(rows = docs.len(), "Upserted documents");
        Ok(docs.len())
    }

    /// Build an IVF-PQ cosine index over the vector column.
    ///
    /// PQ training needs a few hundred rows; on tiny tables LanceDB rejects
    /// the build and the error is returned unchanged.
    pub async fn create_index(&self) -> Result<(), RepositoryError> {
        let builder = IvfPqIndexBuilder::default().distance_type(lancedb::DistanceType::Cosine);
        self.table
            .create_index(&[columns::VECTOR], Index::IvfPq(builder))
            .replace(true)
            .execute()
            .await
            .map_err(|e| RepositoryError::Query(format!("Failed to build vector index: {e}")))?;
        tracing::info!("Vector index built");
        Ok(())
    }

    pub async fn count(&self) -> Result<usize, RepositoryError> {
        self.table
            .count_rows(None)
            .await
            .map_err(|e| RepositoryError::Query(format!("Failed to count documents: {e}")))
    }

    fn build_record_batch(
        &self,
        docs: &[NewDocument],
        vectors: &[Vec<f32>],
    ) -> Result<RecordBatch, RepositoryError> {
        let dimension = i32::try_from(self.dimension)
            .map_err(|_| RepositoryError::Query("vector dimension too large".to_string()))?;
        let mut flat = Vec::with_capacity(vectors.len() * self.dimension);
        for (doc, vector) in docs.iter().zip(vectors) {
            if vector.len() != self.dimension {
                return Err(RepositoryError::Query(format!(
                    "{}/{}: vector has {} dimensions, table expects {}",
                    doc.source_table,
                    doc.source_id,
                    vector.len(),
                    self.dimension
                )));
            }
            flat.extend_from_slice(vector);
        }

        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        let strings = |f: fn(&NewDocument) -> String| -> ArrayRef {
            Arc::new(StringArray::from(docs.iter().map(f).collect::<Vec<_>>()))
        };

        let vector_array = FixedSizeListArray::try_new(
            vector_item_field(),
            dimension,
            Arc::new(Float32Array::from(flat)),
            None,
        )
        .map_err(|e| RepositoryError::Query(format!("Failed to build vector column: {e}")))?;

        RecordBatch::try_new(
            Arc::new(rag_documents_schema(dimension)),
            vec![
                strings(|d| d.source_table.clone()),
                strings(|d| d.source_id.clone()),
                strings(|d| d.lang.clone()),
                strings(|d| d.content.clone()),
                strings(|d| d.metadata.to_stored()),
                Arc::new(StringArray::from(vec![now; docs.len()])),
                Arc::new(vector_array),
            ],
        )
        .map_err(|e| RepositoryError::Query(format!("Failed to build record batch: {e}")))
    }

    async fn search(&self, query: &VectorQuery<'_>) -> Result<Vec<RagDocument>, RepositoryError> {
        let results = self
            .table
            .vector_search(query.vector)
            .map_err(|e| RepositoryError::Query(format!("Vector search setup failed: {e}")))?
            .distance_type(lancedb::DistanceType::Cosine)
            .nprobes(self.nprobes)
            .only_if(filter_expression(query.lang, query.source_table))
            .limit(query.limit)
            .execute()
            .await
            .map_err(|e| RepositoryError::Query(format!("Vector search failed: {e}")))?;

        let batches: Vec<RecordBatch> = results
            .try_collect()
            .await
            .map_err(|e| RepositoryError::Query(format!("Failed to collect results: {e}")))?;

        let mut docs = Vec::new();
        for batch in &batches {
            docs.extend(record_batch_to_documents(batch)?);
        }
        Ok(docs)
    }
}

impl DocumentIndex for LanceDocumentIndex {
    async fn nearest(&self, query: &VectorQuery<'_>) -> Result<Vec<RagDocument>, RepositoryError> {
        if query.limit == 0 {
            return Ok(vec![]);
        }
        match tokio::time::timeout(self.query_timeout, self.search(query)).await {
            Ok(result) => result,
            Err(_) => Err(RepositoryError::Timeout(self.query_timeout.as_secs())),
        }
    }
}

/// SQL string literal with embedded quotes doubled.
fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Prefilter applied before ranking.
fn filter_expression(lang: &str, source_table: Option<&str>) -> String {
    let mut filter = format!("{} = {}", columns::LANG, quote(lang));
    if let Some(table) = source_table {
        filter.push_str(&format!(" AND {} = {}", columns::SOURCE_TABLE, quote(table)));
    }
    filter
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray, RepositoryError> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| RepositoryError::Query(format!("missing or non-string column {name}")))
}

fn record_batch_to_documents(batch: &RecordBatch) -> Result<Vec<RagDocument>, RepositoryError> {
    if batch.num_rows() == 0 {
        return Ok(vec![]);
    }

    let source_tables = string_column(batch, columns::SOURCE_TABLE)?;
    let source_ids = string_column(batch, columns::SOURCE_ID)?;
    let langs = string_column(batch, columns::LANG)?;
    let contents = string_column(batch, columns::CONTENT)?;
    let metadata = string_column(batch, columns::METADATA)?;
    let distances = batch
        .column_by_name(columns::DISTANCE)
        .and_then(|c| c.as_any().downcast_ref::<Float32Array>())
        .ok_or_else(|| RepositoryError::Query("search result lacks _distance".to_string()))?;

    (0..batch.num_rows())
        .map(|i| {
            let raw_meta = if metadata.is_null(i) { "" } else { metadata.value(i) };
            let metadata = Metadata::from_stored(raw_meta).map_err(|e| {
                RepositoryError::Query(format!(
                    "{}/{}: {e}",
                    source_tables.value(i),
                    source_ids.value(i)
                ))
            })?;
            Ok(RagDocument {
                source_table: source_tables.value(i).to_string(),
                source_id: source_ids.value(i).to_string(),
                lang: langs.value(i).to_string(),
                content: contents.value(i).to_string(),
                metadata,
                similarity: similarity_from_distance(distances.value(i)),
            })
        })
        .collect()
}
