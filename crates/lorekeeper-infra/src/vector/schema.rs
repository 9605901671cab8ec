//! Arrow schema for the LanceDB document table.
//!
//! Arrow versions MUST match lancedb's transitive dependency (57.3 for lancedb 0.26).

use std::sync::Arc;

use arrow_schema::{DataType, Field, Schema};

/// Column names shared by the writer and the reader.
pub mod columns {
    pub const SOURCE_TABLE: &str = "source_table";
    pub const SOURCE_ID: &str = "source_id";
    pub const LANG: &str = "lang";
    pub const CONTENT: &str = "content";
    pub const METADATA: &str = "metadata";
    pub const UPDATED_AT: &str = "updated_at";
    pub const VECTOR: &str = "vector";
    /// Added by LanceDB to vector search results.
    pub const DISTANCE: &str = "_distance";
}

/// Natural key of a document row.
pub const DOCUMENT_KEY: [&str; 3] = [columns::SOURCE_TABLE, columns::SOURCE_ID, columns::LANG];

/// The element field of the vector column.
pub fn vector_item_field() -> Arc<Field> {
    Arc::new(Field::new("item", DataType::Float32, true))
}

/// Schema for the document table.
///
/// `metadata` holds a JSON object encoded as text. `dimension` must equal the
/// embedding model's output length.
pub fn rag_documents_schema(dimension: i32) -> Schema {
    Schema::new(vec![
        Field::new(columns::SOURCE_TABLE, DataType::Utf8, false),
        Field::new(columns::SOURCE_ID, DataType::Utf8, false),
        Field::new(columns::LANG, DataType::Utf8, false),
        Field::new(columns::CONTENT, DataType::Utf8, false),
        Field::new(columns::METADATA, DataType::Utf8, false),
        Field::new(columns::UPDATED_AT, DataType::Utf8, false),
        Field::new(
            columns::VECTOR,
            DataType::FixedSizeList(vector_item_field(), dimension),
            false,
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rag_documents_schema_fields() {
        let schema = rag_documents_schema(1024);
        assert_eq!(schema.fields().len(), 7);
        for key in DOCUMENT_KEY {
            assert!(schema.field_with_name(key).is_ok(), "{key} missing");
        }
        assert!(schema.field_with_name(columns::METADATA).is_ok());

        let vector_field = schema.field_with_name(columns::VECTOR).unwrap();
        match vector_field.data_type() {
            DataType::FixedSizeList(_, size) => assert_eq!(*size, 1024),
            other => panic!("Expected FixedSizeList, got {:?}", other),
        }
    }

    #[test]
    fn test_dimension_is_configurable() {
        let schema = rag_documents_schema(8);
        let vector_field = schema.field_with_name(columns::VECTOR).unwrap();
        assert!(matches!(vector_field.data_type(), DataType::FixedSizeList(_, 8)));
    }
}
