//! Knowledge-base document types.
//!
//! `RagDocument` is produced per query and never persisted as its own entity;
//! its `SourceDoc` projection is what lands on assistant messages.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::chat::SourceDoc;

/// Open key-value metadata attached to a document.
///
/// Always a JSON object once it has crossed the store boundary. Stored rows
/// may carry the object as native JSON or as a string holding encoded JSON;
/// [`Metadata::from_stored`] folds both into this one shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(pub Map<String, Value>);

impl Metadata {
    /// Normalize a stored metadata column into an object.
    ///
    /// Accepts an object, a JSON string that decodes to an object (one level
    /// of double encoding), or an empty/null value. Anything else is an error.
    pub fn from_stored(raw: &str) -> Result<Self, String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(Self::default());
        }
        let value: Value =
            serde_json::from_str(trimmed).map_err(|e| format!("metadata is not JSON: {e}"))?;
        Self::from_value(value)
    }

    /// Normalize an already-decoded JSON value into an object.
    pub fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Null => Ok(Self::default()),
            Value::Object(map) => Ok(Self(map)),
            Value::String(inner) => match serde_json::from_str::<Value>(&inner) {
                Ok(Value::Object(map)) => Ok(Self(map)),
                Ok(Value::Null) => Ok(Self::default()),
                _ => Err("metadata string does not hold a JSON object".to_string()),
            },
            other => Err(format!("metadata must be a JSON object, got {}", kind(&other))),
        }
    }

    /// Encode for storage. Always an object literal.
    pub fn to_stored(&self) -> String {
        Value::Object(self.0.clone()).to_string()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A retrieved document, ranked by similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagDocument {
    pub source_table: String,
    pub source_id: String,
    pub lang: String,
    pub content: String,
    pub metadata: Metadata,
    /// In [0, 1], rounded to 4 decimal places.
    pub similarity: f64,
}

impl RagDocument {
    /// Provenance projection persisted on assistant messages.
    pub fn source(&self) -> SourceDoc {
        SourceDoc {
            source_table: self.source_table.clone(),
            source_id: self.source_id.clone(),
            similarity: self.similarity,
        }
    }
}

/// A rendered document ready to be embedded and written to the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDocument {
    pub source_table: String,
    pub source_id: String,
    pub lang: String,
    pub content: String,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Convert a cosine distance into a similarity in [0, 1], rounded to 4 places.
pub fn similarity_from_distance(distance: f32) -> f64 {
    let similarity = (1.0 - f64::from(distance)).clamp(0.0, 1.0);
    (similarity * 10_000.0).round() / 10_000.0
}
