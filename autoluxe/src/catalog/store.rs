//! Document store contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::Result;

/// Collection names.
pub mod collections {
    pub const CARS: &str = "cars";
    pub const BRANDS: &str = "brands";
    pub const CATEGORIES: &str = "categories";
}

/// A stored record: its id plus arbitrary JSON fields.
///
/// Serializes flat, as `{"id": ..., <fields>}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Document {
    pub fn new(id: impl Into<String>, mut fields: Map<String, Value>) -> Self {
        fields.remove("id");
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Build from a JSON object. Non-object values yield an empty document.
    pub fn from_value(id: impl Into<String>, value: Value) -> Self {
        match value {
            Value::Object(fields) => Self::new(id, fields),
            _ => Self::new(id, Map::new()),
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(Value::as_str)
    }
}

/// A single query predicate on a top-level field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldFilter {
    Equals { field: String, value: Value },
    AtLeast { field: String, value: f64 },
    AtMost { field: String, value: f64 },
    /// The field is an array containing `value`.
    Contains { field: String, value: Value },
}

impl FieldFilter {
    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Equals {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn at_least(field: impl Into<String>, value: f64) -> Self {
        Self::AtLeast {
            field: field.into(),
            value,
        }
    }

    pub fn at_most(field: impl Into<String>, value: f64) -> Self {
        Self::AtMost {
            field: field.into(),
            value,
        }
    }

    pub fn contains(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Contains {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn field(&self) -> &str {
        match self {
            Self::Equals { field, .. }
            | Self::AtLeast { field, .. }
            | Self::AtMost { field, .. }
            | Self::Contains { field, .. } => field,
        }
    }
}

/// Document store trait.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// All documents of `collection` matching every filter, ordered by id.
    async fn query(&self, collection: &str, filters: &[FieldFilter]) -> Result<Vec<Document>>;

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>>;

    /// Insert or replace a document.
    async fn upsert(&self, collection: &str, document: &Document) -> Result<()>;

    /// Returns whether a document was removed.
    async fn delete(&self, collection: &str, id: &str) -> Result<bool>;
}
