use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::CoreError;

/// A stored document: an id plus a JSON object body.
///
/// The id lives outside the body, the way document databases key records.
/// `decode` folds it back into the typed model's `id` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

impl Document {
    pub fn new(id: impl Into<String>, data: Value) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }

    /// Deserialize the body into a model, with `id` injected.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, CoreError> {
        let mut body = match &self.data {
            Value::Object(map) => map.clone(),
            other => {
                return Err(CoreError::Deserialization(format!(
                    "Document '{}' is not an object: {other}",
                    self.id
                )))
            }
        };
        body.insert("id".into(), Value::String(self.id.clone()));
        serde_json::from_value(Value::Object(body)).map_err(|e| {
            CoreError::Deserialization(format!("Failed to decode document '{}': {e}", self.id))
        })
    }

    /// Serialize a model into a document body, dropping its `id` field.
    pub fn encode<T: Serialize>(value: &T) -> Result<Value, CoreError> {
        let value = serde_json::to_value(value)
            .map_err(|e| CoreError::Serialization(format!("Failed to encode document: {e}")))?;
        match value {
            Value::Object(mut map) => {
                map.remove("id");
                Ok(Value::Object(map))
            }
            other => Err(CoreError::Serialization(format!(
                "Documents must serialize to objects, got {other}"
            ))),
        }
    }

    /// Field lookup on the body.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }
}

/// Query predicate evaluated against document bodies.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Every document in the collection
    All,
    /// Top-level field equals the value; a missing field never matches
    Eq(String, Value),
    /// All inner filters match
    And(Vec<Filter>),
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq(field.into(), value.into())
    }

    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq(field, value) => doc.field(field) == Some(value),
            Filter::And(filters) => filters.iter().all(|f| f.matches(doc)),
        }
    }
}

/// One write inside an atomic batch.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOp {
    /// Create or replace the whole document
    Set {
        collection: String,
        id: String,
        data: Value,
    },
    /// Merge top-level fields into an existing document; `null` removes a field
    Update {
        collection: String,
        id: String,
        data: Value,
    },
    /// Remove the document (removing a missing document is not an error)
    Delete { collection: String, id: String },
}

impl BatchOp {
    pub fn set(collection: impl Into<String>, id: impl Into<String>, data: Value) -> Self {
        BatchOp::Set {
            collection: collection.into(),
            id: id.into(),
            data,
        }
    }

    pub fn update(collection: impl Into<String>, id: impl Into<String>, data: Value) -> Self {
        BatchOp::Update {
            collection: collection.into(),
            id: id.into(),
            data,
        }
    }

    pub fn delete(collection: impl Into<String>, id: impl Into<String>) -> Self {
        BatchOp::Delete {
            collection: collection.into(),
            id: id.into(),
        }
    }

    pub fn collection(&self) -> &str {
        match self {
            BatchOp::Set { collection, .. }
            | BatchOp::Update { collection, .. }
            | BatchOp::Delete { collection, .. } => collection,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            BatchOp::Set { id, .. } | BatchOp::Update { id, .. } | BatchOp::Delete { id, .. } => id,
        }
    }
}
