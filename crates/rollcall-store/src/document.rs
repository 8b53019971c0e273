//! Schemaless documents exchanged with the store, plus typed helpers.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{Result, StoreError};

/// A stored document: a JSON object whose `id` field identifies it within
/// its collection.
pub type Document = serde_json::Map<String, Value>;

pub fn doc_id(doc: &Document) -> Option<&str> {
    doc.get("id").and_then(Value::as_str)
}

/// Serializes a typed value into a document. Fails when the value does not
/// serialize to a JSON object.
pub fn encode<T: Serialize>(value: &T) -> Result<Document> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::InvalidDocument(format!(
            "expected a JSON object, got {other}"
        ))),
    }
}

pub fn decode<T: DeserializeOwned>(doc: &Document) -> Result<T> {
    Ok(serde_json::from_value(Value::Object(doc.clone()))?)
}
