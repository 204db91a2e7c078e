//! Document persistence for the loader.
//!
//! Every write goes through [`DocumentStore::insert`], which renames the
//! dataset's logical `id` to the store primary key `_id` and reports a
//! repeated key as [`InsertOutcome::Duplicate`] instead of overwriting.

mod memory;
mod sqlite;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{Map, Value};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// A single entity as parsed from an annotation file or read back from the store.
pub type Document = Map<String, Value>;

pub const LOGICAL_ID_FIELD: &str = "id";
pub const PRIMARY_KEY_FIELD: &str = "_id";

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum InsertOutcome {
    Inserted,
    Duplicate,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CollectionCount {
    pub collection: String,
    pub documents: usize,
}

pub trait DocumentStore {
    /// Collection used when a caller does not name one.
    fn default_collection(&self) -> &str;

    /// Inserts an already-keyed document. Callers go through [`DocumentStore::insert`].
    fn insert_stored(&mut self, collection: &str, stored: Document) -> Result<InsertOutcome>;

    fn find_by_key(&self, collection: &str, key: &Value) -> Result<Option<Document>>;

    /// Documents whose top-level `field` equals `value`, in insertion order.
    fn find_by_field(&self, collection: &str, field: &str, value: &Value)
    -> Result<Vec<Document>>;

    /// Streams every document of `collection` in insertion order and returns how many were visited.
    fn for_each_document(
        &self,
        collection: &str,
        visitor: &mut dyn FnMut(Document) -> Result<()>,
    ) -> Result<usize>;

    fn count(&self, collection: &str) -> Result<usize>;

    fn collections(&self) -> Result<Vec<CollectionCount>>;

    /// Inserts `document` into `collection`, or the default collection when `None`.
    ///
    /// The caller's document is left untouched; the stored copy carries the
    /// logical id under `_id`. A key already present in the collection yields
    /// `Ok(InsertOutcome::Duplicate)` and leaves the stored document unchanged.
    fn insert(&mut self, document: &Document, collection: Option<&str>) -> Result<InsertOutcome> {
        let collection = collection
            .unwrap_or_else(|| self.default_collection())
            .to_owned();
        self.insert_stored(&collection, to_stored_document(document))
    }
}

/// Copies `document` and moves its logical `id` into the primary key field.
///
/// Documents without an `id` keep whatever `_id` they already carry, which
/// lets documents read back from one collection be re-inserted into another.
pub fn to_stored_document(document: &Document) -> Document {
    let mut stored = document.clone();
    if let Some(id) = stored.remove(LOGICAL_ID_FIELD) {
        stored.insert(PRIMARY_KEY_FIELD.to_string(), id);
    }
    stored
}

/// Canonical text form of a primary key. `5` and `"5"` stay distinct.
pub fn primary_key(stored: &Document) -> Result<Option<String>> {
    stored
        .get(PRIMARY_KEY_FIELD)
        .map(encode_key)
        .transpose()
}

pub fn encode_key(value: &Value) -> Result<String> {
    serde_json::to_string(value).context("failed to encode primary key")
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn to_stored_document_renames_id_without_touching_input() {
        let original = doc(json!({"id": 42, "file_name": "a.jpg"}));
        let stored = to_stored_document(&original);

        assert_eq!(stored.get("_id"), Some(&json!(42)));
        assert!(stored.get("id").is_none());
        assert_eq!(original.get("id"), Some(&json!(42)));
        assert!(original.get("_id").is_none());
    }

    #[test]
    fn to_stored_document_keeps_existing_primary_key_when_id_missing() {
        let stored = to_stored_document(&doc(json!({"_id": 7, "height": 3})));
        assert_eq!(stored.get("_id"), Some(&json!(7)));
    }

    #[test]
    fn primary_key_distinguishes_numbers_from_strings() {
        let numeric = primary_key(&doc(json!({"_id": 5}))).expect("key should encode");
        let text = primary_key(&doc(json!({"_id": "5"}))).expect("key should encode");
        assert_ne!(numeric, text);
        assert!(primary_key(&doc(json!({"name": "x"}))).expect("key should encode").is_none());
    }

    #[test]
    fn insert_uses_default_collection_when_none_given() {
        let mut store = MemoryStore::new("images");
        let outcome = store
            .insert(&doc(json!({"id": 1})), None)
            .expect("insert should succeed");
        assert_eq!(outcome, InsertOutcome::Inserted);
        assert_eq!(store.count("images").expect("count should succeed"), 1);
    }
}
