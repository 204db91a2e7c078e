use std::collections::{BTreeMap, HashMap};

use anyhow::Result;
use serde_json::Value;

use super::{CollectionCount, Document, DocumentStore, InsertOutcome, encode_key, primary_key};

#[derive(Debug, Default)]
struct MemoryCollection {
    documents: Vec<Document>,
    keys: HashMap<String, usize>,
}

/// Ordered in-memory collections, used by tests and dry runs.
#[derive(Debug)]
pub struct MemoryStore {
    default_collection: String,
    collections: BTreeMap<String, MemoryCollection>,
}

impl MemoryStore {
    pub fn new(default_collection: &str) -> Self {
        Self {
            default_collection: default_collection.to_string(),
            collections: BTreeMap::new(),
        }
    }
}

impl DocumentStore for MemoryStore {
    fn default_collection(&self) -> &str {
        &self.default_collection
    }

    fn insert_stored(&mut self, collection: &str, stored: Document) -> Result<InsertOutcome> {
        let key = primary_key(&stored)?;
        let entry = self.collections.entry(collection.to_string()).or_default();

        if let Some(key) = key {
            if entry.keys.contains_key(&key) {
                return Ok(InsertOutcome::Duplicate);
            }
            entry.keys.insert(key, entry.documents.len());
        }
        entry.documents.push(stored);

        Ok(InsertOutcome::Inserted)
    }

    fn find_by_key(&self, collection: &str, key: &Value) -> Result<Option<Document>> {
        let key = encode_key(key)?;
        Ok(self.collections.get(collection).and_then(|entry| {
            entry
                .keys
                .get(&key)
                .and_then(|index| entry.documents.get(*index))
                .cloned()
        }))
    }

    fn find_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Document>> {
        Ok(self
            .collections
            .get(collection)
            .map(|entry| {
                entry
                    .documents
                    .iter()
                    .filter(|document| document.get(field) == Some(value))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn for_each_document(
        &self,
        collection: &str,
        visitor: &mut dyn FnMut(Document) -> Result<()>,
    ) -> Result<usize> {
        let Some(entry) = self.collections.get(collection) else {
            return Ok(0);
        };

        for document in &entry.documents {
            visitor(document.clone())?;
        }

        Ok(entry.documents.len())
    }

    fn count(&self, collection: &str) -> Result<usize> {
        Ok(self
            .collections
            .get(collection)
            .map(|entry| entry.documents.len())
            .unwrap_or(0))
    }

    fn collections(&self) -> Result<Vec<CollectionCount>> {
        Ok(self
            .collections
            .iter()
            .map(|(name, entry)| CollectionCount {
                collection: name.clone(),
                documents: entry.documents.len(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().expect("test document should be an object")
    }

    #[test]
    fn duplicate_key_leaves_first_document_in_place() {
        let mut store = MemoryStore::new("default");

        let first = store
            .insert(&doc(json!({"id": 1, "width": 10})), Some("all_images"))
            .expect("first insert should succeed");
        let second = store
            .insert(&doc(json!({"id": 1, "width": 99})), Some("all_images"))
            .expect("second insert should succeed");

        assert_eq!(first, InsertOutcome::Inserted);
        assert_eq!(second, InsertOutcome::Duplicate);

        let stored = store
            .find_by_key("all_images", &json!(1))
            .expect("lookup should succeed")
            .expect("document should exist");
        assert_eq!(stored.get("width"), Some(&json!(10)));
        assert_eq!(store.count("all_images").expect("count should succeed"), 1);
    }

    #[test]
    fn same_key_in_different_collections_is_not_a_duplicate() {
        let mut store = MemoryStore::new("default");
        let document = doc(json!({"id": 3}));

        assert_eq!(
            store.insert(&document, Some("a")).expect("insert should succeed"),
            InsertOutcome::Inserted
        );
        assert_eq!(
            store.insert(&document, Some("b")).expect("insert should succeed"),
            InsertOutcome::Inserted
        );
    }

    #[test]
    fn documents_without_id_are_always_inserted() {
        let mut store = MemoryStore::new("default");
        let document = doc(json!({"name": "unkeyed"}));

        for _ in 0..2 {
            assert_eq!(
                store.insert(&document, None).expect("insert should succeed"),
                InsertOutcome::Inserted
            );
        }
        assert_eq!(store.count("default").expect("count should succeed"), 2);
    }

    #[test]
    fn find_by_field_returns_matches_in_insertion_order() {
        let mut store = MemoryStore::new("default");
        for (id, category) in [(1, 5), (2, 6), (3, 5)] {
            store
                .insert(&doc(json!({"id": id, "category_id": category})), Some("annotations"))
                .expect("insert should succeed");
        }

        let matches = store
            .find_by_field("annotations", "category_id", &json!(5))
            .expect("query should succeed");
        let ids: Vec<_> = matches.iter().filter_map(|d| d.get("_id").cloned()).collect();
        assert_eq!(ids, vec![json!(1), json!(3)]);
    }
}
