use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, params};
use serde_json::Value;

use super::{CollectionCount, Document, DocumentStore, InsertOutcome, encode_key, primary_key};
use crate::util::now_utc_string;

const DB_SCHEMA_VERSION: &str = "0.1.0";

/// SQLite-backed document store. Each row holds one JSON document; the
/// `(collection, doc_key)` unique constraint enforces one document per key.
pub struct SqliteStore {
    connection: Connection,
    default_collection: String,
}

impl SqliteStore {
    pub fn open(db_path: &Path, default_collection: &str) -> Result<Self> {
        let connection = Connection::open(db_path)
            .with_context(|| format!("failed to open {}", db_path.display()))?;
        configure_connection(&connection)?;
        Self::from_connection(connection, default_collection)
    }

    #[cfg(test)]
    pub fn open_in_memory(default_collection: &str) -> Result<Self> {
        let connection =
            Connection::open_in_memory().context("failed to open in-memory database")?;
        Self::from_connection(connection, default_collection)
    }

    fn from_connection(connection: Connection, default_collection: &str) -> Result<Self> {
        ensure_schema(&connection)?;
        Ok(Self {
            connection,
            default_collection: default_collection.to_string(),
        })
    }

    fn query_documents(&self, sql: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Vec<Document>> {
        let mut statement = self.connection.prepare_cached(sql)?;
        let mut rows = statement.query(params)?;

        let mut documents = Vec::new();
        while let Some(row) = rows.next()? {
            let body: String = row.get(0)?;
            documents.push(parse_body(&body)?);
        }

        Ok(documents)
    }
}

fn configure_connection(connection: &Connection) -> Result<()> {
    connection
        .pragma_update(None, "journal_mode", "WAL")
        .context("failed to set journal_mode=WAL")?;
    connection
        .pragma_update(None, "synchronous", "NORMAL")
        .context("failed to set synchronous=NORMAL")?;
    Ok(())
}

fn ensure_schema(connection: &Connection) -> Result<()> {
    connection
        .execute_batch(
            "
            CREATE TABLE IF NOT EXISTS metadata (
              key TEXT PRIMARY KEY,
              value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS documents (
              seq INTEGER PRIMARY KEY AUTOINCREMENT,
              collection TEXT NOT NULL,
              doc_key TEXT,
              body TEXT NOT NULL,
              UNIQUE(collection, doc_key)
            );

            CREATE INDEX IF NOT EXISTS idx_documents_collection_seq ON documents(collection, seq);
            ",
        )
        .context("failed to initialize document schema")?;

    connection.execute(
        "INSERT INTO metadata(key, value) VALUES('db_schema_version', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        [DB_SCHEMA_VERSION],
    )?;
    connection.execute(
        "INSERT INTO metadata(key, value) VALUES('db_updated_at', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        [now_utc_string()],
    )?;

    Ok(())
}

fn parse_body(body: &str) -> Result<Document> {
    serde_json::from_str(body).context("failed to parse stored document")
}

/// SQL form of a JSON scalar as `json_extract` reports it. Arrays, objects
/// and null have no usable SQL equality and are matched in Rust instead.
fn sql_scalar(value: &Value) -> Option<SqlValue> {
    match value {
        Value::Bool(flag) => Some(SqlValue::Integer(i64::from(*flag))),
        Value::Number(number) => number
            .as_i64()
            .map(SqlValue::Integer)
            .or_else(|| number.as_f64().map(SqlValue::Real)),
        Value::String(text) => Some(SqlValue::Text(text.clone())),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

impl DocumentStore for SqliteStore {
    fn default_collection(&self) -> &str {
        &self.default_collection
    }

    fn insert_stored(&mut self, collection: &str, stored: Document) -> Result<InsertOutcome> {
        let key = primary_key(&stored)?;
        let body = serde_json::to_string(&stored)
            .with_context(|| format!("failed to serialize document for {collection}"))?;

        let changed = self
            .connection
            .prepare_cached(
                "INSERT INTO documents(collection, doc_key, body) VALUES(?1, ?2, ?3)
                 ON CONFLICT(collection, doc_key) DO NOTHING",
            )?
            .execute(params![collection, key, body])
            .with_context(|| format!("failed to insert document into {collection}"))?;

        if changed == 0 {
            Ok(InsertOutcome::Duplicate)
        } else {
            Ok(InsertOutcome::Inserted)
        }
    }

    fn find_by_key(&self, collection: &str, key: &Value) -> Result<Option<Document>> {
        let key = encode_key(key)?;
        let documents = self.query_documents(
            "SELECT body FROM documents WHERE collection = ?1 AND doc_key = ?2",
            &[&collection, &key],
        )?;
        Ok(documents.into_iter().next())
    }

    fn find_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Document>> {
        let candidates = match sql_scalar(value) {
            Some(scalar) => {
                let path = format!("$.\"{field}\"");
                self.query_documents(
                    "SELECT body FROM documents
                     WHERE collection = ?1 AND json_extract(body, ?2) = ?3
                     ORDER BY seq",
                    &[&collection, &path, &scalar],
                )?
            }
            None => self.query_documents(
                "SELECT body FROM documents WHERE collection = ?1 ORDER BY seq",
                &[&collection],
            )?,
        };

        // json_extract folds booleans into integers; keep exact JSON equality.
        Ok(candidates
            .into_iter()
            .filter(|document| document.get(field) == Some(value))
            .collect())
    }

    fn for_each_document(
        &self,
        collection: &str,
        visitor: &mut dyn FnMut(Document) -> Result<()>,
    ) -> Result<usize> {
        let mut statement = self
            .connection
            .prepare_cached("SELECT body FROM documents WHERE collection = ?1 ORDER BY seq")?;
        let mut rows = statement.query([collection])?;

        let mut visited = 0;
        while let Some(row) = rows.next()? {
            let body: String = row.get(0)?;
            visitor(parse_body(&body)?)?;
            visited += 1;
        }

        Ok(visited)
    }

    fn count(&self, collection: &str) -> Result<usize> {
        let count: i64 = self.connection.query_row(
            "SELECT COUNT(*) FROM documents WHERE collection = ?1",
            [collection],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    fn collections(&self) -> Result<Vec<CollectionCount>> {
        let mut statement = self.connection.prepare(
            "SELECT collection, COUNT(*) FROM documents GROUP BY collection ORDER BY collection",
        )?;
        let rows = statement.query_map([], |row| {
            let collection: String = row.get(0)?;
            let documents: i64 = row.get(1)?;
            Ok(CollectionCount {
                collection,
                documents: usize::try_from(documents).unwrap_or(0),
            })
        })?;

        let mut counts = Vec::new();
        for row in rows {
            counts.push(row?);
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().expect("test document should be an object")
    }

    fn store() -> SqliteStore {
        SqliteStore::open_in_memory("default").expect("in-memory DB should open")
    }

    #[test]
    fn duplicate_insert_is_reported_and_does_not_overwrite() {
        let mut store = store();

        let first = store
            .insert(&doc(json!({"id": 9, "height": 1})), Some("all_images"))
            .expect("insert should succeed");
        let second = store
            .insert(&doc(json!({"id": 9, "height": 2})), Some("all_images"))
            .expect("insert should succeed");

        assert_eq!(first, InsertOutcome::Inserted);
        assert_eq!(second, InsertOutcome::Duplicate);

        let stored = store
            .find_by_key("all_images", &json!(9))
            .expect("lookup should succeed")
            .expect("document should exist");
        assert_eq!(stored.get("height"), Some(&json!(1)));
        assert_eq!(stored.get("_id"), Some(&json!(9)));
        assert!(stored.get("id").is_none());
    }

    #[test]
    fn unkeyed_documents_do_not_collide() {
        let mut store = store();
        let document = doc(json!({"name": "no id"}));

        store.insert(&document, None).expect("insert should succeed");
        let outcome = store.insert(&document, None).expect("insert should succeed");

        assert_eq!(outcome, InsertOutcome::Inserted);
        assert_eq!(store.count("default").expect("count should succeed"), 2);
    }

    #[test]
    fn find_by_field_matches_integer_and_string_values() {
        let mut store = store();
        store
            .insert(&doc(json!({"id": 1, "category_id": 10})), Some("annotations"))
            .expect("insert should succeed");
        store
            .insert(&doc(json!({"id": 2, "category_id": 11})), Some("annotations"))
            .expect("insert should succeed");
        store
            .insert(&doc(json!({"id": 3, "name": "traffic light"})), Some("categories"))
            .expect("insert should succeed");

        let by_int = store
            .find_by_field("annotations", "category_id", &json!(10))
            .expect("query should succeed");
        assert_eq!(by_int.len(), 1);
        assert_eq!(by_int[0].get("_id"), Some(&json!(1)));

        let by_name = store
            .find_by_field("categories", "name", &json!("traffic light"))
            .expect("query should succeed");
        assert_eq!(by_name.len(), 1);
    }

    #[test]
    fn for_each_document_visits_in_insertion_order_and_collections_are_counted() {
        let mut store = store();
        for id in [3, 1, 2] {
            store
                .insert(&doc(json!({"id": id})), Some("all_images"))
                .expect("insert should succeed");
        }
        store
            .insert(&doc(json!({"id": 1})), Some("categories"))
            .expect("insert should succeed");

        let mut seen = Vec::new();
        let visited = store
            .for_each_document("all_images", &mut |document| {
                seen.push(document.get("_id").cloned());
                Ok(())
            })
            .expect("scan should succeed");

        assert_eq!(visited, 3);
        assert_eq!(seen, vec![Some(json!(3)), Some(json!(1)), Some(json!(2))]);
        assert_eq!(
            store.collections().expect("collections should list"),
            vec![
                CollectionCount {
                    collection: "all_images".to_string(),
                    documents: 3
                },
                CollectionCount {
                    collection: "categories".to_string(),
                    documents: 1
                },
            ]
        );
    }

    #[test]
    fn schema_version_is_recorded() {
        let store = store();
        let version: String = store
            .connection
            .query_row(
                "SELECT value FROM metadata WHERE key = 'db_schema_version'",
                [],
                |row| row.get(0),
            )
            .expect("metadata row should exist");
        assert_eq!(version, DB_SCHEMA_VERSION);
    }
}
