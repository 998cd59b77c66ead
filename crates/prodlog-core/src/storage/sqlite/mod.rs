//! SQLite record store.
//!
//! Each collection is a table of `(id, doc)` rows holding the record's JSON
//! document verbatim. Indexed fields are expression indexes over
//! `json_extract(doc, ...)`. The schema version lives in
//! `PRAGMA user_version`.

mod row;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, ErrorCode, OptionalExtension};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{ProdlogError, Result};
use crate::storage::schema::{
    collection_ddl, field_expr, schema_version, Collection, CollectionSpec, IndexSpec,
    SchemaVersion, CURRENT_SCHEMA_VERSION, SCHEMA_VERSIONS,
};
use crate::storage::traits::{Direction, OrderBy, RecordStore, WriteOp};

use row::DocRow;

/// SQLite-backed record store.
pub struct SqliteStore {
    path: Option<PathBuf>,
    conn: Mutex<Connection>,
    schema: &'static SchemaVersion,
}

impl SqliteStore {
    /// Open (or create) the store at `path` at the current schema version.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_at(path, CURRENT_SCHEMA_VERSION)
    }

    /// Open (or create) the store at `path`, bringing it to `target`.
    ///
    /// A fresh file gets the target layout directly; an older store has
    /// every intermediate version's structure applied in order.
    ///
    /// # Errors
    ///
    /// Returns `ProdlogError::Schema` if `target` is not a declared version
    /// or the store was written at a newer version.
    pub fn open_at(path: &Path, target: u32) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    ProdlogError::Storage(format!(
                        "Failed to create store directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let mut conn = Connection::open(path)?;
        let _mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        let schema = Self::upgrade(&mut conn, target)?;
        info!(path = %path.display(), version = schema.version, "Opened record store");

        Ok(Self {
            path: Some(path.to_path_buf()),
            conn: Mutex::new(conn),
            schema,
        })
    }

    /// Open a throwaway in-memory store at the current schema version.
    pub fn open_in_memory() -> Result<Self> {
        Self::open_in_memory_at(CURRENT_SCHEMA_VERSION)
    }

    /// Open a throwaway in-memory store at `target`.
    pub fn open_in_memory_at(target: u32) -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        let schema = Self::upgrade(&mut conn, target)?;
        Ok(Self {
            path: None,
            conn: Mutex::new(conn),
            schema,
        })
    }

    /// Database file path, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Bring the database layout to `target`, in one transaction.
    fn upgrade(conn: &mut Connection, target: u32) -> Result<&'static SchemaVersion> {
        let target_schema = schema_version(target)
            .ok_or_else(|| ProdlogError::Schema(format!("Unknown schema version {}", target)))?;

        let current: u32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
        if current > target {
            return Err(ProdlogError::Schema(format!(
                "Store is at schema version {}, newer than supported version {}",
                current, target
            )));
        }
        if current == target {
            return Ok(target_schema);
        }
        if current != 0 && schema_version(current).is_none() {
            return Err(ProdlogError::Schema(format!(
                "Store is at unknown schema version {}",
                current
            )));
        }

        let tx = conn.transaction()?;
        if current == 0 {
            apply_layout(&tx, target_schema)?;
            info!(version = target, "Created store layout");
        } else {
            for schema in SCHEMA_VERSIONS
                .iter()
                .filter(|s| s.version > current && s.version <= target)
            {
                apply_layout(&tx, schema)?;
                info!(from = current, to = schema.version, "Upgraded store layout");
            }
        }
        tx.pragma_update(None, "user_version", target)?;
        tx.commit()?;

        Ok(target_schema)
    }

    /// Lock the database connection, returning an error if the mutex is poisoned.
    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| ProdlogError::Storage("SQLite connection poisoned".to_string()))
    }

    fn collection_spec(&self, collection: Collection) -> Result<&'static CollectionSpec> {
        self.schema.collection(collection).ok_or_else(|| {
            ProdlogError::Schema(format!(
                "Collection {} is not available at schema version {}",
                collection, self.schema.version
            ))
        })
    }

    fn index_spec(&self, collection: Collection, field: &str) -> Result<&'static IndexSpec> {
        self.collection_spec(collection)?
            .index(field)
            .ok_or_else(|| {
                ProdlogError::Schema(format!("Field {} is not indexed on {}", field, collection))
            })
    }
}

fn apply_layout(conn: &Connection, schema: &SchemaVersion) -> Result<()> {
    for spec in schema.collections {
        conn.execute_batch(&collection_ddl(spec))?;
    }
    Ok(())
}

fn record_id(collection: Collection, record: &Value) -> Result<String> {
    let object = record.as_object().ok_or_else(|| {
        ProdlogError::Format(format!("Record in {} is not an object", collection))
    })?;
    object
        .get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ProdlogError::Format(format!("Record in {} has no string id", collection)))
}

fn write_doc(conn: &Connection, collection: Collection, record: &Value, overwrite: bool) -> Result<()> {
    let id = record_id(collection, record)?;
    let doc = serde_json::to_string(record)?;
    let verb = if overwrite {
        "INSERT OR REPLACE"
    } else {
        "INSERT"
    };
    let sql = format!("{} INTO {} (id, doc) VALUES (?1, ?2)", verb, collection.table());

    match conn.execute(&sql, (&id, doc)) {
        Ok(_) => {
            debug!(collection = %collection, id = %id, overwrite, "Wrote record");
            Ok(())
        }
        Err(rusqlite::Error::SqliteFailure(err, _))
            if !overwrite && err.code == ErrorCode::ConstraintViolation =>
        {
            Err(ProdlogError::DuplicateId {
                collection: collection.key().to_string(),
                id,
            })
        }
        Err(e) => Err(e.into()),
    }
}

fn query_docs(
    conn: &Connection,
    collection: Collection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<Value>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut docs = Vec::new();
    for row in rows {
        let (id, doc) = row?;
        docs.push(Value::try_from(DocRow {
            collection,
            id,
            doc,
        })?);
    }
    Ok(docs)
}

impl RecordStore for SqliteStore {
    fn schema_version(&self) -> Result<u32> {
        let conn = self.lock_conn()?;
        let version: u32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
        Ok(version)
    }

    fn get(&self, collection: Collection, id: &str) -> Result<Option<Value>> {
        self.collection_spec(collection)?;
        let conn = self.lock_conn()?;

        let doc: Option<String> = conn
            .query_row(
                &format!("SELECT doc FROM {} WHERE id = ?", collection.table()),
                [id],
                |row| row.get(0),
            )
            .optional()?;

        doc.map(|doc| {
            Value::try_from(DocRow {
                collection,
                id: id.to_string(),
                doc,
            })
        })
        .transpose()
    }

    fn insert(&self, collection: Collection, record: &Value) -> Result<()> {
        self.collection_spec(collection)?;
        let conn = self.lock_conn()?;
        write_doc(&conn, collection, record, false)
    }

    fn put(&self, collection: Collection, record: &Value) -> Result<()> {
        self.collection_spec(collection)?;
        let conn = self.lock_conn()?;
        write_doc(&conn, collection, record, true)
    }

    fn delete(&self, collection: Collection, id: &str) -> Result<bool> {
        self.collection_spec(collection)?;
        let conn = self.lock_conn()?;
        let removed = conn.execute(
            &format!("DELETE FROM {} WHERE id = ?", collection.table()),
            [id],
        )?;
        debug!(collection = %collection, id, removed, "Deleted record");
        Ok(removed > 0)
    }

    fn scan(&self, collection: Collection, order: Option<OrderBy>) -> Result<Vec<Value>> {
        self.collection_spec(collection)?;
        let order_clause = match order {
            Some(order) => {
                let spec = self.index_spec(collection, order.field)?;
                if spec.multi_entry {
                    return Err(ProdlogError::Schema(format!(
                        "Cannot order {} by multi-entry field {}",
                        collection, order.field
                    )));
                }
                let dir = match order.direction {
                    Direction::Ascending => "ASC",
                    Direction::Descending => "DESC",
                };
                format!("{} {}, id {}", field_expr(order.field), dir, dir)
            }
            None => "id ASC".to_string(),
        };

        let conn = self.lock_conn()?;
        let sql = format!(
            "SELECT id, doc FROM {} ORDER BY {}",
            collection.table(),
            order_clause
        );
        query_docs(&conn, collection, &sql, [])
    }

    fn find_eq(&self, collection: Collection, field: &str, value: &str) -> Result<Vec<Value>> {
        let spec = self.index_spec(collection, field)?;
        let table = collection.table();
        let sql = if spec.multi_entry {
            format!(
                "SELECT t.id, t.doc FROM {table} t \
                 WHERE EXISTS (SELECT 1 FROM json_each(t.doc, '$.{field}') WHERE json_each.value = ?1) \
                 ORDER BY t.id",
                table = table,
                field = spec.field
            )
        } else {
            format!(
                "SELECT id, doc FROM {} WHERE {} = ?1 ORDER BY id",
                table,
                field_expr(spec.field)
            )
        };

        let conn = self.lock_conn()?;
        query_docs(&conn, collection, &sql, [value])
    }

    fn find_first(
        &self,
        collection: Collection,
        field: &str,
        value: &str,
    ) -> Result<Option<Value>> {
        Ok(self.find_eq(collection, field, value)?.into_iter().next())
    }

    fn count(&self, collection: Collection) -> Result<usize> {
        self.collection_spec(collection)?;
        let conn = self.lock_conn()?;
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", collection.table()),
            [],
            |row| row.get(0),
        )?;
        usize::try_from(count)
            .map_err(|_| ProdlogError::Storage(format!("Invalid row count {}", count)))
    }

    fn apply(&self, ops: &[WriteOp]) -> Result<()> {
        for op in ops {
            let collection = match op {
                WriteOp::Clear(collection) | WriteOp::Put(collection, _) => *collection,
            };
            self.collection_spec(collection)?;
        }

        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;
        for op in ops {
            match op {
                WriteOp::Clear(collection) => {
                    let removed =
                        tx.execute(&format!("DELETE FROM {}", collection.table()), [])?;
                    debug!(collection = %collection, removed, "Cleared collection");
                }
                WriteOp::Put(collection, record) => {
                    write_doc(&tx, *collection, record, true)?;
                }
            }
        }
        // Dropping the transaction on any error above rolls every op back.
        tx.commit()?;
        Ok(())
    }

    fn check_integrity(&self) -> Result<()> {
        let conn = self.lock_conn()?;

        let status: String = conn.query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
        if status != "ok" {
            return Err(ProdlogError::Storage(format!(
                "SQLite integrity check failed: {}",
                status
            )));
        }

        let version: u32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
        let schema = schema_version(version).ok_or_else(|| {
            ProdlogError::Schema(format!("Store is at unknown schema version {}", version))
        })?;

        for spec in schema.collections {
            let table = spec.collection.table();
            let exists: Option<String> = conn
                .query_row(
                    "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?",
                    [table],
                    |row| row.get(0),
                )
                .optional()?;
            if exists.is_none() {
                return Err(ProdlogError::Schema(format!(
                    "Collection {} is missing",
                    spec.collection
                )));
            }

            query_docs(
                &conn,
                spec.collection,
                &format!("SELECT id, doc FROM {}", table),
                [],
            )?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> SqliteStore {
        SqliteStore::open_in_memory().expect("in-memory store should open")
    }

    #[test]
    fn test_fresh_store_is_current() {
        let store = store();
        assert_eq!(store.schema_version().unwrap(), CURRENT_SCHEMA_VERSION);
        assert_eq!(store.count(Collection::Technicians).unwrap(), 0);
        store.check_integrity().unwrap();
    }

    #[test]
    fn test_v1_store_has_no_technicians() {
        let store = SqliteStore::open_in_memory_at(1).unwrap();
        assert_eq!(store.schema_version().unwrap(), 1);
        let err = store.count(Collection::Technicians).unwrap_err();
        assert!(matches!(err, ProdlogError::Schema(_)));
    }

    #[test]
    fn test_unknown_target_version_rejected() {
        assert!(matches!(
            SqliteStore::open_in_memory_at(7),
            Err(ProdlogError::Schema(_))
        ));
    }

    #[test]
    fn test_insert_get_delete() {
        let store = store();
        let doc = json!({"id": "t1", "initials": "AB"});
        store.insert(Collection::Technicians, &doc).unwrap();
        assert_eq!(store.get(Collection::Technicians, "t1").unwrap(), Some(doc));

        assert!(store.delete(Collection::Technicians, "t1").unwrap());
        assert!(!store.delete(Collection::Technicians, "t1").unwrap());
        assert_eq!(store.get(Collection::Technicians, "t1").unwrap(), None);
    }

    #[test]
    fn test_insert_duplicate_id_fails() {
        let store = store();
        let doc = json!({"id": "t1", "initials": "AB"});
        store.insert(Collection::Technicians, &doc).unwrap();
        let err = store.insert(Collection::Technicians, &doc).unwrap_err();
        assert!(matches!(err, ProdlogError::DuplicateId { .. }));
    }

    #[test]
    fn test_put_overwrites() {
        let store = store();
        store
            .put(Collection::Technicians, &json!({"id": "t1", "initials": "AB"}))
            .unwrap();
        store
            .put(Collection::Technicians, &json!({"id": "t1", "initials": "CD"}))
            .unwrap();
        let doc = store.get(Collection::Technicians, "t1").unwrap().unwrap();
        assert_eq!(doc["initials"], "CD");
        assert_eq!(store.count(Collection::Technicians).unwrap(), 1);
    }

    #[test]
    fn test_record_without_id_rejected() {
        let store = store();
        let err = store
            .insert(Collection::NoteEvents, &json!({"title": "x"}))
            .unwrap_err();
        assert!(matches!(err, ProdlogError::Format(_)));
    }

    #[test]
    fn test_scan_order_and_ties() {
        let store = store();
        for (id, date) in [("b", "2026-01-02"), ("a", "2026-01-02"), ("c", "2026-01-05")] {
            store
                .put(Collection::NoteEvents, &json!({"id": id, "date": date}))
                .unwrap();
        }
        let ids = |docs: Vec<Value>| -> Vec<String> {
            docs.iter()
                .map(|d| d["id"].as_str().unwrap().to_string())
                .collect()
        };

        let desc = store
            .scan(Collection::NoteEvents, Some(OrderBy::desc("date")))
            .unwrap();
        assert_eq!(ids(desc), vec!["c", "b", "a"]);

        let natural = store.scan(Collection::NoteEvents, None).unwrap();
        assert_eq!(ids(natural), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_find_eq_single_and_multi_entry() {
        let store = store();
        store
            .put(
                Collection::BatchTemplates,
                &json!({"id": "t1", "name": "Bread", "tags": ["bread", "daily"]}),
            )
            .unwrap();
        store
            .put(
                Collection::BatchTemplates,
                &json!({"id": "t2", "name": "Granola", "tags": ["batch"]}),
            )
            .unwrap();

        let by_tag = store
            .find_eq(Collection::BatchTemplates, "tags", "daily")
            .unwrap();
        assert_eq!(by_tag.len(), 1);
        assert_eq!(by_tag[0]["id"], "t1");

        let by_name = store
            .find_first(Collection::BatchTemplates, "name", "Granola")
            .unwrap()
            .unwrap();
        assert_eq!(by_name["id"], "t2");

        let err = store
            .find_eq(Collection::BatchTemplates, "materials", "x")
            .unwrap_err();
        assert!(matches!(err, ProdlogError::Schema(_)));
    }

    #[test]
    fn test_apply_is_atomic() {
        let store = store();
        store
            .put(Collection::NoteEvents, &json!({"id": "keep", "date": "2026-01-01"}))
            .unwrap();

        let ops = vec![
            WriteOp::Clear(Collection::NoteEvents),
            WriteOp::Put(Collection::NoteEvents, json!({"id": "new"})),
            WriteOp::Put(Collection::NoteEvents, json!({"no_id": true})),
        ];
        assert!(store.apply(&ops).is_err());

        let docs = store.scan(Collection::NoteEvents, None).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["id"], "keep");
    }
}
