use rusqlite::Connection;
use serde_json::json;
use tempfile::tempdir;

use prodlog_core::storage::{Collection, OrderBy, RecordStore, SqliteStore};
use prodlog_core::{ErrorCategory, ProdlogError, Repository, CURRENT_SCHEMA_VERSION};

fn legacy_template() -> serde_json::Value {
    json!({
        "id": "legacy-1",
        "name": "Pan artesanal",
        "materials": [{"name": "Harina"}],
        "createdAt": "2025-01-01T00:00:00.000Z",
        "updatedAt": "2025-01-01T00:00:00.000Z",
        "legacyColor": "amber"
    })
}

/// Lay out a version 1 database by hand, the way an older build wrote it.
fn write_v1_database(path: &std::path::Path) {
    let conn = Connection::open(path).expect("open sqlite");
    conn.execute_batch(
        r#"
        CREATE TABLE batch_templates (id TEXT PRIMARY KEY, doc TEXT NOT NULL);
        CREATE TABLE production_runs (id TEXT PRIMARY KEY, doc TEXT NOT NULL);
        CREATE TABLE note_events (id TEXT PRIMARY KEY, doc TEXT NOT NULL);
        PRAGMA user_version = 1;
        "#,
    )
    .expect("create v1 layout");
    conn.execute(
        "INSERT INTO batch_templates (id, doc) VALUES (?1, ?2)",
        ("legacy-1", legacy_template().to_string()),
    )
    .expect("insert legacy row");
}

#[test]
fn test_v1_database_is_upgraded_in_place() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("prodlog.db");
    write_v1_database(&path);

    let store = SqliteStore::open(&path).expect("open should upgrade");
    assert_eq!(store.schema_version().expect("version"), CURRENT_SCHEMA_VERSION);

    // Existing documents survive verbatim, unknown keys included.
    let doc = store
        .get(Collection::BatchTemplates, "legacy-1")
        .expect("get")
        .expect("legacy record");
    assert_eq!(doc, legacy_template());

    // Version 2 structure is usable.
    let repo = Repository::new(&store);
    repo.create_technician(prodlog_core::model::NewTechnician::new("AB"))
        .expect("technicians collection exists after upgrade");
    assert_eq!(store.count(Collection::Technicians).expect("count"), 1);

    // Indexes added by the upgrade serve ordered scans.
    let scanned = store
        .scan(Collection::BatchTemplates, Some(OrderBy::desc("updatedAt")))
        .expect("scan");
    assert_eq!(scanned.len(), 1);
    store.check_integrity().expect("integrity after upgrade");
}

#[test]
fn test_store_opened_at_v1_then_current() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("nested").join("prodlog.db");

    {
        let v1 = SqliteStore::open_at(&path, 1).expect("open at v1");
        assert_eq!(v1.schema_version().expect("version"), 1);
        assert!(v1.count(Collection::Technicians).is_err());
        v1.insert(Collection::BatchTemplates, &legacy_template())
            .expect("insert");
    }

    let current = SqliteStore::open(&path).expect("reopen");
    assert_eq!(current.schema_version().expect("version"), 2);
    assert_eq!(current.count(Collection::BatchTemplates).expect("count"), 1);
    assert_eq!(current.count(Collection::Technicians).expect("count"), 0);
}

#[test]
fn test_newer_store_is_refused() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("future.db");
    {
        let conn = Connection::open(&path).expect("open sqlite");
        conn.execute_batch("PRAGMA user_version = 9;")
            .expect("set version");
    }

    let err = match SqliteStore::open(&path) {
        Ok(_) => panic!("a newer store must not open"),
        Err(err) => err,
    };
    assert!(matches!(err, ProdlogError::Schema(_)));
    assert_eq!(err.category(), ErrorCategory::Storage);
}

#[test]
fn test_corrupt_document_fails_integrity_check() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("prodlog.db");
    drop(SqliteStore::open(&path).expect("create"));

    {
        let conn = Connection::open(&path).expect("open sqlite");
        conn.execute(
            "INSERT INTO note_events (id, doc) VALUES ('n1', '{broken')",
            [],
        )
        .expect("insert corrupt row");
    }

    let store = SqliteStore::open(&path).expect("open");
    let err = store.check_integrity().expect_err("corrupt row detected");
    assert!(matches!(err, ProdlogError::CorruptRecord { .. }));
}
