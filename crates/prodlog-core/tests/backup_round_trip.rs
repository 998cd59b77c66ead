use std::path::Path;

use serde_json::{json, Value};
use tempfile::tempdir;

use prodlog_core::backup::{self, BackupPayload, BackupV1, DataV1};
use prodlog_core::model::{
    MaterialItem, NewBatchTemplate, NewNoteEvent, NewProductionRun, NewTechnician, NoteCategory,
    ProductionRunPatch, Replacement, RunStatus, Shift, StatusChange,
};
use prodlog_core::storage::{Collection, RecordStore};
use prodlog_core::{BackupCodec, ErrorCategory, ImportMode, ProdlogError, Repository, SqliteStore};

fn open_store(dir: &Path, name: &str) -> SqliteStore {
    SqliteStore::open(&dir.join(name)).expect("open store")
}

/// Every collection, as stored, in id order.
fn snapshot(store: &SqliteStore) -> Vec<Vec<Value>> {
    Collection::ALL
        .iter()
        .map(|c| store.scan(*c, None).expect("scan"))
        .collect()
}

fn populate(store: &SqliteStore) {
    let repo = Repository::new(store);
    let bread = repo
        .create_batch_template(
            NewBatchTemplate::new(
                "Artisan bread",
                vec![
                    MaterialItem::new("Flour").with_notes("W320"),
                    MaterialItem::new("Water"),
                ],
            )
            .with_tags(vec!["bread".into(), "daily".into()]),
        )
        .expect("template");
    let granola = repo
        .create_batch_template(NewBatchTemplate::new(
            "Granola base",
            vec![MaterialItem::new("Oats")],
        ))
        .expect("template");

    let run = repo
        .create_production_run(
            NewProductionRun::new("2026-04-02", Shift::Morning, "000000001", &bread.id, 120.0, "AB")
                .with_notes("First batch"),
        )
        .expect("run");
    repo.update_production_run(
        &run.id,
        ProductionRunPatch {
            actual_units: Some(Some(118.5)),
            ..Default::default()
        },
    )
    .expect("update");
    repo.set_run_status(
        &run.id,
        StatusChange::new(RunStatus::Changed)
            .with_reason("Flour shortage")
            .with_replacement(Replacement::Template(granola.id.clone())),
    )
    .expect("status");

    repo.create_note_event(
        NewNoteEvent::new("2026-04-03", "Oven check", NoteCategory::Reminder).with_body("Tuesday"),
    )
    .expect("note");
    repo.create_technician(NewTechnician::new("AB")).expect("tech");
}

#[test]
fn test_export_import_replace_is_lossless() {
    let dir = tempdir().expect("tempdir");
    let source = open_store(dir.path(), "source.db");
    populate(&source);
    // A document written by some other build, with a key this one does not know.
    source
        .put(
            Collection::NoteEvents,
            &json!({
                "id": "foreign",
                "date": "2026-04-04",
                "title": "Imported",
                "category": "other",
                "createdAt": "2026-04-04T00:00:00.000Z",
                "updatedAt": "2026-04-04T00:00:00.000Z",
                "attachments": ["photo-1.jpg"]
            }),
        )
        .expect("put");

    let file = dir.path().join("out").join(backup::default_backup_file_name());
    let counts = BackupCodec::new(&source)
        .export_to_file(&file)
        .expect("export");
    assert_eq!(counts.total(), 6);

    let target = open_store(dir.path(), "target.db");
    let summary = BackupCodec::new(&target)
        .import_file(&file, ImportMode::Replace)
        .expect("import");
    assert_eq!(summary.source_version, 2);
    assert!(!summary.migrated());
    assert_eq!(summary.counts, counts);

    assert_eq!(snapshot(&target), snapshot(&source));
}

#[test]
fn test_import_export_replace_into_same_store_is_identity() {
    let dir = tempdir().expect("tempdir");
    let store = open_store(dir.path(), "prodlog.db");
    populate(&store);
    let before = snapshot(&store);

    let codec = BackupCodec::new(&store);
    let exported = codec.export().expect("export");
    codec
        .import(BackupPayload::V2(exported), ImportMode::Replace)
        .expect("import");

    assert_eq!(snapshot(&store), before);
}

#[test]
fn test_v1_backup_is_migrated_on_import() {
    let dir = tempdir().expect("tempdir");
    let store = open_store(dir.path(), "prodlog.db");

    let text = json!({
        "schemaVersion": 1,
        "exportedAt": "2025-11-30T18:00:00.000Z",
        "data": {
            "batchTemplates": [{
                "id": "t1",
                "name": "Galleta integral",
                "materials": [{"name": "Harina integral"}],
                "createdAt": "2025-11-01T00:00:00.000Z",
                "updatedAt": "2025-11-01T00:00:00.000Z"
            }],
            "productionRuns": [{
                "id": "r1",
                "date": "2025-11-02",
                "shift": "afternoon",
                "batchCode": "123456789",
                "templateId": "t1",
                "plannedUnits": 40,
                "technician": "CD",
                "status": "done",
                "createdAt": "2025-11-02T00:00:00.000Z",
                "updatedAt": "2025-11-02T00:00:00.000Z"
            }],
            "noteEvents": []
        }
    })
    .to_string();

    let summary = BackupCodec::new(&store)
        .import_json(&text, ImportMode::Merge)
        .expect("import v1");
    assert_eq!(summary.source_version, 1);
    assert!(summary.migrated());
    assert_eq!(summary.counts.technicians, 0);

    let repo = Repository::new(&store);
    let run = repo.get_production_run("r1").expect("get").expect("run");
    assert_eq!(run.status, RunStatus::Done);
    assert_eq!(repo.resolve_template(&run.template_id).expect("resolve").name(), "Galleta integral");
    assert!(repo.list_technicians().expect("list").is_empty());
}

#[test]
fn test_merge_of_legacy_run_keeps_valid_runs_listed() {
    let dir = tempdir().expect("tempdir");
    let store = open_store(dir.path(), "legacy.db");
    let repo = Repository::new(&store);
    let kept = repo
        .create_production_run(NewProductionRun::new(
            "2026-04-02",
            Shift::Morning,
            "000000001",
            "t1",
            120.0,
            "AB",
        ))
        .expect("run");

    let legacy = json!({
        "schemaVersion": 1,
        "exportedAt": "2025-11-30T18:00:00.000Z",
        "data": {
            "batchTemplates": [],
            "productionRuns": [{
                "id": "x",
                "date": "2025-11-02",
                "shift": "mañana",
                "batchCode": "1",
                "templateId": "t1",
                "plannedUnits": 40,
                "technician": "AB",
                "status": "previsto"
            }],
            "noteEvents": []
        }
    });
    assert!(backup::validate(&legacy));
    BackupCodec::new(&store)
        .import_value(legacy, ImportMode::Merge)
        .expect("structurally valid backup imports as-is");

    let runs = repo.list_production_runs().expect("list");
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].id, kept.id);
    assert_eq!(repo.list_runs_by_technician("AB").expect("by technician").len(), 1);

    // The raw document survives for the next export.
    assert!(store.get(Collection::ProductionRuns, "x").expect("get").is_some());
    let issues = repo.check_records().expect("check");
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].category(), ErrorCategory::Storage);
}

#[test]
fn test_migrate_law() {
    let v1 = BackupV1 {
        schema_version: 1,
        exported_at: Some("2025-11-30T18:00:00.000Z".into()),
        data: DataV1 {
            batch_templates: vec![json!({"id": "t1"})],
            production_runs: vec![json!({"id": "r1"}), json!({"id": "r2"})],
            note_events: vec![json!({"id": "n1"})],
        },
    };

    let v2 = backup::migrate(BackupPayload::V1(v1.clone()));
    assert_eq!(v2.schema_version, 2);
    assert_eq!(v2.exported_at, v1.exported_at);
    assert_eq!(v2.data.batch_templates, v1.data.batch_templates);
    assert_eq!(v2.data.production_runs, v1.data.production_runs);
    assert_eq!(v2.data.note_events, v1.data.note_events);
    assert!(v2.data.technicians.is_empty());

    assert_eq!(backup::migrate(BackupPayload::V2(v2.clone())), v2);
}

fn run_doc(id: &str, technician: &str) -> Value {
    json!({
        "id": id,
        "date": "2026-02-01",
        "shift": "morning",
        "batchCode": "000000001",
        "templateId": "t1",
        "plannedUnits": 10,
        "technician": technician,
        "status": "planned",
        "createdAt": "2026-02-01T00:00:00.000Z",
        "updatedAt": "2026-02-01T00:00:00.000Z"
    })
}

fn payload_a_prime_and_b() -> Value {
    json!({
        "schemaVersion": 2,
        "exportedAt": "2026-02-02T00:00:00.000Z",
        "data": {
            "batchTemplates": [],
            "productionRuns": [run_doc("A", "ZZ"), run_doc("B", "BB")],
            "noteEvents": [],
            "technicians": []
        }
    })
}

fn store_with_a_and_c(dir: &Path, name: &str) -> SqliteStore {
    let store = open_store(dir, name);
    store
        .insert(Collection::ProductionRuns, &run_doc("A", "AA"))
        .expect("insert A");
    store
        .insert(Collection::ProductionRuns, &run_doc("C", "CC"))
        .expect("insert C");
    store
}

fn run_ids(store: &SqliteStore) -> Vec<String> {
    store
        .scan(Collection::ProductionRuns, None)
        .expect("scan")
        .iter()
        .filter_map(|doc| doc["id"].as_str().map(str::to_string))
        .collect()
}

#[test]
fn test_merge_keeps_unlisted_records() {
    let dir = tempdir().expect("tempdir");
    let store = store_with_a_and_c(dir.path(), "merge.db");

    BackupCodec::new(&store)
        .import_value(payload_a_prime_and_b(), ImportMode::Merge)
        .expect("merge");

    assert_eq!(run_ids(&store), vec!["A", "B", "C"]);
    let a = store
        .get(Collection::ProductionRuns, "A")
        .expect("get")
        .expect("A");
    assert_eq!(a, run_doc("A", "ZZ"));
}

#[test]
fn test_replace_keeps_only_payload() {
    let dir = tempdir().expect("tempdir");
    let store = store_with_a_and_c(dir.path(), "replace.db");
    Repository::new(&store)
        .create_technician(NewTechnician::new("XY"))
        .expect("tech");

    BackupCodec::new(&store)
        .import_value(payload_a_prime_and_b(), ImportMode::Replace)
        .expect("replace");

    assert_eq!(run_ids(&store), vec!["A", "B"]);
    assert_eq!(store.count(Collection::Technicians).expect("count"), 0);
}

#[test]
fn test_validate_rejections() {
    assert!(!backup::validate(&json!({})));
    assert!(!backup::validate(&json!({"schemaVersion": 99, "data": {}})));
    assert!(!backup::validate(&json!({
        "schemaVersion": 1,
        "data": {"batchTemplates": "not-an-array", "productionRuns": [], "noteEvents": []}
    })));
    assert!(backup::validate(&payload_a_prime_and_b()));
}

#[test]
fn test_rejected_import_leaves_store_untouched() {
    let dir = tempdir().expect("tempdir");
    let store = store_with_a_and_c(dir.path(), "untouched.db");
    let before = snapshot(&store);
    let codec = BackupCodec::new(&store);

    let bad = [
        "{}".to_string(),
        r#"{"schemaVersion": 99, "data": {}}"#.to_string(),
        r#"{"schemaVersion": 1, "data": {"batchTemplates": "not-an-array", "productionRuns": [], "noteEvents": []}}"#.to_string(),
        "not json at all".to_string(),
    ];
    for text in &bad {
        let err = codec
            .import_json(text, ImportMode::Replace)
            .expect_err("invalid backup must be rejected");
        assert_eq!(err.category(), ErrorCategory::Format);
    }

    let err = codec
        .import_json(r#"{"schemaVersion": 3, "data": {}}"#, ImportMode::Merge)
        .expect_err("unknown version");
    assert!(matches!(err, ProdlogError::UnsupportedSchemaVersion(_)));

    assert_eq!(snapshot(&store), before);
}
