//! Declarative store layout, one entry per schema version.
//!
//! Each version lists every collection and index valid as of that version.
//! Versions only ever add structure; row contents are never rewritten by a
//! version bump.

use std::fmt;

/// The schema version new stores are created at and backups are written at.
pub const CURRENT_SCHEMA_VERSION: u32 = 2;

/// One entity collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    BatchTemplates,
    ProductionRuns,
    NoteEvents,
    Technicians,
}

impl Collection {
    /// Every collection known to this build, in backup order.
    pub const ALL: [Collection; 4] = [
        Collection::BatchTemplates,
        Collection::ProductionRuns,
        Collection::NoteEvents,
        Collection::Technicians,
    ];

    /// SQLite table name.
    pub fn table(self) -> &'static str {
        match self {
            Collection::BatchTemplates => "batch_templates",
            Collection::ProductionRuns => "production_runs",
            Collection::NoteEvents => "note_events",
            Collection::Technicians => "technicians",
        }
    }

    /// Key used in the backup document's `data` object.
    pub fn key(self) -> &'static str {
        match self {
            Collection::BatchTemplates => "batchTemplates",
            Collection::ProductionRuns => "productionRuns",
            Collection::NoteEvents => "noteEvents",
            Collection::Technicians => "technicians",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// An indexed field of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexSpec {
    /// JSON field name in the stored document.
    pub field: &'static str,
    /// The field holds an array; each element is matched separately.
    pub multi_entry: bool,
}

const fn index(field: &'static str) -> IndexSpec {
    IndexSpec {
        field,
        multi_entry: false,
    }
}

const fn multi(field: &'static str) -> IndexSpec {
    IndexSpec {
        field,
        multi_entry: true,
    }
}

/// A collection and its indexes as declared by one schema version.
#[derive(Debug, Clone, Copy)]
pub struct CollectionSpec {
    pub collection: Collection,
    pub indexes: &'static [IndexSpec],
}

impl CollectionSpec {
    pub fn index(&self, field: &str) -> Option<&'static IndexSpec> {
        self.indexes.iter().find(|spec| spec.field == field)
    }
}

/// The full layout valid as of one version.
#[derive(Debug, Clone, Copy)]
pub struct SchemaVersion {
    pub version: u32,
    pub collections: &'static [CollectionSpec],
}

impl SchemaVersion {
    pub fn collection(&self, collection: Collection) -> Option<&'static CollectionSpec> {
        self.collections.iter().find(|c| c.collection == collection)
    }
}

const BATCH_TEMPLATES: CollectionSpec = CollectionSpec {
    collection: Collection::BatchTemplates,
    indexes: &[
        index("name"),
        multi("tags"),
        index("createdAt"),
        index("updatedAt"),
    ],
};

const PRODUCTION_RUNS: CollectionSpec = CollectionSpec {
    collection: Collection::ProductionRuns,
    indexes: &[
        index("date"),
        index("shift"),
        index("batchCode"),
        index("templateId"),
        index("technician"),
        index("status"),
        index("createdAt"),
        index("updatedAt"),
    ],
};

const NOTE_EVENTS: CollectionSpec = CollectionSpec {
    collection: Collection::NoteEvents,
    indexes: &[
        index("date"),
        index("category"),
        index("createdAt"),
        index("updatedAt"),
    ],
};

const TECHNICIANS: CollectionSpec = CollectionSpec {
    collection: Collection::Technicians,
    indexes: &[index("initials"), index("createdAt"), index("updatedAt")],
};

const V1: SchemaVersion = SchemaVersion {
    version: 1,
    collections: &[BATCH_TEMPLATES, PRODUCTION_RUNS, NOTE_EVENTS],
};

/// Adds the technicians collection.
const V2: SchemaVersion = SchemaVersion {
    version: 2,
    collections: &[BATCH_TEMPLATES, PRODUCTION_RUNS, NOTE_EVENTS, TECHNICIANS],
};

/// Every schema version, oldest first.
pub const SCHEMA_VERSIONS: &[SchemaVersion] = &[V1, V2];

/// Look up a declared schema version.
pub fn schema_version(version: u32) -> Option<&'static SchemaVersion> {
    SCHEMA_VERSIONS.iter().find(|s| s.version == version)
}

/// The layout at [`CURRENT_SCHEMA_VERSION`].
pub fn current_schema() -> &'static SchemaVersion {
    &V2
}

/// SQL expression reading `field` out of a stored document.
///
/// Queries must use exactly this text for SQLite to pick the index.
pub(crate) fn field_expr(field: &str) -> String {
    format!("json_extract(doc, '$.{}')", field)
}

/// DDL creating `spec`'s table and indexes; safe to re-run.
pub(crate) fn collection_ddl(spec: &CollectionSpec) -> String {
    let table = spec.collection.table();
    let mut sql = format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    id TEXT PRIMARY KEY,\n    doc TEXT NOT NULL\n);\n",
        table
    );
    // Array fields are matched through json_each and carry no expression index.
    for idx in spec.indexes.iter().filter(|idx| !idx.multi_entry) {
        sql.push_str(&format!(
            "CREATE INDEX IF NOT EXISTS idx_{}_{} ON {} ({});\n",
            table,
            idx.field,
            table,
            field_expr(idx.field)
        ));
    }
    sql
}
