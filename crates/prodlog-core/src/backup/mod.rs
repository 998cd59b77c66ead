//! Portable, versioned snapshots of the whole store.
//!
//! ## Protocol
//!
//! - Export always writes the current schema version
//! - Import accepts any recognised version and migrates it forward first
//! - `replace` clears every collection before inserting; `merge` upserts by id
//! - Both modes run as one store transaction: an import either lands fully
//!   or not at all

pub mod envelope;
pub mod migrate;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::error::{ProdlogError, Result};
use crate::repository::clock;
use crate::storage::schema::{schema_version, CURRENT_SCHEMA_VERSION};
use crate::storage::{Collection, RecordStore, WriteOp};

pub use envelope::{
    check, validate, BackupEnvelope, BackupPayload, BackupV1, BackupV2, DataV1, DataV2,
    SUPPORTED_VERSIONS,
};
pub use migrate::migrate;

/// How an import combines with existing data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    /// Upsert payload records by id; other records stay.
    #[default]
    Merge,
    /// Empty every collection, then insert the payload.
    Replace,
}

impl ImportMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ImportMode::Merge => "merge",
            ImportMode::Replace => "replace",
        }
    }
}

impl fmt::Display for ImportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImportMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "merge" => Ok(ImportMode::Merge),
            "replace" => Ok(ImportMode::Replace),
            other => Err(format!(
                "Unknown import mode '{}'. Expected merge or replace.",
                other
            )),
        }
    }
}

/// Record counts per collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupCounts {
    pub batch_templates: usize,
    pub production_runs: usize,
    pub note_events: usize,
    pub technicians: usize,
}

impl BackupCounts {
    pub fn of(data: &DataV2) -> Self {
        Self {
            batch_templates: data.batch_templates.len(),
            production_runs: data.production_runs.len(),
            note_events: data.note_events.len(),
            technicians: data.technicians.len(),
        }
    }

    pub fn total(&self) -> usize {
        self.batch_templates + self.production_runs + self.note_events + self.technicians
    }
}

/// Outcome of a successful import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    /// Version the payload declared before migration.
    pub source_version: u32,
    pub mode: ImportMode,
    pub counts: BackupCounts,
}

impl ImportSummary {
    pub fn migrated(&self) -> bool {
        self.source_version < CURRENT_SCHEMA_VERSION
    }
}

/// `prodlog-backup-YYYY-MM-DD.json` for the given day.
pub fn backup_file_name(date: NaiveDate) -> String {
    format!("prodlog-backup-{}.json", date.format("%Y-%m-%d"))
}

/// Backup file name for today, local time.
pub fn default_backup_file_name() -> String {
    backup_file_name(Local::now().date_naive())
}

/// Export and import against one store handle.
pub struct BackupCodec<'a, S: RecordStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: RecordStore + ?Sized> BackupCodec<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Snapshot every collection as stored.
    ///
    /// Collections the store's layout predates are exported empty. Reads are
    /// not isolated from concurrent writers.
    pub fn export(&self) -> Result<BackupV2> {
        let version = self.store.schema_version()?;
        let layout = schema_version(version).ok_or_else(|| {
            ProdlogError::Schema(format!("Store is at unknown schema version {}", version))
        })?;

        let mut data = DataV2::default();
        for collection in Collection::ALL {
            if layout.collection(collection).is_some() {
                *data.records_mut(collection) = self.store.scan(collection, None)?;
            }
        }

        let backup = BackupV2 {
            schema_version: CURRENT_SCHEMA_VERSION,
            exported_at: Some(clock::now_timestamp()),
            data,
        };
        let counts = BackupCounts::of(&backup.data);
        info!(records = counts.total(), "Exported backup");
        Ok(backup)
    }

    /// Export as pretty-printed JSON.
    pub fn export_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.export()?)?)
    }

    /// Export to `path`, replacing any existing file atomically.
    pub fn export_to_file(&self, path: &Path) -> Result<BackupCounts> {
        let backup = self.export()?;
        let mut json = serde_json::to_string_pretty(&backup)?;
        json.push('\n');
        crate::fs::write_atomic(path, json.as_bytes())?;
        info!(path = %path.display(), "Wrote backup file");
        Ok(BackupCounts::of(&backup.data))
    }

    /// Migrate `payload` to the current version and write it in one
    /// transaction.
    pub fn import(&self, payload: BackupPayload, mode: ImportMode) -> Result<ImportSummary> {
        let source_version = payload.schema_version();
        if source_version < CURRENT_SCHEMA_VERSION {
            warn!(
                from = source_version,
                to = CURRENT_SCHEMA_VERSION,
                "Importing backup from an older schema version"
            );
        }
        let current = migrate(payload);

        let mut ops = Vec::new();
        if mode == ImportMode::Replace {
            ops.extend(Collection::ALL.into_iter().map(WriteOp::Clear));
        }
        for collection in Collection::ALL {
            ops.extend(
                current
                    .data
                    .records(collection)
                    .iter()
                    .cloned()
                    .map(|record| WriteOp::Put(collection, record)),
            );
        }
        self.store.apply(&ops)?;

        let summary = ImportSummary {
            source_version,
            mode,
            counts: BackupCounts::of(&current.data),
        };
        info!(
            mode = %mode,
            source_version,
            records = summary.counts.total(),
            "Imported backup"
        );
        Ok(summary)
    }

    /// Validate then import an already-parsed document.
    ///
    /// A document that fails validation is rejected before the store is
    /// touched.
    pub fn import_value(&self, candidate: Value, mode: ImportMode) -> Result<ImportSummary> {
        self.import(BackupPayload::from_value(candidate)?, mode)
    }

    /// Parse, validate, and import backup text.
    pub fn import_json(&self, text: &str, mode: ImportMode) -> Result<ImportSummary> {
        let candidate: Value = serde_json::from_str(text)
            .map_err(|e| ProdlogError::Format(format!("Not valid JSON: {}", e)))?;
        self.import_value(candidate, mode)
    }

    /// Read and import a backup file.
    pub fn import_file(&self, path: &Path, mode: ImportMode) -> Result<ImportSummary> {
        let text = std::fs::read_to_string(path)?;
        self.import_json(&text, mode)
    }
}
