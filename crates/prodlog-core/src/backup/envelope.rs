//! Backup document shapes, one per schema version.
//!
//! A backup is `{schemaVersion, exportedAt, data}`. The version tag alone
//! selects the decoder; the shape of `data` is never used to guess it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ProdlogError, Result};
use crate::storage::Collection;

/// Common wrapper around a versioned `data` object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupEnvelope<D> {
    pub schema_version: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exported_at: Option<String>,

    pub data: D,
}

/// Collections carried by a version 1 backup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataV1 {
    pub batch_templates: Vec<Value>,
    pub production_runs: Vec<Value>,
    pub note_events: Vec<Value>,
}

/// Collections carried by a version 2 backup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataV2 {
    pub batch_templates: Vec<Value>,
    pub production_runs: Vec<Value>,
    pub note_events: Vec<Value>,
    pub technicians: Vec<Value>,
}

impl DataV2 {
    /// Records of one collection.
    pub fn records(&self, collection: Collection) -> &[Value] {
        match collection {
            Collection::BatchTemplates => &self.batch_templates,
            Collection::ProductionRuns => &self.production_runs,
            Collection::NoteEvents => &self.note_events,
            Collection::Technicians => &self.technicians,
        }
    }

    pub(crate) fn records_mut(&mut self, collection: Collection) -> &mut Vec<Value> {
        match collection {
            Collection::BatchTemplates => &mut self.batch_templates,
            Collection::ProductionRuns => &mut self.production_runs,
            Collection::NoteEvents => &mut self.note_events,
            Collection::Technicians => &mut self.technicians,
        }
    }
}

pub type BackupV1 = BackupEnvelope<DataV1>;
pub type BackupV2 = BackupEnvelope<DataV2>;

/// A decoded backup of any recognised version.
#[derive(Debug, Clone, PartialEq)]
pub enum BackupPayload {
    V1(BackupV1),
    V2(BackupV2),
}

/// Versions this build can read, oldest first.
pub const SUPPORTED_VERSIONS: &[u32] = &[1, 2];

/// Array fields `data` must carry for a given version.
fn required_fields(version: u32) -> Option<&'static [&'static str]> {
    match version {
        1 => Some(&["batchTemplates", "productionRuns", "noteEvents"]),
        2 => Some(&["batchTemplates", "productionRuns", "noteEvents", "technicians"]),
        _ => None,
    }
}

/// Structural check of a candidate backup. Returns the declared version.
///
/// Only the envelope is inspected: records inside the arrays are not.
pub fn check(candidate: &Value) -> Result<u32> {
    let object = candidate
        .as_object()
        .ok_or_else(|| ProdlogError::Format("Backup must be a JSON object".into()))?;

    let version = match object.get("schemaVersion") {
        None => return Err(ProdlogError::Format("Missing schemaVersion".into())),
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| ProdlogError::UnsupportedSchemaVersion(n.to_string()))?,
        Some(other) => {
            return Err(ProdlogError::Format(format!(
                "schemaVersion must be an integer, got {}",
                other
            )))
        }
    };
    let fields = required_fields(version)
        .ok_or_else(|| ProdlogError::UnsupportedSchemaVersion(version.to_string()))?;

    let data = object
        .get("data")
        .and_then(Value::as_object)
        .ok_or_else(|| ProdlogError::Format("data must be an object".into()))?;
    check_arrays(data, fields)?;

    if let Some(exported_at) = object.get("exportedAt") {
        if !exported_at.is_string() {
            return Err(ProdlogError::Format("exportedAt must be a string".into()));
        }
    }

    Ok(version)
}

fn check_arrays(data: &Map<String, Value>, fields: &[&str]) -> Result<()> {
    for field in fields {
        match data.get(*field) {
            Some(Value::Array(_)) => {}
            Some(_) => {
                return Err(ProdlogError::Format(format!(
                    "data.{} must be an array",
                    field
                )))
            }
            None => return Err(ProdlogError::Format(format!("data.{} is missing", field))),
        }
    }
    Ok(())
}

/// True when `candidate` is a structurally valid backup of a known version.
pub fn validate(candidate: &Value) -> bool {
    check(candidate).is_ok()
}

impl BackupPayload {
    /// Validate and decode a backup document by its version tag.
    pub fn from_value(candidate: Value) -> Result<Self> {
        let version = check(&candidate)?;
        let decode_err = |e: serde_json::Error| ProdlogError::Format(e.to_string());
        match version {
            1 => serde_json::from_value(candidate)
                .map(BackupPayload::V1)
                .map_err(decode_err),
            2 => serde_json::from_value(candidate)
                .map(BackupPayload::V2)
                .map_err(decode_err),
            other => Err(ProdlogError::UnsupportedSchemaVersion(other.to_string())),
        }
    }

    pub fn schema_version(&self) -> u32 {
        match self {
            BackupPayload::V1(payload) => payload.schema_version,
            BackupPayload::V2(payload) => payload.schema_version,
        }
    }

    pub fn exported_at(&self) -> Option<&str> {
        match self {
            BackupPayload::V1(payload) => payload.exported_at.as_deref(),
            BackupPayload::V2(payload) => payload.exported_at.as_deref(),
        }
    }
}
