//! Persisted entity types and their caller-facing input and patch types.
//!
//! Field names serialize as camelCase so stored documents and backup files
//! share one shape. Absent optional fields are omitted rather than written
//! as `null`.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::change_log::StatusChange;
use super::patch::Changes;
use super::validation;
use super::Record;
use crate::error::Result;
use crate::storage::Collection;

/// One raw material line of a batch template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialItem {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl MaterialItem {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// A reusable recipe / lot definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchTemplate {
    pub id: String,
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,

    pub materials: Vec<MaterialItem>,
    pub created_at: String,
    pub updated_at: String,
}

/// Production shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shift {
    Morning,
    Afternoon,
}

impl Shift {
    pub fn as_str(self) -> &'static str {
        match self {
            Shift::Morning => "morning",
            Shift::Afternoon => "afternoon",
        }
    }
}

/// Lifecycle status of a production run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Planned,
    Done,
    Changed,
    Canceled,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Planned => "planned",
            RunStatus::Done => "done",
            RunStatus::Changed => "changed",
            RunStatus::Canceled => "canceled",
        }
    }

    /// The change-log entry type recorded when a run moves into this status.
    pub fn change_type(self) -> Option<ChangeType> {
        match self {
            RunStatus::Changed => Some(ChangeType::Changed),
            RunStatus::Canceled => Some(ChangeType::Canceled),
            RunStatus::Planned | RunStatus::Done => None,
        }
    }
}

impl FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "planned" => Ok(RunStatus::Planned),
            "done" => Ok(RunStatus::Done),
            "changed" => Ok(RunStatus::Changed),
            "canceled" | "cancelled" => Ok(RunStatus::Canceled),
            other => Err(format!(
                "Unknown status '{}'. Expected planned, done, changed or canceled.",
                other
            )),
        }
    }
}

/// Kind of a change-log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Changed,
    Canceled,
}

/// Immutable audit record appended when a run is changed or canceled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeLogEntry {
    pub timestamp: String,

    #[serde(rename = "type")]
    pub kind: ChangeType,

    pub detail: String,
}

/// One scheduled or executed production of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductionRun {
    pub id: String,
    pub date: String,
    pub shift: Shift,
    pub batch_code: String,

    /// Soft reference; the template may no longer exist.
    pub template_id: String,

    pub planned_units: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_units: Option<f64>,

    /// Free text or technician initials; not a strict reference.
    pub technician: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    pub status: RunStatus,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub change_log: Vec<ChangeLogEntry>,

    pub created_at: String,
    pub updated_at: String,
}

/// Category of a free-form note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteCategory {
    Proposal,
    Incident,
    Reminder,
    Other,
}

impl NoteCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            NoteCategory::Proposal => "proposal",
            NoteCategory::Incident => "incident",
            NoteCategory::Reminder => "reminder",
            NoteCategory::Other => "other",
        }
    }
}

impl FromStr for NoteCategory {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "proposal" => Ok(NoteCategory::Proposal),
            "incident" => Ok(NoteCategory::Incident),
            "reminder" => Ok(NoteCategory::Reminder),
            "other" => Ok(NoteCategory::Other),
            other => Err(format!(
                "Unknown category '{}'. Expected proposal, incident, reminder or other.",
                other
            )),
        }
    }
}

/// A dated free-form note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteEvent {
    pub id: String,
    pub date: String,
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,

    pub category: NoteCategory,
    pub created_at: String,
    pub updated_at: String,
}

/// A technician, identified by initials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Technician {
    pub id: String,
    pub initials: String,
    pub created_at: String,
    pub updated_at: String,
}

macro_rules! record_accessors {
    () => {
        fn id(&self) -> &str {
            &self.id
        }

        fn updated_at(&self) -> &str {
            &self.updated_at
        }

        fn set_updated_at(&mut self, value: String) {
            self.updated_at = value;
        }
    };
}

impl Record for BatchTemplate {
    const COLLECTION: Collection = Collection::BatchTemplates;
    const FIELDS: &'static [&'static str] = &["name", "tags", "materials"];

    record_accessors!();

    fn validate(self) -> Result<Self> {
        validation::normalize_template(self)
    }
}

impl Record for ProductionRun {
    const COLLECTION: Collection = Collection::ProductionRuns;
    const FIELDS: &'static [&'static str] = &[
        "date",
        "shift",
        "batchCode",
        "templateId",
        "plannedUnits",
        "actualUnits",
        "technician",
        "notes",
        "status",
        "changeLog",
    ];

    record_accessors!();

    fn validate(self) -> Result<Self> {
        validation::normalize_run(self)
    }
}

impl Record for NoteEvent {
    const COLLECTION: Collection = Collection::NoteEvents;
    const FIELDS: &'static [&'static str] = &["date", "title", "body", "category"];

    record_accessors!();

    fn validate(self) -> Result<Self> {
        validation::normalize_note(self)
    }
}

impl Record for Technician {
    const COLLECTION: Collection = Collection::Technicians;
    const FIELDS: &'static [&'static str] = &["initials"];

    record_accessors!();

    fn validate(self) -> Result<Self> {
        validation::normalize_technician(self)
    }
}

// --- Inputs ---

/// Builder for creating new batch templates.
#[derive(Debug, Clone, Default)]
pub struct NewBatchTemplate {
    /// Caller-chosen id; generated when absent
    pub id: Option<String>,
    pub name: String,
    pub tags: Option<Vec<String>>,
    pub materials: Vec<MaterialItem>,
}

impl NewBatchTemplate {
    pub fn new(name: impl Into<String>, materials: Vec<MaterialItem>) -> Self {
        Self {
            id: None,
            name: name.into(),
            tags: None,
            materials,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = Some(tags);
        self
    }

    pub(crate) fn into_record(self, id: String, timestamp: String) -> BatchTemplate {
        BatchTemplate {
            id,
            name: self.name,
            tags: self.tags,
            materials: self.materials,
            created_at: timestamp.clone(),
            updated_at: timestamp,
        }
    }
}

/// Builder for creating new production runs.
///
/// A run created as planned or done starts with an empty change log.
#[derive(Debug, Clone)]
pub struct NewProductionRun {
    pub id: Option<String>,
    pub date: String,
    pub shift: Shift,
    pub batch_code: String,
    pub template_id: String,
    pub planned_units: f64,
    pub actual_units: Option<f64>,
    pub technician: String,
    pub notes: Option<String>,
    /// Initial status. Starting as changed or canceled needs a reason and
    /// seeds the change log with one entry.
    pub status: StatusChange,
}

impl NewProductionRun {
    pub fn new(
        date: impl Into<String>,
        shift: Shift,
        batch_code: impl Into<String>,
        template_id: impl Into<String>,
        planned_units: f64,
        technician: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            date: date.into(),
            shift,
            batch_code: batch_code.into(),
            template_id: template_id.into(),
            planned_units,
            actual_units: None,
            technician: technician.into(),
            notes: None,
            status: StatusChange::new(RunStatus::Planned),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_actual_units(mut self, units: f64) -> Self {
        self.actual_units = Some(units);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_status(mut self, status: RunStatus) -> Self {
        self.status = StatusChange::new(status);
        self
    }

    pub fn with_status_change(mut self, change: StatusChange) -> Self {
        self.status = change;
        self
    }

    pub(crate) fn into_record(
        self,
        id: String,
        timestamp: String,
        change_log: Vec<ChangeLogEntry>,
    ) -> ProductionRun {
        ProductionRun {
            id,
            date: self.date,
            shift: self.shift,
            batch_code: self.batch_code,
            template_id: self.template_id,
            planned_units: self.planned_units,
            actual_units: self.actual_units,
            technician: self.technician,
            notes: self.notes,
            status: self.status.status,
            change_log,
            created_at: timestamp.clone(),
            updated_at: timestamp,
        }
    }
}

/// Builder for creating new notes.
#[derive(Debug, Clone)]
pub struct NewNoteEvent {
    pub id: Option<String>,
    pub date: String,
    pub title: String,
    pub body: Option<String>,
    pub category: NoteCategory,
}

impl NewNoteEvent {
    pub fn new(date: impl Into<String>, title: impl Into<String>, category: NoteCategory) -> Self {
        Self {
            id: None,
            date: date.into(),
            title: title.into(),
            body: None,
            category,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub(crate) fn into_record(self, id: String, timestamp: String) -> NoteEvent {
        NoteEvent {
            id,
            date: self.date,
            title: self.title,
            body: self.body,
            category: self.category,
            created_at: timestamp.clone(),
            updated_at: timestamp,
        }
    }
}

/// Builder for creating new technicians.
#[derive(Debug, Clone)]
pub struct NewTechnician {
    pub id: Option<String>,
    pub initials: String,
}

impl NewTechnician {
    pub fn new(initials: impl Into<String>) -> Self {
        Self {
            id: None,
            initials: initials.into(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub(crate) fn into_record(self, id: String, timestamp: String) -> Technician {
        Technician {
            id,
            initials: self.initials,
            created_at: timestamp.clone(),
            updated_at: timestamp,
        }
    }
}

// --- Patches ---
//
// `None` leaves a field untouched. For optional fields, `Some(None)` clears it.

/// Partial changes to a batch template.
#[derive(Debug, Clone, Default)]
pub struct BatchTemplatePatch {
    pub name: Option<String>,
    pub tags: Option<Option<Vec<String>>>,
    pub materials: Option<Vec<MaterialItem>>,
}

impl BatchTemplatePatch {
    pub(crate) fn into_changes(self) -> Result<Changes> {
        let mut changes = Changes::new();
        changes.set("name", self.name)?;
        changes.set_optional("tags", self.tags)?;
        changes.set("materials", self.materials)?;
        Ok(changes)
    }
}

/// Partial changes to a production run.
///
/// Status and change log are not patchable; use
/// [`Repository::set_run_status`](crate::repository::Repository::set_run_status)
/// so every transition into changed/canceled is logged.
#[derive(Debug, Clone, Default)]
pub struct ProductionRunPatch {
    pub date: Option<String>,
    pub shift: Option<Shift>,
    pub batch_code: Option<String>,
    pub template_id: Option<String>,
    pub planned_units: Option<f64>,
    pub actual_units: Option<Option<f64>>,
    pub technician: Option<String>,
    pub notes: Option<Option<String>>,
}

impl ProductionRunPatch {
    pub(crate) fn into_changes(self) -> Result<Changes> {
        let mut changes = Changes::new();
        changes.set("date", self.date)?;
        changes.set("shift", self.shift)?;
        changes.set("batchCode", self.batch_code)?;
        changes.set("templateId", self.template_id)?;
        changes.set("plannedUnits", self.planned_units)?;
        changes.set_optional("actualUnits", self.actual_units)?;
        changes.set("technician", self.technician)?;
        changes.set_optional("notes", self.notes)?;
        Ok(changes)
    }
}

/// Partial changes to a note.
#[derive(Debug, Clone, Default)]
pub struct NoteEventPatch {
    pub date: Option<String>,
    pub title: Option<String>,
    pub body: Option<Option<String>>,
    pub category: Option<NoteCategory>,
}

impl NoteEventPatch {
    pub(crate) fn into_changes(self) -> Result<Changes> {
        let mut changes = Changes::new();
        changes.set("date", self.date)?;
        changes.set("title", self.title)?;
        changes.set_optional("body", self.body)?;
        changes.set("category", self.category)?;
        Ok(changes)
    }
}

/// Partial changes to a technician.
#[derive(Debug, Clone, Default)]
pub struct TechnicianPatch {
    pub initials: Option<String>,
}

impl TechnicianPatch {
    pub(crate) fn into_changes(self) -> Result<Changes> {
        let mut changes = Changes::new();
        changes.set("initials", self.initials)?;
        Ok(changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_run_serializes_camel_case_and_omits_absent_fields() {
        let run = NewProductionRun::new(
            "2026-03-01",
            Shift::Morning,
            "000000001",
            "tpl-1",
            120.0,
            "AB",
        )
        .into_record(
            "run-1".into(),
            "2026-03-01T08:00:00.000Z".into(),
            Vec::new(),
        );

        let value = serde_json::to_value(&run).unwrap();
        assert_eq!(value["batchCode"], json!("000000001"));
        assert_eq!(value["shift"], json!("morning"));
        assert_eq!(value["status"], json!("planned"));
        assert!(value.get("actualUnits").is_none());
        assert!(value.get("notes").is_none());
        assert!(value.get("changeLog").is_none());
    }

    #[test]
    fn test_change_log_entry_uses_type_key() {
        let entry = ChangeLogEntry {
            timestamp: "2026-03-01T08:00:00.000Z".into(),
            kind: ChangeType::Canceled,
            detail: "Oven down".into(),
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["type"], json!("canceled"));
    }

    #[test]
    fn test_status_change_type() {
        assert_eq!(RunStatus::Changed.change_type(), Some(ChangeType::Changed));
        assert_eq!(RunStatus::Done.change_type(), None);
    }

    #[test]
    fn test_parse_status_and_category() {
        assert_eq!("Cancelled".parse::<RunStatus>().unwrap(), RunStatus::Canceled);
        assert_eq!("incident".parse::<NoteCategory>().unwrap(), NoteCategory::Incident);
        assert!("archived".parse::<RunStatus>().is_err());
    }

    #[test]
    fn test_patch_clears_optional_field() {
        let patch = ProductionRunPatch {
            notes: Some(None),
            planned_units: Some(10.0),
            ..Default::default()
        };
        let mut doc = json!({"id": "run-1", "notes": "late start", "plannedUnits": 5})
            .as_object()
            .cloned()
            .unwrap();
        patch.into_changes().unwrap().apply_to(&mut doc);

        assert!(doc.get("notes").is_none());
        assert_eq!(doc.get("plannedUnits"), Some(&json!(10.0)));
    }
}
