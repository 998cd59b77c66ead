//! Typed CRUD and queries over a record store.
//!
//! The repository owns id generation and timestamp stamping: callers never
//! set `id` implicitly, `createdAt` or `updatedAt`. Every write is
//! validated; a missing record on `get`/`update` is `Ok(None)`.

pub mod clock;
pub mod lookup;

use std::collections::HashMap;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{ProdlogError, Result};
use crate::model::change_log;
use crate::model::patch::{overlay_known_fields, Changes};
use crate::model::{
    BatchTemplate, BatchTemplatePatch, ChangeLogEntry, NewBatchTemplate, NewNoteEvent,
    NewProductionRun, NewTechnician, NoteCategory, NoteEvent, NoteEventPatch, ProductionRun,
    ProductionRunPatch, Record, Replacement, RunStatus, StatusChange, Technician,
    TechnicianPatch,
};
use crate::storage::schema::schema_version;
use crate::storage::{Collection, OrderBy, RecordStore};

pub use lookup::{
    TechnicianRef, TechnicianStats, TemplateRef, TemplateUsage, UNKNOWN_TECHNICIAN,
    UNKNOWN_TEMPLATE,
};

/// Typed façade over a [`RecordStore`] handle.
pub struct Repository<'a, S: RecordStore + ?Sized> {
    store: &'a S,
}

fn decode<R: Record>(doc: Value) -> Result<R> {
    let id = doc
        .get("id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    serde_json::from_value(doc).map_err(|e| ProdlogError::CorruptRecord {
        collection: R::COLLECTION.key().to_string(),
        id,
        reason: e.to_string(),
    })
}

/// Decode a listing, leaving out rows that do not match the entity type.
///
/// Imports accept records as-is, so one bad row must not hide the rest.
fn decode_all<R: Record>(docs: Vec<Value>) -> Vec<R> {
    docs.into_iter()
        .filter_map(|doc| match decode(doc) {
            Ok(record) => Some(record),
            Err(err) => {
                warn!(collection = %R::COLLECTION, error = %err, "Skipping undecodable record");
                None
            }
        })
        .collect()
}

fn to_object<R: Record>(record: &R) -> Result<Map<String, Value>> {
    match serde_json::to_value(record)? {
        Value::Object(map) => Ok(map),
        _ => Err(ProdlogError::Storage(format!(
            "Record {} did not serialize to an object",
            record.id()
        ))),
    }
}

impl<'a, S: RecordStore + ?Sized> Repository<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// The underlying store handle.
    pub fn store(&self) -> &'a S {
        self.store
    }

    fn create_record<R: Record>(&self, record: R) -> Result<R> {
        let record = record.validate()?;
        self.store
            .insert(R::COLLECTION, &Value::Object(to_object(&record)?))?;
        debug!(collection = %R::COLLECTION, id = record.id(), "Created record");
        Ok(record)
    }

    fn get_record<R: Record>(&self, id: &str) -> Result<Option<R>> {
        self.store
            .get(R::COLLECTION, id)?
            .map(decode)
            .transpose()
    }

    /// Merge `changes` onto the stored document, validate, restamp, persist.
    fn update_record<R: Record>(&self, id: &str, changes: Changes) -> Result<Option<R>> {
        let Some(existing) = self.store.get(R::COLLECTION, id)? else {
            return Ok(None);
        };
        let Value::Object(mut doc) = existing else {
            return Err(ProdlogError::CorruptRecord {
                collection: R::COLLECTION.key().to_string(),
                id: id.to_string(),
                reason: "Document is not an object".to_string(),
            });
        };

        let previous = doc
            .get("updatedAt")
            .and_then(Value::as_str)
            .map(str::to_string);
        changes.apply_to(&mut doc);

        let mut record: R = decode::<R>(Value::Object(doc.clone()))?.validate()?;
        record.set_updated_at(clock::next_timestamp(previous.as_deref()));

        overlay_known_fields(&mut doc, to_object(&record)?, R::FIELDS);
        self.store.put(R::COLLECTION, &Value::Object(doc))?;
        debug!(collection = %R::COLLECTION, id, "Updated record");
        Ok(Some(record))
    }

    fn delete_record(&self, collection: Collection, id: &str) -> Result<bool> {
        self.store.delete(collection, id)
    }

    fn list_ordered<R: Record>(&self, order: OrderBy) -> Result<Vec<R>> {
        Ok(decode_all(self.store.scan(R::COLLECTION, Some(order))?))
    }

    fn find<R: Record>(&self, field: &str, value: &str) -> Result<Vec<R>> {
        Ok(decode_all(self.store.find_eq(R::COLLECTION, field, value)?))
    }

    fn check_collection<R: Record>(&self, issues: &mut Vec<ProdlogError>) -> Result<()> {
        for doc in self.store.scan(R::COLLECTION, None)? {
            if let Err(err) = decode::<R>(doc) {
                issues.push(err);
            }
        }
        Ok(())
    }

    /// Decode every stored document into its entity type.
    ///
    /// Returns one [`ProdlogError::CorruptRecord`] per row that listings
    /// leave out. Collections absent from the store's layout are skipped.
    pub fn check_records(&self) -> Result<Vec<ProdlogError>> {
        let version = self.store.schema_version()?;
        let layout = schema_version(version).ok_or_else(|| {
            ProdlogError::Schema(format!("Store is at unknown schema version {}", version))
        })?;

        let mut issues = Vec::new();
        for collection in Collection::ALL {
            if layout.collection(collection).is_none() {
                continue;
            }
            match collection {
                Collection::BatchTemplates => self.check_collection::<BatchTemplate>(&mut issues)?,
                Collection::ProductionRuns => self.check_collection::<ProductionRun>(&mut issues)?,
                Collection::NoteEvents => self.check_collection::<NoteEvent>(&mut issues)?,
                Collection::Technicians => self.check_collection::<Technician>(&mut issues)?,
            }
        }
        Ok(issues)
    }

    fn id_or_new(id: Option<String>) -> String {
        id.unwrap_or_else(clock::new_id)
    }

    // --- Batch templates ---

    pub fn create_batch_template(&self, input: NewBatchTemplate) -> Result<BatchTemplate> {
        let id = Self::id_or_new(input.id.clone());
        self.create_record(input.into_record(id, clock::now_timestamp()))
    }

    pub fn update_batch_template(
        &self,
        id: &str,
        patch: BatchTemplatePatch,
    ) -> Result<Option<BatchTemplate>> {
        self.update_record(id, patch.into_changes()?)
    }

    /// Hard delete. Runs referencing the template are left dangling.
    pub fn delete_batch_template(&self, id: &str) -> Result<bool> {
        self.delete_record(Collection::BatchTemplates, id)
    }

    pub fn get_batch_template(&self, id: &str) -> Result<Option<BatchTemplate>> {
        self.get_record(id)
    }

    /// All templates, most recently updated first.
    pub fn list_batch_templates(&self) -> Result<Vec<BatchTemplate>> {
        self.list_ordered(OrderBy::desc("updatedAt"))
    }

    pub fn list_templates_by_tag(&self, tag: &str) -> Result<Vec<BatchTemplate>> {
        self.find("tags", tag)
    }

    /// Templates whose name or any material name contains `query`,
    /// case-insensitively, in [`list_batch_templates`](Self::list_batch_templates) order.
    pub fn search_templates(&self, query: &str) -> Result<Vec<BatchTemplate>> {
        Ok(self
            .list_batch_templates()?
            .into_iter()
            .filter(|t| lookup::template_matches(t, query))
            .collect())
    }

    // --- Production runs ---

    /// Create a run. Starting as changed or canceled takes the same reason
    /// and replacement rules as [`set_run_status`](Self::set_run_status) and
    /// logs one entry.
    pub fn create_production_run(&self, input: NewProductionRun) -> Result<ProductionRun> {
        let log = match self.change_entry(&input.status)? {
            Some(entry) => vec![entry],
            None => Vec::new(),
        };
        let id = Self::id_or_new(input.id.clone());
        self.create_record(input.into_record(id, clock::now_timestamp(), log))
    }

    pub fn update_production_run(
        &self,
        id: &str,
        patch: ProductionRunPatch,
    ) -> Result<Option<ProductionRun>> {
        self.update_record(id, patch.into_changes()?)
    }

    /// Move a run to a new status.
    ///
    /// A move into changed or canceled appends exactly one change-log entry;
    /// earlier entries are kept as they are.
    pub fn set_run_status(
        &self,
        id: &str,
        change: StatusChange,
    ) -> Result<Option<ProductionRun>> {
        let entry = self.change_entry(&change)?;
        let Some(run) = self.get_production_run(id)? else {
            return Ok(None);
        };

        let mut changes = Changes::new();
        changes.set("status", Some(change.status))?;
        if let Some(entry) = entry {
            changes.set("changeLog", Some(change_log::append(&run.change_log, entry)))?;
        }

        self.update_record(id, changes)
    }

    /// Check `change` and build its log entry, if the target status logs one.
    fn change_entry(&self, change: &StatusChange) -> Result<Option<ChangeLogEntry>> {
        let (Some(reason), Some(kind)) = (change.checked_reason()?, change.status.change_type())
        else {
            return Ok(None);
        };
        let label = match &change.replacement {
            Some(Replacement::Template(template_id)) => {
                Some(self.resolve_template(template_id.trim())?.name().to_string())
            }
            Some(Replacement::Text(text)) => Some(text.trim().to_string()),
            None => None,
        };
        Ok(Some(ChangeLogEntry {
            timestamp: clock::now_timestamp(),
            kind,
            detail: change_log::detail(&reason, label.as_deref()),
        }))
    }

    pub fn delete_production_run(&self, id: &str) -> Result<bool> {
        self.delete_record(Collection::ProductionRuns, id)
    }

    pub fn get_production_run(&self, id: &str) -> Result<Option<ProductionRun>> {
        self.get_record(id)
    }

    /// All runs, latest date first.
    pub fn list_production_runs(&self) -> Result<Vec<ProductionRun>> {
        self.list_ordered(OrderBy::desc("date"))
    }

    pub fn list_runs_by_date(&self, date: &str) -> Result<Vec<ProductionRun>> {
        self.find("date", date)
    }

    pub fn list_runs_by_technician(&self, technician: &str) -> Result<Vec<ProductionRun>> {
        self.find("technician", technician)
    }

    pub fn list_runs_by_template(&self, template_id: &str) -> Result<Vec<ProductionRun>> {
        self.find("templateId", template_id)
    }

    pub fn list_runs_by_status(&self, status: RunStatus) -> Result<Vec<ProductionRun>> {
        self.find("status", status.as_str())
    }

    /// First run carrying `batch_code`. Codes are not enforced unique.
    /// First decodable run with this batch code, in index order.
    pub fn get_run_by_batch_code(&self, batch_code: &str) -> Result<Option<ProductionRun>> {
        Ok(self.find("batchCode", batch_code)?.into_iter().next())
    }

    // --- Notes ---

    pub fn create_note_event(&self, input: NewNoteEvent) -> Result<NoteEvent> {
        let id = Self::id_or_new(input.id.clone());
        self.create_record(input.into_record(id, clock::now_timestamp()))
    }

    pub fn update_note_event(&self, id: &str, patch: NoteEventPatch) -> Result<Option<NoteEvent>> {
        self.update_record(id, patch.into_changes()?)
    }

    pub fn delete_note_event(&self, id: &str) -> Result<bool> {
        self.delete_record(Collection::NoteEvents, id)
    }

    pub fn get_note_event(&self, id: &str) -> Result<Option<NoteEvent>> {
        self.get_record(id)
    }

    /// All notes, latest date first.
    pub fn list_note_events(&self) -> Result<Vec<NoteEvent>> {
        self.list_ordered(OrderBy::desc("date"))
    }

    pub fn list_notes_by_category(&self, category: NoteCategory) -> Result<Vec<NoteEvent>> {
        self.find("category", category.as_str())
    }

    // --- Technicians ---

    /// Initials are stored as given; upper-casing is the caller's job.
    pub fn create_technician(&self, input: NewTechnician) -> Result<Technician> {
        let id = Self::id_or_new(input.id.clone());
        self.create_record(input.into_record(id, clock::now_timestamp()))
    }

    pub fn update_technician(&self, id: &str, patch: TechnicianPatch) -> Result<Option<Technician>> {
        self.update_record(id, patch.into_changes()?)
    }

    pub fn delete_technician(&self, id: &str) -> Result<bool> {
        self.delete_record(Collection::Technicians, id)
    }

    pub fn get_technician(&self, id: &str) -> Result<Option<Technician>> {
        self.get_record(id)
    }

    /// All technicians by initials, ascending.
    pub fn list_technicians(&self) -> Result<Vec<Technician>> {
        self.list_ordered(OrderBy::asc("initials"))
    }

    // --- Soft references ---

    /// Resolve a run's template id, or [`TemplateRef::Unknown`] if it is gone
    /// or undecodable.
    pub fn resolve_template(&self, template_id: &str) -> Result<TemplateRef> {
        let found = self
            .store
            .get(Collection::BatchTemplates, template_id)?
            .and_then(|doc| decode_all::<BatchTemplate>(vec![doc]).pop());
        Ok(match found {
            Some(template) => TemplateRef::Found(template),
            None => TemplateRef::Unknown,
        })
    }

    /// Resolve a run's technician text against registered initials.
    pub fn resolve_technician(&self, initials: &str) -> Result<TechnicianRef> {
        Ok(match self.find("initials", initials)?.into_iter().next() {
            Some(technician) => TechnicianRef::Found(technician),
            None => TechnicianRef::Unknown,
        })
    }

    // --- Summaries ---

    /// Run counts per technician, in [`list_technicians`](Self::list_technicians) order.
    pub fn technician_stats(&self) -> Result<Vec<TechnicianStats>> {
        let mut stats = Vec::new();
        for technician in self.list_technicians()? {
            let runs = self.list_runs_by_technician(&technician.initials)?;
            stats.push(TechnicianStats::tally(
                technician,
                runs.iter().map(|run| &run.status),
            ));
        }
        Ok(stats)
    }

    /// The `limit` most referenced template ids, dangling ones included.
    pub fn top_templates(&self, limit: usize) -> Result<Vec<TemplateUsage>> {
        let names: HashMap<String, String> = self
            .list_batch_templates()?
            .into_iter()
            .map(|t| (t.id, t.name))
            .collect();
        let runs = self.list_production_runs()?;
        Ok(lookup::rank_usage(
            runs.iter().map(|run| run.template_id.as_str()),
            &names,
            limit,
        ))
    }
}
