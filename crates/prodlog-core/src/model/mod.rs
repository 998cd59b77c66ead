//! Entity model: the four persisted record types and their contracts.

pub mod change_log;
pub(crate) mod patch;
pub mod types;
pub mod validation;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;
use crate::storage::Collection;

pub use change_log::{Replacement, StatusChange};
pub use types::{
    BatchTemplate, BatchTemplatePatch, ChangeLogEntry, ChangeType, MaterialItem, NewBatchTemplate,
    NewNoteEvent, NewProductionRun, NewTechnician, NoteCategory, NoteEvent, NoteEventPatch,
    ProductionRun, ProductionRunPatch, RunStatus, Shift, Technician, TechnicianPatch,
};

/// A typed entity stored as one JSON document in a collection.
pub trait Record: Serialize + DeserializeOwned {
    /// Collection the entity lives in.
    const COLLECTION: Collection;

    /// Content fields owned by the typed model (excluding id and timestamps).
    const FIELDS: &'static [&'static str];

    fn id(&self) -> &str;

    fn updated_at(&self) -> &str;

    fn set_updated_at(&mut self, value: String);

    /// Normalize and check the field contracts.
    fn validate(self) -> Result<Self>;
}
