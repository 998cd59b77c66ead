//! Record store trait definition.
//!
//! The `RecordStore` trait is the document-level contract the repository and
//! the backup codec are written against. Records are JSON objects whose
//! `id` field is their primary key within a collection.

use serde_json::Value;

use super::schema::Collection;
use crate::error::Result;

/// Sort direction for a full scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Ordering for [`RecordStore::scan`]. Ties are broken by id in the same
/// direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderBy {
    pub field: &'static str,
    pub direction: Direction,
}

impl OrderBy {
    pub fn asc(field: &'static str) -> Self {
        Self {
            field,
            direction: Direction::Ascending,
        }
    }

    pub fn desc(field: &'static str) -> Self {
        Self {
            field,
            direction: Direction::Descending,
        }
    }
}

/// One step of an atomic multi-collection write.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Remove every record from the collection.
    Clear(Collection),
    /// Insert the record, overwriting any record with the same id.
    Put(Collection, Value),
}

/// Local record store interface.
///
/// All implementations must ensure:
/// - `id` is unique within a collection
/// - documents are stored and returned verbatim
/// - [`apply`](RecordStore::apply) is all-or-nothing
///
/// Methods take `&self`: a store serializes access to its engine
/// internally, and callers share one handle.
pub trait RecordStore: Send + Sync {
    /// Schema version the open store is at.
    fn schema_version(&self) -> Result<u32>;

    /// Get a record by id.
    ///
    /// Returns `Ok(None)` if no record has this id.
    fn get(&self, collection: Collection, id: &str) -> Result<Option<Value>>;

    /// Insert a new record.
    ///
    /// # Errors
    ///
    /// Returns `ProdlogError::DuplicateId` if a record with the same id
    /// exists, or `ProdlogError::Format` if the record has no string id.
    fn insert(&self, collection: Collection, record: &Value) -> Result<()>;

    /// Insert or overwrite a record by id.
    fn put(&self, collection: Collection, record: &Value) -> Result<()>;

    /// Delete a record by id. Returns whether a record was removed; a
    /// missing id is not an error.
    fn delete(&self, collection: Collection, id: &str) -> Result<bool>;

    /// Every record of the collection, in `order` or by id when `None`.
    fn scan(&self, collection: Collection, order: Option<OrderBy>) -> Result<Vec<Value>>;

    /// Records whose indexed `field` equals `value`, in index order (value,
    /// then id). For multi-entry fields a record matches when any element
    /// equals `value`.
    ///
    /// # Errors
    ///
    /// Returns `ProdlogError::Schema` if `field` is not an index of the
    /// collection at the store's schema version.
    fn find_eq(&self, collection: Collection, field: &str, value: &str) -> Result<Vec<Value>>;

    /// First record of [`find_eq`](RecordStore::find_eq), if any.
    fn find_first(&self, collection: Collection, field: &str, value: &str)
        -> Result<Option<Value>>;

    /// Number of records in the collection.
    fn count(&self, collection: Collection) -> Result<usize>;

    /// Apply a batch of writes atomically.
    fn apply(&self, ops: &[WriteOp]) -> Result<()>;

    /// Check store integrity.
    ///
    /// Verifies:
    /// - engine-level consistency
    /// - the persisted schema version is a known one
    /// - every declared collection exists
    /// - every stored document parses and its id matches its key
    fn check_integrity(&self) -> Result<()>;
}
