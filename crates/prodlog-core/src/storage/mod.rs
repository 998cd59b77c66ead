//! Record store for Prodlog.
//!
//! This module defines the `RecordStore` trait, the declarative schema
//! versions, and the SQLite implementation.
//!
//! ## Layout
//!
//! - One collection per entity type, keyed by the record's `id`
//! - Documents stored verbatim as JSON, indexed fields via expression indexes
//! - Schema version persisted in the database header; versions only add
//!   structure

pub mod schema;
pub mod sqlite;
pub mod traits;

// Re-export public types
pub use schema::{Collection, CURRENT_SCHEMA_VERSION};
pub use sqlite::SqliteStore;
pub use traits::{Direction, OrderBy, RecordStore, WriteOp};
