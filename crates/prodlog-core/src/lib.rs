//! # Prodlog Core
//!
//! Core library for Prodlog - a local-first production log for small-batch
//! food makers.
//!
//! This crate provides the entity model, the schema-versioned record store,
//! the typed repository and the backup codec, independent of the CLI.
//!
//! ## Architecture
//!
//! - **model**: Entity types, inputs, patches and field validation
//! - **storage**: `RecordStore` trait, schema versions, SQLite implementation
//! - **repository**: Typed CRUD and queries over a store handle
//! - **backup**: Versioned export, migration and import
//! - **seed**: Starter templates for an empty store
//! - **fs**: Atomic file replacement

pub mod backup;
pub mod error;
pub mod fs;
pub mod model;
pub mod repository;
pub mod seed;
pub mod storage;

pub use backup::{BackupCodec, ImportMode, ImportSummary};
pub use error::{ErrorCategory, ProdlogError, Result};
pub use repository::Repository;
pub use storage::{RecordStore, SqliteStore, CURRENT_SCHEMA_VERSION};

/// Core version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
