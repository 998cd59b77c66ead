//! Error types for Prodlog core operations.
//!
//! This module defines the error hierarchy for all core operations.
//! Errors are descriptive at the core level; the CLI layer maps them to
//! user-facing messages through [`ProdlogError::category`].
//!
//! A missing record is not an error: lookups return `Ok(None)`.

use thiserror::Error;

/// Result type alias for Prodlog operations.
pub type Result<T> = std::result::Result<T, ProdlogError>;

/// Broad classification used when reporting an error to a person.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Caller-supplied data failed a field contract. Nothing was written.
    Validation,
    /// An imported document is malformed. Nothing was written.
    Format,
    /// The storage engine failed.
    Storage,
}

/// Core error type for Prodlog operations.
#[derive(Debug, Error)]
pub enum ProdlogError {
    /// Field contract violation on a repository write
    #[error("Validation error: {0}")]
    Validation(String),

    /// Backup document is not well-formed or failed validation
    #[error("Invalid backup: {0}")]
    Format(String),

    /// Backup document declares a schema version this build does not know
    #[error("Unsupported backup schema version: {0}")]
    UnsupportedSchemaVersion(String),

    /// Store layout problem (unknown version, undeclared index, newer store)
    #[error("Schema error: {0}")]
    Schema(String),

    /// Insert with an id that already exists in the collection
    #[error("Duplicate id {id} in {collection}")]
    DuplicateId { collection: String, id: String },

    /// Stored document could not be decoded into its entity type
    #[error("Corrupt record {id} in {collection}: {reason}")]
    CorruptRecord {
        collection: String,
        id: String,
        reason: String,
    },

    /// Storage backend error (generic)
    #[error("Storage error: {0}")]
    Storage(String),

    /// SQLite-specific storage error
    #[error("SQLite error: {source}")]
    Sqlite {
        #[from]
        source: rusqlite::Error,
    },

    /// I/O error
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error
    #[error("JSON error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },
}

impl ProdlogError {
    /// Map this error onto the validation / format / storage taxonomy.
    pub fn category(&self) -> ErrorCategory {
        match self {
            ProdlogError::Validation(_) => ErrorCategory::Validation,
            ProdlogError::Format(_) | ProdlogError::UnsupportedSchemaVersion(_) => {
                ErrorCategory::Format
            }
            // A caller-supplied id that collides is a write failure, not a field contract.
            ProdlogError::DuplicateId { .. }
            | ProdlogError::Schema(_)
            | ProdlogError::CorruptRecord { .. }
            | ProdlogError::Storage(_)
            | ProdlogError::Sqlite { .. }
            | ProdlogError::Io { .. }
            | ProdlogError::Json { .. } => ErrorCategory::Storage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        assert_eq!(
            ProdlogError::Validation("x".into()).category(),
            ErrorCategory::Validation
        );
        assert_eq!(
            ProdlogError::UnsupportedSchemaVersion("99".into()).category(),
            ErrorCategory::Format
        );
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        assert_eq!(ProdlogError::from(io).category(), ErrorCategory::Storage);
    }

    #[test]
    fn test_display_messages() {
        let err = ProdlogError::DuplicateId {
            collection: "technicians".into(),
            id: "t1".into(),
        };
        assert_eq!(err.to_string(), "Duplicate id t1 in technicians");
    }
}
