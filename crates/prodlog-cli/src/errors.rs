//! Mapping of failures to user-facing messages and exit codes.

use prodlog_core::{ErrorCategory, ProdlogError};

pub mod exit_codes {
    /// Unexpected failure (storage, I/O)
    pub const FAILURE: i32 = 1;
    /// Rejected input: invalid backup file or field contract violation
    pub const INVALID_INPUT: i32 = 2;
}

/// Find the core error behind an `anyhow` chain, if any.
fn core_error(err: &anyhow::Error) -> Option<&ProdlogError> {
    err.chain().find_map(|cause| cause.downcast_ref::<ProdlogError>())
}

/// Message shown to the user for a failed command.
pub fn describe(err: &anyhow::Error) -> String {
    match core_error(err) {
        Some(core) => match core.category() {
            ErrorCategory::Format => format!("Invalid backup file: {}", core),
            ErrorCategory::Validation => match core {
                ProdlogError::Validation(message) => message.clone(),
                other => other.to_string(),
            },
            ErrorCategory::Storage => format!("Operation failed: {}", core),
        },
        None => format!("{:#}", err),
    }
}

pub fn exit_code(err: &anyhow::Error) -> i32 {
    match core_error(err).map(ProdlogError::category) {
        Some(ErrorCategory::Format) | Some(ErrorCategory::Validation) => exit_codes::INVALID_INPUT,
        _ => exit_codes::FAILURE,
    }
}
