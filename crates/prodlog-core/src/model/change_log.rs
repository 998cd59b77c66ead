//! Append-only change log for production runs.

use super::types::{ChangeLogEntry, ChangeType, RunStatus};
use crate::error::{ProdlogError, Result};

/// What replaced a changed run.
#[derive(Debug, Clone, PartialEq)]
pub enum Replacement {
    /// Another batch template, by id. Resolved to its name when logged.
    Template(String),
    /// Free-text description.
    Text(String),
}

/// A requested status transition for a production run.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub status: RunStatus,
    pub reason: Option<String>,
    pub replacement: Option<Replacement>,
}

impl StatusChange {
    pub fn new(status: RunStatus) -> Self {
        Self {
            status,
            reason: None,
            replacement: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_replacement(mut self, replacement: Replacement) -> Self {
        self.replacement = Some(replacement);
        self
    }

    /// Validate the request. Returns the trimmed reason when the target
    /// status requires a log entry.
    pub(crate) fn checked_reason(&self) -> Result<Option<String>> {
        let Some(kind) = self.status.change_type() else {
            if self.reason.is_some() || self.replacement.is_some() {
                return Err(ProdlogError::Validation(format!(
                    "A reason only applies to changed or canceled runs, not {}",
                    self.status.as_str()
                )));
            }
            return Ok(None);
        };

        let reason = self
            .reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .ok_or_else(|| {
                ProdlogError::Validation("A reason is required to change or cancel a run".into())
            })?;

        match (kind, &self.replacement) {
            (ChangeType::Changed, None) => Err(ProdlogError::Validation(
                "A changed run needs a replacement".into(),
            )),
            (ChangeType::Changed, Some(Replacement::Template(id))) if id.trim().is_empty() => {
                Err(ProdlogError::Validation(
                    "Select the replacement template".into(),
                ))
            }
            (ChangeType::Changed, Some(Replacement::Text(text))) if text.trim().is_empty() => {
                Err(ProdlogError::Validation("Describe the replacement".into()))
            }
            (ChangeType::Canceled, Some(_)) => Err(ProdlogError::Validation(
                "A canceled run has no replacement".into(),
            )),
            _ => Ok(Some(reason.to_string())),
        }
    }
}

/// Compose the entry detail from a reason and an optional resolved
/// replacement label.
pub fn detail(reason: &str, replacement: Option<&str>) -> String {
    match replacement {
        Some(label) => format!("{}. Replaced by {}", reason, label),
        None => reason.to_string(),
    }
}

/// Return a new log with `entry` appended; `existing` is left untouched.
pub fn append(existing: &[ChangeLogEntry], entry: ChangeLogEntry) -> Vec<ChangeLogEntry> {
    let mut log = Vec::with_capacity(existing.len() + 1);
    log.extend_from_slice(existing);
    log.push(entry);
    log
}
