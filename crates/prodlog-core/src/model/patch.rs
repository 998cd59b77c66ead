//! Partial-update plumbing over stored JSON documents.
//!
//! Updates are merged at the document level so that keys the typed model
//! does not know about (for example from an imported backup) survive.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::Result;

/// An ordered set of field assignments. `None` removes the key.
#[derive(Debug, Default)]
pub(crate) struct Changes {
    entries: Vec<(&'static str, Option<Value>)>,
}

impl Changes {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Assign `key` when `value` is present.
    pub(crate) fn set<T: Serialize>(&mut self, key: &'static str, value: Option<T>) -> Result<()> {
        if let Some(value) = value {
            self.entries.push((key, Some(serde_json::to_value(value)?)));
        }
        Ok(())
    }

    /// Assign or clear an optional field.
    pub(crate) fn set_optional<T: Serialize>(
        &mut self,
        key: &'static str,
        value: Option<Option<T>>,
    ) -> Result<()> {
        match value {
            Some(Some(value)) => self.entries.push((key, Some(serde_json::to_value(value)?))),
            Some(None) => self.entries.push((key, None)),
            None => {}
        }
        Ok(())
    }

    pub(crate) fn apply_to(self, doc: &mut Map<String, Value>) {
        for (key, value) in self.entries {
            match value {
                Some(value) => {
                    doc.insert(key.to_string(), value);
                }
                None => {
                    doc.remove(key);
                }
            }
        }
    }
}

/// Write a typed record's known fields back over the stored document.
///
/// Every key in `fields` is removed first so fields the record now omits
/// are dropped; keys outside `fields` are left as they were.
pub(crate) fn overlay_known_fields(
    doc: &mut Map<String, Value>,
    record: Map<String, Value>,
    fields: &[&str],
) {
    for field in fields {
        doc.remove(*field);
    }
    for (key, value) in record {
        doc.insert(key, value);
    }
}
