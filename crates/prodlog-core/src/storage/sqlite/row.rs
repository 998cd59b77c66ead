//! Document row type for collection queries.

use serde_json::Value;

use crate::error::{ProdlogError, Result};
use crate::storage::schema::Collection;

/// Raw row data from a collection table, before parsing the document.
#[derive(Debug)]
pub struct DocRow {
    pub collection: Collection,
    pub id: String,
    pub doc: String,
}

impl DocRow {
    fn corrupt(&self, reason: impl Into<String>) -> ProdlogError {
        ProdlogError::CorruptRecord {
            collection: self.collection.key().to_string(),
            id: self.id.clone(),
            reason: reason.into(),
        }
    }
}

impl TryFrom<DocRow> for Value {
    type Error = ProdlogError;

    fn try_from(row: DocRow) -> Result<Self> {
        let value: Value = serde_json::from_str(&row.doc)
            .map_err(|e| row.corrupt(format!("Invalid JSON: {}", e)))?;
        match value.get("id").and_then(Value::as_str) {
            Some(id) if id == row.id => Ok(value),
            Some(id) => Err(row.corrupt(format!("Document id {} does not match key", id))),
            None => Err(row.corrupt("Document has no string id")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(doc: &str) -> DocRow {
        DocRow {
            collection: Collection::NoteEvents,
            id: "n1".into(),
            doc: doc.into(),
        }
    }

    #[test]
    fn test_parses_matching_document() {
        let value = Value::try_from(row(r#"{"id":"n1","title":"Hi"}"#)).unwrap();
        assert_eq!(value["title"], "Hi");
    }

    #[test]
    fn test_rejects_mismatched_or_broken_documents() {
        assert!(Value::try_from(row(r#"{"id":"n2"}"#)).is_err());
        assert!(Value::try_from(row(r#"{"title":"no id"}"#)).is_err());
        assert!(Value::try_from(row("{not json")).is_err());
    }
}
