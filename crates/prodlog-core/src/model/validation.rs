//! Field contracts for repository writes.
//!
//! Each `normalize_*` function trims free text, drops blank optional values
//! and rejects records that break a field contract. They run on both create
//! and update (against the merged record). Imported backup records bypass
//! them.

use std::collections::HashSet;

use chrono::NaiveDate;

use super::types::{BatchTemplate, MaterialItem, NoteEvent, ProductionRun, Technician};
use crate::error::{ProdlogError, Result};

/// Exact length of a batch code.
pub const BATCH_CODE_LEN: usize = 9;

/// Check that `code` is exactly nine ASCII digits.
pub fn validate_batch_code(code: &str) -> Result<()> {
    if code.len() != BATCH_CODE_LEN || !code.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ProdlogError::Validation(format!(
            "Batch code must be exactly {} digits",
            BATCH_CODE_LEN
        )));
    }
    Ok(())
}

/// Check that `date` is a calendar date in `YYYY-MM-DD` form.
pub fn validate_date(field: &str, date: &str) -> Result<()> {
    if NaiveDate::parse_from_str(date, "%Y-%m-%d").is_err() {
        return Err(ProdlogError::Validation(format!(
            "Field {} must be YYYY-MM-DD",
            field
        )));
    }
    Ok(())
}

fn required_text(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ProdlogError::Validation(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Trim tags, drop blanks and duplicates. An empty result becomes `None`.
pub fn normalize_tags(tags: Option<Vec<String>>) -> Option<Vec<String>> {
    let tags = tags?;
    let mut seen = HashSet::with_capacity(tags.len());
    let mut normalized = Vec::with_capacity(tags.len());
    for tag in tags {
        let trimmed = tag.trim().to_string();
        if trimmed.is_empty() {
            continue;
        }
        if seen.insert(trimmed.clone()) {
            normalized.push(trimmed);
        }
    }
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

/// Trim materials and drop blank-named lines; at least one must remain.
pub fn normalize_materials(materials: Vec<MaterialItem>) -> Result<Vec<MaterialItem>> {
    let materials: Vec<MaterialItem> = materials
        .into_iter()
        .map(|m| MaterialItem {
            name: m.name.trim().to_string(),
            notes: optional_text(m.notes),
        })
        .filter(|m| !m.name.is_empty())
        .collect();
    if materials.is_empty() {
        return Err(ProdlogError::Validation(
            "At least one material is required".to_string(),
        ));
    }
    Ok(materials)
}

pub fn normalize_template(template: BatchTemplate) -> Result<BatchTemplate> {
    Ok(BatchTemplate {
        name: required_text("Name", &template.name)?,
        tags: normalize_tags(template.tags),
        materials: normalize_materials(template.materials)?,
        ..template
    })
}

pub fn normalize_run(run: ProductionRun) -> Result<ProductionRun> {
    validate_date("date", &run.date)?;
    let batch_code = run.batch_code.trim().to_string();
    validate_batch_code(&batch_code)?;
    let template_id = required_text("Template", &run.template_id)?;
    if !run.planned_units.is_finite() || run.planned_units <= 0.0 {
        return Err(ProdlogError::Validation(
            "Planned units must be greater than 0".to_string(),
        ));
    }
    if let Some(actual) = run.actual_units {
        if !actual.is_finite() || actual < 0.0 {
            return Err(ProdlogError::Validation(
                "Actual units must be a non-negative number".to_string(),
            ));
        }
    }
    let technician = required_text("Technician", &run.technician)?;

    Ok(ProductionRun {
        batch_code,
        template_id,
        technician,
        notes: optional_text(run.notes),
        ..run
    })
}

pub fn normalize_note(note: NoteEvent) -> Result<NoteEvent> {
    validate_date("date", &note.date)?;
    Ok(NoteEvent {
        title: required_text("Title", &note.title)?,
        body: optional_text(note.body),
        ..note
    })
}

pub fn normalize_technician(technician: Technician) -> Result<Technician> {
    Ok(Technician {
        initials: required_text("Initials", &technician.initials)?,
        ..technician
    })
}
