//! Soft-reference resolution and read-side summaries.
//!
//! Runs point at templates by id and at technicians by initials, neither
//! enforced. These helpers resolve such references and fall back to an
//! explicit sentinel when the target is gone.

use std::collections::HashMap;
use std::fmt;

use crate::model::{BatchTemplate, RunStatus, Technician};

/// Display text for a run whose template no longer exists.
pub const UNKNOWN_TEMPLATE: &str = "No template";

/// Display text for a run whose technician is not registered.
pub const UNKNOWN_TECHNICIAN: &str = "Unknown technician";

/// Result of resolving a run's `templateId`.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateRef {
    Found(BatchTemplate),
    Unknown,
}

impl TemplateRef {
    pub fn name(&self) -> &str {
        match self {
            TemplateRef::Found(template) => &template.name,
            TemplateRef::Unknown => UNKNOWN_TEMPLATE,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, TemplateRef::Found(_))
    }
}

impl fmt::Display for TemplateRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of resolving a run's `technician`.
#[derive(Debug, Clone, PartialEq)]
pub enum TechnicianRef {
    Found(Technician),
    Unknown,
}

impl TechnicianRef {
    pub fn initials(&self) -> &str {
        match self {
            TechnicianRef::Found(technician) => &technician.initials,
            TechnicianRef::Unknown => UNKNOWN_TECHNICIAN,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, TechnicianRef::Found(_))
    }
}

impl fmt::Display for TechnicianRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.initials())
    }
}

/// Run counts for one technician.
#[derive(Debug, Clone, PartialEq)]
pub struct TechnicianStats {
    pub technician: Technician,
    pub total: usize,
    pub done: usize,
    pub canceled: usize,
}

impl TechnicianStats {
    pub(crate) fn tally<'a>(
        technician: Technician,
        statuses: impl IntoIterator<Item = &'a RunStatus>,
    ) -> Self {
        let mut stats = Self {
            technician,
            total: 0,
            done: 0,
            canceled: 0,
        };
        for status in statuses {
            stats.total += 1;
            match status {
                RunStatus::Done => stats.done += 1,
                RunStatus::Canceled => stats.canceled += 1,
                RunStatus::Planned | RunStatus::Changed => {}
            }
        }
        stats
    }
}

/// How many runs reference one template id.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateUsage {
    pub template_id: String,
    /// Resolved name, or [`UNKNOWN_TEMPLATE`] for a dangling id.
    pub name: String,
    pub runs: usize,
}

/// Rank template ids by run count, most used first. Ties go by id.
pub(crate) fn rank_usage<'a>(
    template_ids: impl IntoIterator<Item = &'a str>,
    names: &HashMap<String, String>,
    limit: usize,
) -> Vec<TemplateUsage> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for id in template_ids {
        *counts.entry(id).or_insert(0) += 1;
    }

    let mut usage: Vec<TemplateUsage> = counts
        .into_iter()
        .map(|(id, runs)| TemplateUsage {
            template_id: id.to_string(),
            name: names
                .get(id)
                .cloned()
                .unwrap_or_else(|| UNKNOWN_TEMPLATE.to_string()),
            runs,
        })
        .collect();
    usage.sort_by(|a, b| b.runs.cmp(&a.runs).then_with(|| a.template_id.cmp(&b.template_id)));
    usage.truncate(limit);
    usage
}

/// Case-insensitive match on a template's name or any material name.
pub(crate) fn template_matches(template: &BatchTemplate, query: &str) -> bool {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return true;
    }
    template.name.to_lowercase().contains(&query)
        || template
            .materials
            .iter()
            .any(|m| m.name.to_lowercase().contains(&query))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MaterialItem;

    fn template(name: &str, materials: &[&str]) -> BatchTemplate {
        BatchTemplate {
            id: name.to_lowercase(),
            name: name.into(),
            tags: None,
            materials: materials.iter().map(|m| MaterialItem::new(*m)).collect(),
            created_at: "2026-01-01T00:00:00.000Z".into(),
            updated_at: "2026-01-01T00:00:00.000Z".into(),
        }
    }

    #[test]
    fn test_unknown_sentinels() {
        assert_eq!(TemplateRef::Unknown.to_string(), UNKNOWN_TEMPLATE);
        assert_eq!(TechnicianRef::Unknown.initials(), UNKNOWN_TECHNICIAN);
        assert!(!TemplateRef::Unknown.is_known());
    }

    #[test]
    fn test_template_matches_name_or_material() {
        let bread = template("Basic bread", &["Wheat flour", "Salt"]);
        assert!(template_matches(&bread, "BREAD"));
        assert!(template_matches(&bread, "salt"));
        assert!(template_matches(&bread, "  "));
        assert!(!template_matches(&bread, "honey"));
    }

    #[test]
    fn test_rank_usage_counts_and_resolves() {
        let mut names = HashMap::new();
        names.insert("t1".to_string(), "Bread".to_string());
        let ids = ["t1", "gone", "t1", "t2"];

        let usage = rank_usage(ids.iter().copied(), &names, 2);
        assert_eq!(usage.len(), 2);
        assert_eq!(usage[0].template_id, "t1");
        assert_eq!(usage[0].runs, 2);
        assert_eq!(usage[0].name, "Bread");
        assert_eq!(usage[1].template_id, "gone");
        assert_eq!(usage[1].name, UNKNOWN_TEMPLATE);
    }

    #[test]
    fn test_tally() {
        let tech = Technician {
            id: "x".into(),
            initials: "AB".into(),
            created_at: String::new(),
            updated_at: String::new(),
        };
        let statuses = [RunStatus::Done, RunStatus::Canceled, RunStatus::Planned];
        let stats = TechnicianStats::tally(tech, statuses.iter());
        assert_eq!((stats.total, stats.done, stats.canceled), (3, 1, 1));
    }
}
