//! Starter templates for an empty store.

use tracing::info;

use crate::error::Result;
use crate::model::{MaterialItem, NewBatchTemplate};
use crate::repository::Repository;
use crate::storage::{Collection, RecordStore};

fn tags(values: &[&str]) -> Vec<String> {
    values.iter().map(|t| t.to_string()).collect()
}

/// The built-in starter templates.
pub fn starter_templates() -> Vec<NewBatchTemplate> {
    vec![
        NewBatchTemplate::new(
            "Artisan bread",
            vec![
                MaterialItem::new("Wheat flour").with_notes("W320 preferred"),
                MaterialItem::new("Water").with_notes("70% hydration"),
                MaterialItem::new("Salt"),
                MaterialItem::new("Fresh yeast"),
            ],
        )
        .with_tags(tags(&["bread", "daily"])),
        NewBatchTemplate::new(
            "Wholegrain biscuit",
            vec![
                MaterialItem::new("Wholegrain flour"),
                MaterialItem::new("Brown sugar"),
                MaterialItem::new("Butter").with_notes("Room temperature"),
            ],
        )
        .with_tags(tags(&["biscuit", "snack"])),
        NewBatchTemplate::new(
            "Granola base",
            vec![
                MaterialItem::new("Oats"),
                MaterialItem::new("Honey"),
                MaterialItem::new("Vegetable oil"),
                MaterialItem::new("Nuts").with_notes("Variable mix"),
            ],
        )
        .with_tags(tags(&["granola", "batch"])),
    ]
}

/// Create the starter templates when no template exists yet.
///
/// Returns how many were created; zero when the store already had data.
pub fn seed_if_empty<S: RecordStore + ?Sized>(repo: &Repository<'_, S>) -> Result<usize> {
    if repo.store().count(Collection::BatchTemplates)? > 0 {
        return Ok(0);
    }

    let mut created = 0;
    for template in starter_templates() {
        repo.create_batch_template(template)?;
        created += 1;
    }
    info!(created, "Seeded starter templates");
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStore;

    #[test]
    fn test_seed_only_once() {
        let store = SqliteStore::open_in_memory().unwrap();
        let repo = Repository::new(&store);

        assert_eq!(seed_if_empty(&repo).unwrap(), 3);
        assert_eq!(seed_if_empty(&repo).unwrap(), 0);
        assert_eq!(repo.list_batch_templates().unwrap().len(), 3);
        assert_eq!(repo.list_templates_by_tag("granola").unwrap().len(), 1);
    }
}
