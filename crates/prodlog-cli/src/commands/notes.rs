use prodlog_core::Repository;

use crate::app::AppContext;
use crate::cli::NotesArgs;
use crate::output::{or_dash, print_json, print_table};

pub fn handle_notes(ctx: &AppContext, args: &NotesArgs) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    let repo = Repository::new(&store);

    let notes = match args.category {
        Some(category) => repo.list_notes_by_category(category)?,
        None => repo.list_note_events()?,
    };

    if args.json {
        return print_json(&notes);
    }
    let rows: Vec<Vec<String>> = notes
        .iter()
        .map(|note| {
            vec![
                note.date.clone(),
                note.category.as_str().to_string(),
                note.title.clone(),
                or_dash(note.body.as_deref()),
            ]
        })
        .collect();
    print_table(&["Date", "Category", "Title", "Body"], &rows, "No notes found");
    Ok(())
}
