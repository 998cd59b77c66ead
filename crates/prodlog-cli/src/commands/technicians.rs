use prodlog_core::Repository;

use crate::app::AppContext;
use crate::cli::TechniciansArgs;
use crate::output::{print_json, print_table, short_id, short_timestamp};

pub fn handle_technicians(ctx: &AppContext, args: &TechniciansArgs) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    let repo = Repository::new(&store);

    if args.stats {
        let stats = repo.technician_stats()?;
        if args.json {
            let value: Vec<serde_json::Value> = stats
                .iter()
                .map(|s| {
                    serde_json::json!({
                        "id": s.technician.id,
                        "initials": s.technician.initials,
                        "total": s.total,
                        "done": s.done,
                        "canceled": s.canceled,
                    })
                })
                .collect();
            return print_json(&value);
        }
        let rows: Vec<Vec<String>> = stats
            .iter()
            .map(|s| {
                vec![
                    s.technician.initials.clone(),
                    s.total.to_string(),
                    s.done.to_string(),
                    s.canceled.to_string(),
                ]
            })
            .collect();
        print_table(
            &["Initials", "Runs", "Done", "Canceled"],
            &rows,
            "No technicians registered",
        );
        return Ok(());
    }

    let technicians = repo.list_technicians()?;
    if args.json {
        return print_json(&technicians);
    }
    let rows: Vec<Vec<String>> = technicians
        .iter()
        .map(|t| {
            vec![
                short_id(&t.id),
                t.initials.clone(),
                short_timestamp(&t.created_at),
            ]
        })
        .collect();
    print_table(
        &["ID", "Initials", "Added"],
        &rows,
        "No technicians registered",
    );
    Ok(())
}
