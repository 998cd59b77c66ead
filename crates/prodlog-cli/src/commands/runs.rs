use chrono::NaiveDate;

use prodlog_core::model::ProductionRun;
use prodlog_core::{RecordStore, Repository};

use crate::app::AppContext;
use crate::cli::RunsArgs;
use crate::output::{or_dash, print_json, print_table};

fn check_date(date: &str) -> anyhow::Result<()> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| anyhow::anyhow!("Invalid date '{}'. Use YYYY-MM-DD.", date))
}

/// Runs matching every given filter. The most selective index does the lookup.
fn select_runs<S: RecordStore + ?Sized>(
    repo: &Repository<'_, S>,
    args: &RunsArgs,
) -> anyhow::Result<Vec<ProductionRun>> {
    let mut runs = if let Some(date) = &args.date {
        check_date(date)?;
        repo.list_runs_by_date(date)?
    } else if let Some(template) = &args.template {
        repo.list_runs_by_template(template)?
    } else if let Some(technician) = &args.technician {
        repo.list_runs_by_technician(technician)?
    } else if let Some(status) = args.status {
        repo.list_runs_by_status(status)?
    } else {
        repo.list_production_runs()?
    };

    runs.retain(|run| {
        args.template.as_ref().map_or(true, |t| &run.template_id == t)
            && args.technician.as_ref().map_or(true, |t| &run.technician == t)
            && args.status.map_or(true, |s| run.status == s)
    });
    Ok(runs)
}

pub fn handle_runs(ctx: &AppContext, args: &RunsArgs) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    let repo = Repository::new(&store);
    let runs = select_runs(&repo, args)?;

    if args.json {
        return print_json(&runs);
    }

    let mut rows = Vec::with_capacity(runs.len());
    for run in &runs {
        let template = repo.resolve_template(&run.template_id)?;
        let last_change = run
            .change_log
            .last()
            .map(|entry| entry.detail.as_str());
        rows.push(vec![
            run.date.clone(),
            run.shift.as_str().to_string(),
            run.batch_code.clone(),
            template.name().to_string(),
            run.planned_units.to_string(),
            or_dash(run.actual_units),
            run.technician.clone(),
            run.status.as_str().to_string(),
            or_dash(last_change),
        ]);
    }
    print_table(
        &[
            "Date",
            "Shift",
            "Batch",
            "Template",
            "Planned",
            "Actual",
            "Tech",
            "Status",
            "Last change",
        ],
        &rows,
        "No production runs found",
    );
    Ok(())
}
