use prodlog_core::model::BatchTemplate;
use prodlog_core::Repository;

use crate::app::AppContext;
use crate::cli::TemplatesArgs;
use crate::output::{print_json, print_table, short_id, short_timestamp};

fn template_row(template: &BatchTemplate) -> Vec<String> {
    let materials: Vec<&str> = template.materials.iter().map(|m| m.name.as_str()).collect();
    vec![
        short_id(&template.id),
        template.name.clone(),
        template.tags.as_deref().unwrap_or_default().join(", "),
        materials.join(", "),
        short_timestamp(&template.updated_at),
    ]
}

pub fn handle_templates(ctx: &AppContext, args: &TemplatesArgs) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    let repo = Repository::new(&store);

    if let Some(limit) = args.top {
        let usage = repo.top_templates(limit)?;
        if args.json {
            return print_json(&usage_json(&usage));
        }
        let rows: Vec<Vec<String>> = usage
            .iter()
            .map(|u| vec![short_id(&u.template_id), u.name.clone(), u.runs.to_string()])
            .collect();
        print_table(&["ID", "Template", "Runs"], &rows, "No production runs yet");
        return Ok(());
    }

    let mut templates = match &args.tag {
        Some(tag) => repo.list_templates_by_tag(tag)?,
        None => repo.list_batch_templates()?,
    };
    if let Some(query) = &args.search {
        let matches = repo.search_templates(query)?;
        templates.retain(|t| matches.iter().any(|m| m.id == t.id));
    }

    if args.json {
        return print_json(&templates);
    }
    let rows: Vec<Vec<String>> = templates.iter().map(template_row).collect();
    print_table(
        &["ID", "Name", "Tags", "Materials", "Updated"],
        &rows,
        "No templates found",
    );
    Ok(())
}

fn usage_json(usage: &[prodlog_core::repository::TemplateUsage]) -> serde_json::Value {
    serde_json::Value::Array(
        usage
            .iter()
            .map(|u| {
                serde_json::json!({
                    "templateId": u.template_id,
                    "name": u.name,
                    "runs": u.runs,
                })
            })
            .collect(),
    )
}
