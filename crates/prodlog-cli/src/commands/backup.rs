use std::io::IsTerminal;
use std::path::Path;

use dialoguer::{theme::ColorfulTheme, Confirm};
use serde_json::Value;

use prodlog_core::backup::{default_backup_file_name, BackupCounts, BackupPayload};
use prodlog_core::{BackupCodec, ImportMode, ProdlogError};

use crate::app::AppContext;
use crate::cli::{ExportArgs, ImportArgs};

fn describe_counts(counts: &BackupCounts) -> String {
    format!(
        "{} templates, {} runs, {} notes, {} technicians",
        counts.batch_templates, counts.production_runs, counts.note_events, counts.technicians
    )
}

pub fn handle_export(ctx: &AppContext, args: &ExportArgs) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    let codec = BackupCodec::new(&store);

    if args.output.as_deref() == Some(Path::new("-")) {
        println!("{}", codec.export_json()?);
        return Ok(());
    }

    let path = match &args.output {
        Some(path) => path.clone(),
        None => ctx.backup_dir().join(default_backup_file_name()),
    };
    let counts = codec.export_to_file(&path)?;

    if !ctx.quiet {
        println!("Exported {} to {}", describe_counts(&counts), path.display());
    }
    Ok(())
}

fn load_payload(path: &Path) -> anyhow::Result<BackupPayload> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
    let candidate: Value = serde_json::from_str(&text)
        .map_err(|e| ProdlogError::Format(format!("Not valid JSON: {}", e)))?;
    Ok(BackupPayload::from_value(candidate)?)
}

fn confirm(prompt: String) -> anyhow::Result<bool> {
    Ok(Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(false)
        .interact()?)
}

pub fn handle_import(ctx: &AppContext, args: &ImportArgs) -> anyhow::Result<()> {
    let mode = args
        .mode
        .or_else(|| ctx.config.as_ref().map(|c| c.backup.default_mode))
        .unwrap_or_default();

    // Validate before touching, or even opening, the store.
    let payload = load_payload(&args.file)?;
    let store = ctx.open_store()?;

    let interactive = std::io::stdin().is_terminal();
    if !args.yes && interactive {
        let action = match mode {
            ImportMode::Replace => "Replace ALL data in",
            ImportMode::Merge => "Merge backup into",
        };
        let prompt = format!(
            "{} {} with {} (schema v{})?",
            action,
            ctx.store_path.display(),
            args.file.display(),
            payload.schema_version()
        );
        if !confirm(prompt)? {
            if !ctx.quiet {
                println!("Import cancelled");
            }
            return Ok(());
        }
    }

    let summary = BackupCodec::new(&store).import(payload, mode)?;

    if !ctx.quiet {
        println!(
            "Imported {} ({})",
            describe_counts(&summary.counts),
            summary.mode
        );
        if summary.migrated() {
            println!(
                "Backup was upgraded from schema v{}",
                summary.source_version
            );
        }
    }
    Ok(())
}
