use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use prodlog_core::model::{NoteCategory, RunStatus};
use prodlog_core::{ImportMode, VERSION};

/// Prodlog - a local-first production log for small-batch makers
#[derive(Parser)]
#[command(name = "prodlog")]
#[command(author, version = VERSION, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the store database
    #[arg(short, long, global = true, env = "PRODLOG_STORE")]
    pub store: Option<PathBuf>,

    /// Path to the config file
    #[arg(long, global = true, env = "PRODLOG_CONFIG")]
    pub config: Option<PathBuf>,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Log store activity to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create or upgrade the store and write the config file
    Init(InitArgs),

    /// Write a backup of the whole store
    Export(ExportArgs),

    /// Restore a backup file
    Import(ImportArgs),

    /// List batch templates
    Templates(TemplatesArgs),

    /// List production runs
    Runs(RunsArgs),

    /// List notes
    Notes(NotesArgs),

    /// List technicians
    Technicians(TechniciansArgs),

    /// Check store integrity
    Doctor,
}

/// Arguments for the `init` command
#[derive(Args)]
pub struct InitArgs {
    /// Add starter templates when the store has none
    #[arg(long)]
    pub seed: bool,
}

/// Arguments for the `export` command
#[derive(Args)]
pub struct ExportArgs {
    /// Output file, or `-` for stdout
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

/// Arguments for the `import` command
#[derive(Args)]
pub struct ImportArgs {
    /// Backup file to restore
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// merge (upsert by id) or replace (wipe first)
    #[arg(long, value_name = "MODE")]
    pub mode: Option<ImportMode>,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

/// Arguments for the `templates` command
#[derive(Args)]
pub struct TemplatesArgs {
    /// Only templates carrying this tag
    #[arg(long)]
    pub tag: Option<String>,

    /// Match against template and material names
    #[arg(long, value_name = "TEXT")]
    pub search: Option<String>,

    /// Show the most used templates instead
    #[arg(long, value_name = "N")]
    pub top: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `runs` command
#[derive(Args)]
pub struct RunsArgs {
    /// Production date (YYYY-MM-DD)
    #[arg(long)]
    pub date: Option<String>,

    /// Technician initials
    #[arg(long)]
    pub technician: Option<String>,

    /// Template id
    #[arg(long, value_name = "ID")]
    pub template: Option<String>,

    /// planned, done, changed or canceled
    #[arg(long)]
    pub status: Option<RunStatus>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `notes` command
#[derive(Args)]
pub struct NotesArgs {
    /// proposal, incident, reminder or other
    #[arg(long)]
    pub category: Option<NoteCategory>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `technicians` command
#[derive(Args)]
pub struct TechniciansArgs {
    /// Include run counts
    #[arg(long)]
    pub stats: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}
