//! Prodlog CLI - a local-first production log for small-batch makers
//!
//! This is the command-line interface for Prodlog. It exposes the store,
//! listing and backup operations of the core library.

mod app;
mod cli;
mod commands;
mod config;
mod errors;
mod logging;
mod output;

use clap::Parser;

use crate::app::AppContext;
use crate::cli::{Cli, Commands};
use crate::commands::{backup, doctor, init, notes, runs, technicians, templates};

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", errors::describe(&e));
        std::process::exit(errors::exit_code(&e));
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let ctx = AppContext::new(cli)?;

    match &cli.command {
        Commands::Init(args) => init::handle_init(&ctx, args),
        Commands::Export(args) => backup::handle_export(&ctx, args),
        Commands::Import(args) => backup::handle_import(&ctx, args),
        Commands::Templates(args) => templates::handle_templates(&ctx, args),
        Commands::Runs(args) => runs::handle_runs(&ctx, args),
        Commands::Notes(args) => notes::handle_notes(&ctx, args),
        Commands::Technicians(args) => technicians::handle_technicians(&ctx, args),
        Commands::Doctor => doctor::handle_doctor(&ctx),
    }
}
