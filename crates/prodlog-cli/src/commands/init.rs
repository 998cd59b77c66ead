use prodlog_core::seed::seed_if_empty;
use prodlog_core::{RecordStore, Repository};

use crate::app::AppContext;
use crate::cli::InitArgs;
use crate::config::{write_config, ProdlogConfig};

pub fn handle_init(ctx: &AppContext, args: &InitArgs) -> anyhow::Result<()> {
    let existed = ctx.store_path.exists();
    let store = ctx.create_store()?;
    let version = store.schema_version()?;

    // An existing config keeps its backup settings; only the store path is set.
    let mut config = ctx
        .config
        .clone()
        .unwrap_or_else(|| ProdlogConfig::new(&ctx.store_path));
    config.store.path = ctx.store_path.to_string_lossy().to_string();
    if ctx.config.as_ref() != Some(&config) {
        write_config(&ctx.config_path, &config)?;
    }

    let seeded = if args.seed {
        seed_if_empty(&Repository::new(&store))?
    } else {
        0
    };

    if !ctx.quiet {
        let verb = if existed { "Opened" } else { "Created" };
        println!(
            "{} store at {} (schema v{})",
            verb,
            ctx.store_path.display(),
            version
        );
        println!("Config: {}", ctx.config_path.display());
        if seeded > 0 {
            println!("Added {} starter templates", seeded);
        }
    }
    Ok(())
}
