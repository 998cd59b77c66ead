use prodlog_core::storage::Collection;
use prodlog_core::{ProdlogError, RecordStore, Repository};

use crate::app::{missing_store_message, AppContext};

pub fn handle_doctor(ctx: &AppContext) -> anyhow::Result<()> {
    if !ctx.store_path.exists() {
        eprintln!("{}", missing_store_message(&ctx.store_path));
        return Err(anyhow::anyhow!("Store is not initialized"));
    }

    let store = ctx.open_store()?;
    if let Err(err) = store.check_integrity() {
        eprintln!("Doctor: FAILED");
        eprintln!("- integrity check: FAILED");
        eprintln!("- error: {}", err);
        eprintln!("Hint: Restore from a backup with `prodlog import --mode replace`.");
        return Err(anyhow::anyhow!("Doctor failed"));
    }

    let issues = Repository::new(&store).check_records()?;
    if !issues.is_empty() {
        eprintln!("Doctor: FAILED");
        eprintln!("- records: {} unreadable", issues.len());
        for issue in &issues {
            if let ProdlogError::CorruptRecord {
                collection,
                id,
                reason,
            } = issue
            {
                eprintln!("  - {} {}: {}", collection, id, reason);
            }
        }
        eprintln!("Hint: These records are left out of listings. Fix or remove them and re-import the backup.");
        return Err(anyhow::anyhow!("Doctor failed"));
    }

    if !ctx.quiet {
        let config = if ctx.config.is_some() {
            format!("OK ({})", ctx.config_path.display())
        } else {
            format!("not found ({})", ctx.config_path.display())
        };
        println!("Doctor: OK");
        println!("- config: {}", config);
        println!("- store: OK ({})", ctx.store_path.display());
        println!("- schema: v{}", store.schema_version()?);
        for collection in Collection::ALL {
            println!("- {}: {} records", collection, store.count(collection)?);
        }
        println!("- records: OK");
        println!("- integrity: OK");
    }
    Ok(())
}
