//! Path resolution and store access shared by every command.

use std::path::{Path, PathBuf};

use prodlog_core::SqliteStore;

use crate::cli::Cli;
use crate::config::{default_config_path, default_store_path, read_config, ProdlogConfig};

/// Resolved paths and settings for one invocation.
pub struct AppContext {
    pub config_path: PathBuf,
    pub config: Option<ProdlogConfig>,
    pub store_path: PathBuf,
    pub quiet: bool,
}

impl AppContext {
    /// Resolve config and store paths.
    ///
    /// The store path comes from `--store`/`PRODLOG_STORE`, then the config
    /// file, then the XDG data directory.
    pub fn new(cli: &Cli) -> anyhow::Result<Self> {
        let config_path = match &cli.config {
            Some(path) => path.clone(),
            None => default_config_path()?,
        };
        let config = if config_path.exists() {
            Some(read_config(&config_path)?)
        } else {
            None
        };

        let store_path = match (&cli.store, &config) {
            (Some(path), _) => path.clone(),
            (None, Some(config)) => PathBuf::from(&config.store.path),
            (None, None) => default_store_path()?,
        };

        Ok(Self {
            config_path,
            config,
            store_path,
            quiet: cli.quiet,
        })
    }

    /// Open the existing store, upgrading its layout if needed.
    pub fn open_store(&self) -> anyhow::Result<SqliteStore> {
        if !self.store_path.exists() {
            return Err(anyhow::anyhow!(missing_store_message(&self.store_path)));
        }
        Ok(SqliteStore::open(&self.store_path)?)
    }

    /// Open the store, creating it if missing.
    pub fn create_store(&self) -> anyhow::Result<SqliteStore> {
        Ok(SqliteStore::open(&self.store_path)?)
    }

    /// Directory `export` writes to when no output path is given.
    pub fn backup_dir(&self) -> PathBuf {
        self.config
            .as_ref()
            .and_then(|config| config.backup.directory.as_ref())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Error message when the store file is missing.
pub fn missing_store_message(path: &Path) -> String {
    format!(
        "No store found at {}\nHint: Run `prodlog init`, or point PRODLOG_STORE at an existing store.",
        path.display()
    )
}
