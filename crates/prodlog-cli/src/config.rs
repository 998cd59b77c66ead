use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use prodlog_core::ImportMode;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProdlogConfig {
    pub store: StoreSection,
    #[serde(default)]
    pub backup: BackupSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSection {
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BackupSection {
    /// Where `export` writes when no output is given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
    #[serde(default)]
    pub default_mode: ImportMode,
}

impl ProdlogConfig {
    pub fn new(store_path: &Path) -> Self {
        Self {
            store: StoreSection {
                path: store_path.to_string_lossy().to_string(),
            },
            backup: BackupSection::default(),
        }
    }
}

pub fn default_config_path() -> anyhow::Result<PathBuf> {
    Ok(xdg_config_dir()?.join("config.toml"))
}

pub fn default_store_path() -> anyhow::Result<PathBuf> {
    Ok(xdg_data_dir()?.join("prodlog.db"))
}

pub fn read_config(path: &Path) -> anyhow::Result<ProdlogConfig> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read config {}: {}", path.display(), e))?;
    toml::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("Failed to parse config {}: {}", path.display(), e))
}

pub fn write_config(path: &Path, config: &ProdlogConfig) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            anyhow::anyhow!(
                "Failed to create config directory {}: {}",
                parent.display(),
                e
            )
        })?;
    }
    let contents =
        toml::to_string_pretty(config).map_err(|e| anyhow::anyhow!("TOML error: {}", e))?;
    std::fs::write(path, contents)
        .map_err(|e| anyhow::anyhow!("Failed to write config {}: {}", path.display(), e))?;
    Ok(())
}

pub fn xdg_config_dir() -> anyhow::Result<PathBuf> {
    if let Ok(value) = std::env::var("XDG_CONFIG_HOME") {
        if !value.trim().is_empty() {
            return Ok(PathBuf::from(value).join("prodlog"));
        }
    }
    Ok(home_dir()?.join(".config").join("prodlog"))
}

pub fn xdg_data_dir() -> anyhow::Result<PathBuf> {
    if let Ok(value) = std::env::var("XDG_DATA_HOME") {
        if !value.trim().is_empty() {
            return Ok(PathBuf::from(value).join("prodlog"));
        }
    }
    Ok(home_dir()?.join(".local").join("share").join("prodlog"))
}

fn home_dir() -> anyhow::Result<PathBuf> {
    let home = std::env::var("HOME")
        .map_err(|_| anyhow::anyhow!("HOME is not set; cannot resolve default paths"))?;
    Ok(PathBuf::from(home))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_config_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prodlog").join("config.toml");

        let mut config = ProdlogConfig::new(Path::new("/tmp/prodlog.db"));
        config.backup.directory = Some("/tmp/backups".into());
        config.backup.default_mode = ImportMode::Replace;
        write_config(&path, &config).unwrap();

        assert_eq!(read_config(&path).unwrap(), config);
    }

    #[test]
    fn test_backup_section_is_optional() {
        let config: ProdlogConfig = toml::from_str("[store]\npath = \"/data/prodlog.db\"\n").unwrap();
        assert_eq!(config.store.path, "/data/prodlog.db");
        assert_eq!(config.backup.default_mode, ImportMode::Merge);
        assert_eq!(config.backup.directory, None);
    }

    #[test]
    fn test_unknown_mode_is_rejected() {
        let result: Result<ProdlogConfig, _> = toml::from_str(
            "[store]\npath = \"/data/prodlog.db\"\n\n[backup]\ndefault_mode = \"overwrite\"\n",
        );
        assert!(result.is_err());
    }
}
