//! Config file discovery

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info};

use retrosync_core::SyncConfig;

const CONFIG_FILE: &str = "retrosync.toml";

/// Platform config location (`~/.config/retrosync/retrosync.toml` on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("io", "retrosync", "retrosync")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}

/// Load the sync configuration.
///
/// An explicit path must exist. Without one the platform location is tried,
/// and a missing file there means defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<SyncConfig> {
    if let Some(path) = explicit {
        let config = SyncConfig::load(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?;
        info!("Loaded config from {}", path.display());
        return Ok(config);
    }

    load_or_default(default_config_path().as_deref())
}

fn load_or_default(path: Option<&Path>) -> Result<SyncConfig> {
    match path {
        Some(path) if path.exists() => {
            let config = SyncConfig::load(path)
                .with_context(|| format!("Failed to load config: {}", path.display()))?;
            info!("Loaded config from {}", path.display());
            Ok(config)
        }
        Some(path) => {
            debug!("No config at {}, using defaults", path.display());
            Ok(SyncConfig::default())
        }
        None => Ok(SyncConfig::default()),
    }
}
