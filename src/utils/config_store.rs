//! ConfigStore - Local Configuration Storage
//!
//! The configuration file lives in the platform config directory and is
//! created empty on first run; every missing key takes its default.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::domain::config::AppConfig;
use crate::error::Result;
use crate::helpers::get_or_create_config_dir;

/// Name of the configuration file
pub const CONFIG_FILE_NAME: &str = "crop-dashboard.toml";

/// Path of the configuration file, creating an empty one if missing
pub fn config_path() -> Result<PathBuf> {
    let path = get_or_create_config_dir()?.join(CONFIG_FILE_NAME);
    if !path.exists() {
        fs::write(&path, "")?;
    }
    Ok(path)
}

/// Load the application configuration from the default location
pub fn load_config() -> Result<AppConfig> {
    load_config_from(&config_path()?)
}

/// Load the application configuration from a specific file
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    info!(path = ?path, "Loading config file");
    let value = fs::read_to_string(path)?;

    if value.trim().is_empty() {
        return Ok(AppConfig::default());
    }

    let config: AppConfig = toml::from_str(&value).map_err(|e| {
        error!(error = %e, path = ?path, "Failed to parse config file");
        e
    })?;
    Ok(config)
}

/// Save the application configuration to a specific file
pub fn save_config_to(path: &Path, config: &AppConfig) -> Result<()> {
    let value = toml::to_string(config)?;
    fs::write(path, value)?;
    Ok(())
}
