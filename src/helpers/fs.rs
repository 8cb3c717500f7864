//! File System Utilities
//!
//! Configuration and data directory management.

use crate::error::{Error, Result};
use directories::ProjectDirs;
use std::fs;
use std::path::PathBuf;

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("com", "smartfarm", "crop-dashboard").ok_or_else(|| Error::Invalid {
        message: "Could not determine project directories".to_string(),
    })
}

/// Get or create the application's configuration directory
///
/// Platform-specific locations:
/// - **Linux**: `~/.config/crop-dashboard/` or `$XDG_CONFIG_HOME/crop-dashboard/`
/// - **macOS**: `~/Library/Application Support/com.smartfarm.crop-dashboard/`
/// - **Windows**: `C:\Users\<User>\AppData\Roaming\smartfarm\crop-dashboard\config\`
pub fn get_or_create_config_dir() -> Result<PathBuf> {
    let dirs = project_dirs()?;
    let config_dir = dirs.config_dir();

    if !config_dir.exists() {
        fs::create_dir_all(config_dir)?;
    }

    Ok(config_dir.to_path_buf())
}

/// Get or create the data directory for persisted UI state
///
/// Platform-specific locations:
/// - **Linux**: `~/.local/share/crop-dashboard/`
/// - **macOS**: `~/Library/Application Support/com.smartfarm.crop-dashboard/`
/// - **Windows**: `C:\Users\<User>\AppData\Roaming\smartfarm\crop-dashboard\data\`
pub fn get_or_create_data_dir() -> Result<PathBuf> {
    let dirs = project_dirs()?;
    let data_dir = dirs.data_dir();

    if !data_dir.exists() {
        fs::create_dir_all(data_dir)?;
    }

    Ok(data_dir.to_path_buf())
}

