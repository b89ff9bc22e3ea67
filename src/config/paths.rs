//! Path management for Encore
//!
//! ## Path Resolution Order
//!
//! 1. `ENCORE_DATA_DIR` environment variable (if set)
//! 2. The platform data directory reported by `directories`
//!    (e.g. `~/.local/share/encore` on Linux)
//! 3. `$HOME/.local/share/encore`

use std::path::PathBuf;

use directories::ProjectDirs;

use crate::error::EncoreError;

/// Environment variable overriding the base directory
pub const DATA_DIR_ENV: &str = "ENCORE_DATA_DIR";

/// Manages all paths used by Encore
#[derive(Debug, Clone)]
pub struct EncorePaths {
    /// Base directory for all Encore data
    base_dir: PathBuf,
}

impl EncorePaths {
    /// Create a new EncorePaths instance
    ///
    /// # Errors
    ///
    /// Returns an error if no home or data directory can be determined.
    pub fn new() -> Result<Self, EncoreError> {
        let base_dir = match std::env::var(DATA_DIR_ENV) {
            Ok(custom) if !custom.is_empty() => PathBuf::from(custom),
            _ => resolve_default_path()?,
        };

        Ok(Self { base_dir })
    }

    /// Create EncorePaths with a custom base directory (useful for testing)
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the base directory
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the data directory holding the live stores
    pub fn data_dir(&self) -> PathBuf {
        self.base_dir.join("data")
    }

    /// Get the backup directory holding archived snapshots
    pub fn backup_dir(&self) -> PathBuf {
        self.base_dir.join("backups")
    }

    /// Get the path to the settings file
    pub fn settings_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Get the path to the audit log
    pub fn audit_log(&self) -> PathBuf {
        self.base_dir.join("audit.log")
    }

    pub fn preferences_file(&self) -> PathBuf {
        self.data_dir().join("preferences.json")
    }

    pub fn favorites_file(&self) -> PathBuf {
        self.data_dir().join("favorites.json")
    }

    pub fn lyrics_file(&self) -> PathBuf {
        self.data_dir().join("lyrics.json")
    }

    pub fn search_history_file(&self) -> PathBuf {
        self.data_dir().join("search_history.json")
    }

    pub fn transitions_file(&self) -> PathBuf {
        self.data_dir().join("transitions.json")
    }

    /// Ensure the base, data and backup directories exist
    pub fn ensure_directories(&self) -> Result<(), EncoreError> {
        std::fs::create_dir_all(&self.base_dir)
            .map_err(|e| EncoreError::Io(format!("Failed to create base directory: {}", e)))?;

        std::fs::create_dir_all(self.data_dir())
            .map_err(|e| EncoreError::Io(format!("Failed to create data directory: {}", e)))?;

        std::fs::create_dir_all(self.backup_dir())
            .map_err(|e| EncoreError::Io(format!("Failed to create backup directory: {}", e)))?;

        Ok(())
    }
}

fn resolve_default_path() -> Result<PathBuf, EncoreError> {
    if let Some(dirs) = ProjectDirs::from("", "", "encore") {
        return Ok(dirs.data_dir().to_path_buf());
    }

    let home = std::env::var("HOME")
        .map_err(|_| EncoreError::Config("Could not determine home directory".into()))?;
    Ok(PathBuf::from(home).join(".local").join("share").join("encore"))
}
