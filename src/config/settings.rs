//! User settings for Encore
//!
//! Manages defaults for backup selection, archive retention and log output.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::paths::EncorePaths;
use crate::backup::{Section, Selection};
use crate::error::EncoreError;

/// Output format for diagnostic logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pretty => write!(f, "pretty"),
            Self::Json => write!(f, "json"),
        }
    }
}

impl FromStr for LogFormat {
    type Err = EncoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(EncoreError::Config(format!("Unknown log format: {}", other))),
        }
    }
}

/// User settings for Encore
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Section keys exported and restored when the caller names none
    #[serde(default = "default_sections")]
    pub default_sections: Vec<String>,

    /// Number of archived snapshots kept by `prune`
    #[serde(default = "default_backup_keep")]
    pub backup_keep: usize,

    /// Diagnostic log format
    #[serde(default)]
    pub log_format: LogFormat,

    /// Archive the current data before every restore
    #[serde(default = "default_true")]
    pub snapshot_before_restore: bool,
}

fn default_schema_version() -> u32 {
    1
}

fn default_sections() -> Vec<String> {
    Section::all().iter().map(|s| s.key().to_string()).collect()
}

fn default_backup_keep() -> usize {
    10
}

fn default_true() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            default_sections: default_sections(),
            backup_keep: default_backup_keep(),
            log_format: LogFormat::default(),
            snapshot_before_restore: true,
        }
    }
}

impl Settings {
    /// The configured default selection; unknown keys are dropped
    pub fn default_selection(&self) -> Selection {
        Selection::from_keys(self.default_sections.iter().map(String::as_str))
    }

    /// Load settings from disk, or return defaults if the file doesn't exist
    pub fn load_or_create(paths: &EncorePaths) -> Result<Self, EncoreError> {
        let settings_path = paths.settings_file();

        if !settings_path.exists() {
            // Don't save yet - let caller decide when to persist
            return Ok(Settings::default());
        }

        let contents = std::fs::read_to_string(&settings_path)
            .map_err(|e| EncoreError::Io(format!("Failed to read settings file: {}", e)))?;

        serde_json::from_str(&contents)
            .map_err(|e| EncoreError::Config(format!("Failed to parse settings file: {}", e)))
    }

    /// Save settings to disk
    pub fn save(&self, paths: &EncorePaths) -> Result<(), EncoreError> {
        paths.ensure_directories()?;

        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| EncoreError::Config(format!("Failed to serialize settings: {}", e)))?;

        std::fs::write(paths.settings_file(), contents)
            .map_err(|e| EncoreError::Io(format!("Failed to write settings file: {}", e)))?;

        Ok(())
    }
}
