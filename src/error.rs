//! Custom error types for Encore
//!
//! `EncoreError` covers the application as a whole (configuration, files,
//! repositories). `BackupError` is the taxonomy returned by the backup engine;
//! it converts into `EncoreError` so CLI handlers can use `?` on both.

use std::fmt;

use thiserror::Error;

use crate::backup::Section;

/// The main error type for Encore operations
#[derive(Error, Debug)]
pub enum EncoreError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// Validation errors for data models
    #[error("Validation error: {0}")]
    Validation(String),

    /// Entity not found errors
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },

    /// Storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Backup engine errors
    #[error(transparent)]
    Backup(#[from] BackupError),
}

impl EncoreError {
    /// Create a "not found" error for backup archives
    pub fn backup_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Backup",
            identifier: identifier.into(),
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

impl From<std::io::Error> for EncoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for EncoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

/// Result type alias for Encore operations
pub type EncoreResult<T> = Result<T, EncoreError>;

/// A section that could not be applied during a restore
#[derive(Debug)]
pub struct SectionFailure {
    pub section: Section,
    pub error: BackupError,
}

impl fmt::Display for SectionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.section, self.error)
    }
}

/// Errors produced by the backup engine
#[derive(Error, Debug)]
pub enum BackupError {
    /// A store adapter could not read, delete or insert
    #[error("Store failure in section '{section}': {message}")]
    StoreFailure { section: Section, message: String },

    /// Bytes do not parse, or a required top-level field is missing
    #[error("Corrupt snapshot: {0}")]
    CorruptSnapshot(String),

    /// Snapshot written by a newer producer
    #[error("Unsupported snapshot format version {found} (this build reads up to {supported})")]
    UnsupportedFormat { found: u64, supported: u32 },

    /// One section's records did not match the expected shape
    #[error("Section '{section}' could not be decoded: {message}")]
    SectionDecodeFailure { section: Section, message: String },

    /// Destination or source could not be opened, read or written
    #[error("Storage sink unavailable: {0}")]
    SinkUnavailable(String),

    /// Some sections were applied, others failed
    #[error("Restore partially failed: {}", describe_partial(.restored, .failed))]
    PartialRestoreFailure {
        restored: Vec<Section>,
        failed: Vec<SectionFailure>,
    },

    /// The caller cancelled between two section steps
    ///
    /// `failed` holds the selected sections that were already known to be
    /// unusable when the operation stopped.
    #[error("Operation cancelled: {}", describe_partial(.completed, .failed))]
    Cancelled {
        completed: Vec<Section>,
        failed: Vec<SectionFailure>,
    },
}

impl BackupError {
    /// Wrap a repository error as a store failure for `section`
    pub fn store(section: Section, err: impl fmt::Display) -> Self {
        Self::StoreFailure {
            section,
            message: err.to_string(),
        }
    }

    /// Sections that failed, for a partial or cancelled restore
    pub fn failed_sections(&self) -> Vec<Section> {
        match self {
            Self::PartialRestoreFailure { failed, .. } | Self::Cancelled { failed, .. } => {
                failed.iter().map(|f| f.section).collect()
            }
            Self::StoreFailure { section, .. } | Self::SectionDecodeFailure { section, .. } => {
                vec![*section]
            }
            _ => Vec::new(),
        }
    }

    /// Check if this error left no store modified
    pub fn is_clean(&self) -> bool {
        match self {
            Self::PartialRestoreFailure { restored, .. } => restored.is_empty(),
            Self::Cancelled { completed, .. } => completed.is_empty(),
            _ => true,
        }
    }
}

fn describe_partial(restored: &[Section], failed: &[SectionFailure]) -> String {
    let restored: Vec<_> = restored.iter().map(|s| s.key()).collect();
    let failed: Vec<_> = failed.iter().map(|f| f.to_string()).collect();
    format!(
        "restored [{}], failed [{}]",
        restored.join(", "),
        failed.join("; ")
    )
}
