//! Audit entry data structures
//!
//! One entry per backup operation: what ran, on which sections, against
//! which file, and how it ended.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::backup::Section;
use crate::error::{BackupError, EncoreError};

/// Types of operations that are audited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Export,
    Restore,
    Prune,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Export => write!(f, "EXPORT"),
            Operation::Restore => write!(f, "RESTORE"),
            Operation::Prune => write!(f, "PRUNE"),
        }
    }
}

/// How an operation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Succeeded,
    /// Some sections applied, some failed
    Partial,
    Cancelled,
    Failed,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Succeeded => write!(f, "ok"),
            Outcome::Partial => write!(f, "partial"),
            Outcome::Cancelled => write!(f, "cancelled"),
            Outcome::Failed => write!(f, "failed"),
        }
    }
}

impl Outcome {
    /// Classify an error returned by a backup operation
    pub fn of_error(error: &EncoreError) -> Self {
        match error {
            EncoreError::Backup(BackupError::PartialRestoreFailure { .. }) => Outcome::Partial,
            EncoreError::Backup(BackupError::Cancelled { .. }) => Outcome::Cancelled,
            _ => Outcome::Failed,
        }
    }
}

/// A single audit log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// When the operation finished (UTC)
    pub timestamp: DateTime<Utc>,

    pub operation: Operation,

    /// Sections the operation was asked to cover
    #[serde(default)]
    pub sections: Vec<Section>,

    /// Snapshot file or directory the operation worked on
    pub target: String,

    pub outcome: Outcome,

    /// Report summary or error message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl AuditEntry {
    /// Entry for an operation that completed
    pub fn succeeded(
        operation: Operation,
        sections: Vec<Section>,
        target: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            operation,
            sections,
            target: target.into(),
            outcome: Outcome::Succeeded,
            detail: Some(detail.into()),
        }
    }

    /// Entry for an operation that returned `error`
    pub fn failed(
        operation: Operation,
        sections: Vec<Section>,
        target: impl Into<String>,
        error: &EncoreError,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            operation,
            sections,
            target: target.into(),
            outcome: Outcome::of_error(error),
            detail: Some(error.to_string()),
        }
    }

    /// Format the entry for human-readable display
    pub fn format_human_readable(&self) -> String {
        let keys: Vec<_> = self.sections.iter().map(|s| s.key()).collect();
        let mut output = format!(
            "[{}] {} {} [{}] {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            self.operation,
            self.target,
            keys.join(","),
            self.outcome
        );

        if let Some(detail) = &self.detail {
            output.push_str(&format!("\n  {}", detail));
        }

        output
    }
}
