//! Backup engine
//!
//! Runs export and restore for a selection of sections against the adapters
//! it was built with.
//!
//! Export is all-or-nothing: every selected store is read and the snapshot is
//! encoded in memory before the sink is opened, so a failing store never
//! leaves a half-written artifact.
//!
//! Restore is all-or-nothing up to decoding: a snapshot that cannot be parsed
//! touches no store. Once decoded, sections are applied one at a time and
//! independently. Stores share no transaction, so a failure in one section
//! does not roll back sections already applied; all failures are collected
//! and returned together as `PartialRestoreFailure`.

use std::fmt;
use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};

use crate::error::{BackupError, SectionFailure};

use super::adapter::StoreSet;
use super::codec::{self, DecodedSnapshot, CURRENT_FORMAT_VERSION};
use super::section::{Section, Selection};
use super::sink::StorageSink;
use super::snapshot::Snapshot;

/// Cooperative cancellation flag shared between a caller and a running call
///
/// Checked before each section's adapter call, never in the middle of one.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Outcome of a successful export
#[derive(Debug, Clone)]
pub struct ExportReport {
    pub format_version: u32,
    pub exported_at: DateTime<Utc>,
    /// Exported sections with their record counts, in catalog order
    pub sections: Vec<(Section, usize)>,
    pub bytes_written: usize,
    pub destination: String,
}

impl ExportReport {
    /// Total records across all sections
    pub fn record_count(&self) -> usize {
        self.sections.iter().map(|(_, n)| n).sum()
    }

    pub fn summary(&self) -> String {
        if self.sections.is_empty() {
            return "Exported: nothing".to_string();
        }
        let parts: Vec<_> = self
            .sections
            .iter()
            .map(|(s, n)| format!("{} ({})", s.key(), n))
            .collect();
        format!("Exported: {}", parts.join(", "))
    }
}

/// Outcome of a fully successful restore
#[derive(Debug, Clone)]
pub struct RestoreReport {
    pub format_version: u32,
    pub exported_at_epoch_millis: i64,
    /// Replaced sections with the number of records written
    pub restored: Vec<(Section, usize)>,
    /// Selected sections the snapshot did not contain; left untouched
    pub skipped: Vec<Section>,
}

impl RestoreReport {
    pub fn restored_sections(&self) -> Vec<Section> {
        self.restored.iter().map(|(s, _)| *s).collect()
    }

    /// Whether every selected section was replaced
    pub fn all_restored(&self) -> bool {
        self.skipped.is_empty()
    }

    pub fn summary(&self) -> String {
        let restored: Vec<_> = self
            .restored
            .iter()
            .map(|(s, n)| format!("{} ({})", s.key(), n))
            .collect();
        let mut summary = if restored.is_empty() {
            "Restored: nothing".to_string()
        } else {
            format!("Restored: {}", restored.join(", "))
        };
        if !self.skipped.is_empty() {
            let skipped: Vec<_> = self.skipped.iter().map(|s| s.key()).collect();
            summary.push_str(&format!("; not in snapshot: {}", skipped.join(", ")));
        }
        summary
    }
}

/// State of one section inside a snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionState {
    /// Not exported
    Absent,
    /// Exported with this many records
    Present(usize),
    /// Present but undecodable
    Malformed(String),
}

impl fmt::Display for SectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => write!(f, "absent"),
            Self::Present(n) => write!(f, "{} record(s)", n),
            Self::Malformed(reason) => write!(f, "malformed ({})", reason),
        }
    }
}

/// What a snapshot holds, read without touching any store
#[derive(Debug, Clone)]
pub struct SnapshotSummary {
    pub format_version: u32,
    pub exported_at_epoch_millis: i64,
    /// Every catalog section, in order
    pub sections: Vec<(Section, SectionState)>,
}

impl SnapshotSummary {
    fn from_decoded(decoded: &DecodedSnapshot) -> Self {
        let sections = Section::all()
            .iter()
            .map(|section| {
                let state = if let Some(err) = decoded.rejected.get(section) {
                    SectionState::Malformed(match err {
                        BackupError::SectionDecodeFailure { message, .. } => message.clone(),
                        other => other.to_string(),
                    })
                } else if let Some(records) = decoded.snapshot.get(*section) {
                    SectionState::Present(records.len())
                } else {
                    SectionState::Absent
                };
                (*section, state)
            })
            .collect();

        Self {
            format_version: decoded.snapshot.format_version,
            exported_at_epoch_millis: decoded.snapshot.exported_at_epoch_millis,
            sections,
        }
    }

    pub fn state(&self, section: Section) -> &SectionState {
        self.sections
            .iter()
            .find(|(s, _)| *s == section)
            .map(|(_, state)| state)
            .unwrap_or(&SectionState::Absent)
    }

    /// Whether every section is present and decodable
    pub fn is_complete(&self) -> bool {
        self.sections
            .iter()
            .all(|(_, state)| matches!(state, SectionState::Present(_)))
    }

    pub fn summary(&self) -> String {
        let mut present = Vec::new();
        let mut missing = Vec::new();
        let mut malformed = Vec::new();
        for (section, state) in &self.sections {
            match state {
                SectionState::Present(_) => present.push(section.key()),
                SectionState::Absent => missing.push(section.key()),
                SectionState::Malformed(_) => malformed.push(section.key()),
            }
        }

        let mut summary = if missing.is_empty() && malformed.is_empty() {
            format!("Complete snapshot (v{})", self.format_version)
        } else {
            format!(
                "Partial snapshot (v{}): has {}, missing {}",
                self.format_version,
                join_or_none(&present),
                join_or_none(&missing)
            )
        };
        if !malformed.is_empty() {
            summary.push_str(&format!(", malformed {}", malformed.join(", ")));
        }
        summary
    }
}

fn join_or_none(keys: &[&str]) -> String {
    if keys.is_empty() {
        "none".to_string()
    } else {
        keys.join(", ")
    }
}

/// Orchestrates export and restore across store adapters
///
/// Holds no state between calls beyond its adapters, so independent calls
/// against different sinks may run concurrently. Calls touching the same
/// stores must be serialized by the caller.
pub struct BackupEngine {
    stores: StoreSet,
}

impl BackupEngine {
    pub fn new(stores: StoreSet) -> Self {
        Self { stores }
    }

    pub fn stores(&self) -> &StoreSet {
        &self.stores
    }

    /// Drop sections that have no adapter
    fn effective(&self, selection: &Selection) -> Selection {
        let effective = selection.intersect(|s| self.stores.contains(s));
        if effective.len() != selection.len() {
            tracing::debug!(
                requested = %selection.keys(),
                effective = %effective.keys(),
                "dropping sections without an adapter"
            );
        }
        effective
    }

    /// Export the selected sections into `sink`
    pub fn export(
        &self,
        selection: &Selection,
        sink: &dyn StorageSink,
    ) -> Result<ExportReport, BackupError> {
        self.export_with_cancel(selection, sink, &CancelToken::new())
    }

    /// Export, stopping before the next section once `cancel` is set
    ///
    /// A cancelled export writes nothing to the sink.
    pub fn export_with_cancel(
        &self,
        selection: &Selection,
        sink: &dyn StorageSink,
        cancel: &CancelToken,
    ) -> Result<ExportReport, BackupError> {
        let started = Instant::now();
        let selection = self.effective(selection);
        tracing::info!(
            op = "export",
            sections = %selection.keys(),
            destination = %sink.describe(),
            "backup export started"
        );

        let exported_at = Utc::now();
        let mut snapshot = Snapshot::new(CURRENT_FORMAT_VERSION, exported_at);
        let mut counts = Vec::with_capacity(selection.len());

        for section in selection.iter() {
            if cancel.is_cancelled() {
                tracing::info!(op = "export", section = %section, "export cancelled");
                return Err(BackupError::Cancelled {
                    completed: Vec::new(),
                    failed: Vec::new(),
                });
            }

            let Some(adapter) = self.stores.get(section) else {
                continue;
            };
            let records = adapter.export().map_err(|e| {
                tracing::error!(op = "export", section = %section, error = %e, "export failed");
                e
            })?;
            tracing::debug!(section = %section, records = records.len(), "section exported");
            counts.push((section, records.len()));
            snapshot.insert(records);
        }

        let bytes = codec::encode(&snapshot)?;
        if cancel.is_cancelled() {
            return Err(BackupError::Cancelled {
                completed: Vec::new(),
                failed: Vec::new(),
            });
        }
        write_to_sink(sink, &bytes)?;

        tracing::info!(
            op = "export",
            bytes = bytes.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "backup export finished"
        );

        Ok(ExportReport {
            format_version: snapshot.format_version,
            exported_at,
            sections: counts,
            bytes_written: bytes.len(),
            destination: sink.describe(),
        })
    }

    /// Restore the selected sections from `sink`
    pub fn restore(
        &self,
        selection: &Selection,
        sink: &dyn StorageSink,
    ) -> Result<RestoreReport, BackupError> {
        self.restore_with_cancel(selection, sink, &CancelToken::new())
    }

    /// Restore, stopping before the next section once `cancel` is set
    ///
    /// Sections applied before cancellation stay applied and the rest are
    /// untouched. `Cancelled` still carries every selected section that
    /// failed or could not be decoded.
    pub fn restore_with_cancel(
        &self,
        selection: &Selection,
        sink: &dyn StorageSink,
        cancel: &CancelToken,
    ) -> Result<RestoreReport, BackupError> {
        let started = Instant::now();
        let selection = self.effective(selection);
        tracing::info!(
            op = "restore",
            sections = %selection.keys(),
            source = %sink.describe(),
            "backup restore started"
        );

        let bytes = read_from_sink(sink)?;
        let DecodedSnapshot {
            mut snapshot,
            mut rejected,
        } = codec::decode(&bytes).map_err(|e| {
            tracing::error!(op = "restore", error = %e, "snapshot rejected, no store touched");
            e
        })?;

        let mut restored = Vec::new();
        let mut skipped = Vec::new();
        let mut failed = Vec::new();

        for section in selection.iter() {
            if let Some(error) = rejected.remove(&section) {
                failed.push(SectionFailure { section, error });
                continue;
            }

            let Some(records) = snapshot.take(section) else {
                tracing::debug!(section = %section, "section not in snapshot, left untouched");
                skipped.push(section);
                continue;
            };

            if cancel.is_cancelled() {
                // Selected sections that could never apply are reported too
                failed.extend(selection.iter().filter_map(|rest| {
                    rejected
                        .remove(&rest)
                        .map(|error| SectionFailure { section: rest, error })
                }));
                tracing::info!(
                    op = "restore",
                    section = %section,
                    restored = restored.len(),
                    failed = failed.len(),
                    "restore cancelled"
                );
                return Err(BackupError::Cancelled {
                    completed: restored.into_iter().map(|(s, _)| s).collect(),
                    failed,
                });
            }

            let Some(adapter) = self.stores.get(section) else {
                continue;
            };
            let count = records.len();
            match adapter.replace(records) {
                Ok(()) => {
                    tracing::debug!(section = %section, records = count, "section restored");
                    restored.push((section, count));
                }
                Err(error) => {
                    tracing::warn!(section = %section, error = %error, "section restore failed");
                    failed.push(SectionFailure { section, error });
                }
            }
        }

        tracing::info!(
            op = "restore",
            restored = restored.len(),
            failed = failed.len(),
            skipped = skipped.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "backup restore finished"
        );

        if !failed.is_empty() {
            return Err(BackupError::PartialRestoreFailure {
                restored: restored.into_iter().map(|(s, _)| s).collect(),
                failed,
            });
        }

        Ok(RestoreReport {
            format_version: snapshot.format_version,
            exported_at_epoch_millis: snapshot.exported_at_epoch_millis,
            restored,
            skipped,
        })
    }

    /// Decode `sink` and describe its contents without touching any store
    pub fn inspect(&self, sink: &dyn StorageSink) -> Result<SnapshotSummary, BackupError> {
        let bytes = read_from_sink(sink)?;
        let decoded = codec::decode(&bytes)?;
        Ok(SnapshotSummary::from_decoded(&decoded))
    }
}

fn write_to_sink(sink: &dyn StorageSink, bytes: &[u8]) -> Result<(), BackupError> {
    let unavailable = |e: std::io::Error| {
        BackupError::SinkUnavailable(format!("{}: {}", sink.describe(), e))
    };

    let mut writer = sink.open_write().map_err(unavailable)?;
    writer.write_all(bytes).map_err(unavailable)?;
    writer.flush().map_err(unavailable)
}

fn read_from_sink(sink: &dyn StorageSink) -> Result<Vec<u8>, BackupError> {
    let unavailable = |e: std::io::Error| {
        BackupError::SinkUnavailable(format!("{}: {}", sink.describe(), e))
    };

    let mut bytes = Vec::new();
    sink.open_read()
        .map_err(unavailable)?
        .read_to_end(&mut bytes)
        .map_err(unavailable)?;
    Ok(bytes)
}
