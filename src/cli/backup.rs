//! Backup CLI commands
//!
//! Thin glue between clap and the backup engine. Every export, restore and
//! prune is recorded in the audit journal, whether it succeeds or not.

use chrono::TimeZone;
use clap::Subcommand;
use std::path::{Path, PathBuf};

use crate::audit::{AuditEntry, AuditLogger, Operation};
use crate::backup::{
    BackupArchive, BackupEngine, ExportReport, FileSink, Section, SectionState, Selection,
    StoreSet,
};
use crate::config::settings::Settings;
use crate::error::EncoreResult;
use crate::storage::Storage;

/// Backup commands
#[derive(Subcommand)]
pub enum BackupCommands {
    /// Export sections into a snapshot file
    Export {
        /// Sections to export, comma separated (default: configured sections)
        #[arg(short, long, value_delimiter = ',')]
        sections: Vec<String>,

        /// Write to this file instead of a new archive file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Restore sections from a snapshot
    Restore {
        /// Snapshot filename or path (use 'latest' for most recent)
        backup: String,

        /// Sections to restore, comma separated (default: configured sections)
        #[arg(short, long, value_delimiter = ',')]
        sections: Vec<String>,

        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Show what a snapshot contains
    Inspect {
        /// Snapshot filename or path
        backup: String,
    },

    /// List archived snapshots
    List {
        /// Show detailed information
        #[arg(short, long)]
        verbose: bool,
    },

    /// Delete old archived snapshots
    Prune {
        /// Number of snapshots to keep (default: from settings)
        #[arg(short, long)]
        keep: Option<usize>,

        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// List the sections that can be backed up
    Sections,
}

/// Handle a backup command
pub fn handle_backup_command(
    storage: &Storage,
    settings: &Settings,
    cmd: BackupCommands,
) -> EncoreResult<()> {
    let paths = storage.paths();
    let archive = BackupArchive::new(paths.backup_dir());
    let audit = AuditLogger::new(paths.audit_log());
    let engine = BackupEngine::new(StoreSet::from_storage(storage));

    match cmd {
        BackupCommands::Export { sections, output } => {
            let selection = resolve_selection(settings, &sections);

            let result: EncoreResult<(PathBuf, ExportReport)> = match &output {
                Some(path) => engine
                    .export(&selection, &FileSink::new(path))
                    .map(|report| (path.clone(), report))
                    .map_err(Into::into),
                None => archive.create(&engine, &selection),
            };
            let target = output
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| archive.dir().display().to_string());

            let (path, report) = audited(
                &audit,
                Operation::Export,
                &selection,
                &target,
                result,
                |(_, report)| report.summary(),
            )?;

            println!("{}", report.summary());
            println!("Location: {}", path.display());
            println!(
                "Total: {} record(s), {}",
                report.record_count(),
                format_size(report.bytes_written as u64)
            );
        }

        BackupCommands::Restore {
            backup,
            sections,
            force,
        } => {
            let backup_path = archive.resolve(&backup)?;
            let selection = resolve_selection(settings, &sections);
            let sink = FileSink::new(&backup_path);
            let target = backup_path.display().to_string();

            // An unreadable snapshot is a failed restore
            let summary = match engine.inspect(&sink) {
                Ok(summary) => summary,
                Err(e) => {
                    return audited(
                        &audit,
                        Operation::Restore,
                        &selection,
                        &target,
                        Err(e.into()),
                        |_: &()| String::new(),
                    )
                }
            };

            println!("Snapshot Information");
            println!("====================");
            println!("File: {}", backup_path.display());
            println!("Exported: {}", format_epoch_millis(summary.exported_at_epoch_millis));
            println!("Format version: {}", summary.format_version);
            println!("Status: {}", summary.summary());
            println!();

            if selection.is_empty() {
                println!("No sections selected; nothing to restore.");
                return Ok(());
            }

            if !force {
                println!(
                    "WARNING: This will overwrite current data in: {}",
                    selection.keys()
                );
                println!("To proceed, run again with --force flag:");
                println!("  encore restore {} --force", backup);
                return Ok(());
            }

            if settings.snapshot_before_restore {
                println!("Archiving current data before restore...");
                let (pre_restore, _) = archive.create(&engine, &selection)?;
                println!("Pre-restore snapshot saved: {}", display_name(&pre_restore));
                println!();
            }

            println!("Restoring from snapshot...");
            let report = audited(
                &audit,
                Operation::Restore,
                &selection,
                &target,
                engine.restore(&selection, &sink).map_err(Into::into),
                |report| report.summary(),
            )?;

            println!("Restore complete!");
            println!("{}", report.summary());

            if !report.all_restored() {
                println!("\nNote: Some selected sections were not in the snapshot and were left unchanged.");
            }
        }

        BackupCommands::Inspect { backup } => {
            let backup_path = archive.resolve(&backup)?;
            let summary = engine.inspect(&FileSink::new(&backup_path))?;
            let metadata = std::fs::metadata(&backup_path)?;

            println!("Snapshot Details");
            println!("================");
            println!("File: {}", backup_path.display());
            println!("Size: {}", format_size(metadata.len()));
            println!("Exported: {}", format_epoch_millis(summary.exported_at_epoch_millis));
            println!("Format version: {}", summary.format_version);
            println!();
            println!("Contents:");
            for (section, state) in &summary.sections {
                let shown = match state {
                    SectionState::Present(n) => format!("{} record(s)", n),
                    SectionState::Absent => "not included".to_string(),
                    SectionState::Malformed(reason) => format!("MALFORMED ({})", reason),
                };
                println!("  {:<16} {}", format!("{}:", section.label()), shown);
            }
            println!();
            println!("Status: {}", summary.summary());
        }

        BackupCommands::List { verbose } => {
            let entries = archive.list()?;

            if entries.is_empty() {
                println!("No snapshots found.");
                println!("Create one with: encore export");
                return Ok(());
            }

            println!("Available Snapshots");
            println!("===================");
            println!();

            for (i, entry) in entries.iter().enumerate() {
                let age = chrono::Utc::now().signed_duration_since(entry.created_at);

                if verbose {
                    println!(
                        "{}. {}\n   Created: {}\n   Size: {}\n   Age: {}\n",
                        i + 1,
                        entry.filename,
                        entry.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
                        format_size(entry.size_bytes),
                        format_duration(age),
                    );
                } else {
                    println!(
                        "  {}. {} ({} ago, {})",
                        i + 1,
                        entry.filename,
                        format_duration(age),
                        format_size(entry.size_bytes),
                    );
                }
            }

            println!();
            println!("Total: {} snapshot(s)", entries.len());
        }

        BackupCommands::Prune { keep, force } => {
            let keep = keep.unwrap_or(settings.backup_keep);
            let entries = archive.list()?;
            let to_delete = entries.len().saturating_sub(keep);

            if to_delete == 0 {
                println!("No snapshots to prune.");
                println!(
                    "Keeping {} snapshot(s); you have {}.",
                    keep,
                    entries.len()
                );
                return Ok(());
            }

            println!("Prune Summary");
            println!("=============");
            println!("Keep: {}", keep);
            println!("Current snapshots: {}", entries.len());
            println!("To be deleted: {}", to_delete);
            println!();

            if !force {
                println!("To delete old snapshots, run again with --force flag:");
                println!("  encore prune --force");
                return Ok(());
            }

            let deleted = audited(
                &audit,
                Operation::Prune,
                &Selection::none(),
                &archive.dir().display().to_string(),
                archive.prune(keep),
                |deleted| format!("Deleted {} snapshot(s)", deleted.len()),
            )?;
            println!("Deleted {} snapshot(s).", deleted.len());
        }

        BackupCommands::Sections => {
            let defaults = settings.default_selection();
            println!("Sections");
            println!("========");
            for section in Section::all() {
                let marker = if defaults.contains(*section) {
                    " (default)"
                } else {
                    ""
                };
                println!("  {:<16} {}{}", section.key(), section.label(), marker);
            }
        }
    }

    Ok(())
}

/// Sections named on the command line, or the configured defaults
fn resolve_selection(settings: &Settings, keys: &[String]) -> Selection {
    if keys.is_empty() {
        return settings.default_selection();
    }

    for key in keys {
        if Section::from_key(key).is_none() {
            eprintln!("Ignoring unknown section '{}'", key);
        }
    }
    Selection::from_keys(keys.iter().map(String::as_str))
}

/// Record `result` in the audit journal and pass it through
///
/// A failure to write the journal is logged but never replaces the
/// operation's own result.
fn audited<T>(
    audit: &AuditLogger,
    operation: Operation,
    selection: &Selection,
    target: &str,
    result: EncoreResult<T>,
    detail: impl FnOnce(&T) -> String,
) -> EncoreResult<T> {
    let entry = match &result {
        Ok(value) => AuditEntry::succeeded(operation, selection.sections(), target, detail(value)),
        Err(error) => AuditEntry::failed(operation, selection.sections(), target, error),
    };
    if let Err(e) = audit.log(&entry) {
        tracing::warn!(error = %e, "failed to write audit entry");
    }
    result
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn format_epoch_millis(millis: i64) -> String {
    match chrono::Utc.timestamp_millis_opt(millis).single() {
        Some(at) if millis > 0 => at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        _ => "unknown".to_string(),
    }
}

/// Format a duration in human-readable form
fn format_duration(duration: chrono::Duration) -> String {
    let total_seconds = duration.num_seconds();

    if total_seconds < 60 {
        return format!("{}s", total_seconds);
    }

    let minutes = total_seconds / 60;
    if minutes < 60 {
        return format!("{}m", minutes);
    }

    let hours = minutes / 60;
    if hours < 24 {
        return format!("{}h", hours);
    }

    let days = hours / 24;
    if days < 30 {
        return format!("{}d", days);
    }

    format!("{}mo", days / 30)
}

/// Format a file size in human-readable form
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
