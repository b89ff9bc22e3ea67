//! Snapshot archive
//!
//! Keeps exported snapshots as dated files in the backup directory, named
//! `encore-YYYYMMDD-HHMMSS-mmm.json`. The creation time is read back from the
//! filename, so listing never has to open the files.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use crate::error::{EncoreError, EncoreResult};

use super::engine::{BackupEngine, ExportReport};
use super::section::Selection;
use super::sink::FileSink;

const PREFIX: &str = "encore-";
const EXTENSION: &str = "json";
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// Metadata about an archived snapshot
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    /// Snapshot filename
    pub filename: String,
    /// Full path to the snapshot
    pub path: PathBuf,
    /// When the snapshot was created
    pub created_at: DateTime<Utc>,
    /// Size in bytes
    pub size_bytes: u64,
}

/// Manages the directory of archived snapshots
pub struct BackupArchive {
    dir: PathBuf,
}

impl BackupArchive {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Archive directory path
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path a snapshot created at `timestamp` is stored under
    pub fn path_for(&self, timestamp: DateTime<Utc>) -> PathBuf {
        self.dir.join(format!(
            "{}{}-{:03}.{}",
            PREFIX,
            timestamp.format("%Y%m%d-%H%M%S"),
            timestamp.timestamp_subsec_millis(),
            EXTENSION
        ))
    }

    /// Export `selection` into a new archive file
    pub fn create(
        &self,
        engine: &BackupEngine,
        selection: &Selection,
    ) -> EncoreResult<(PathBuf, ExportReport)> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| EncoreError::Io(format!("Failed to create backup directory: {}", e)))?;

        let path = self.reserve(Utc::now())?;
        match engine.export(selection, &FileSink::new(&path)) {
            Ok(report) => {
                tracing::info!(path = %path.display(), "snapshot archived");
                Ok((path, report))
            }
            Err(e) => {
                let _ = fs::remove_file(&path);
                Err(e.into())
            }
        }
    }

    /// Claim an unused archive path at or just after `at`
    ///
    /// The file is created empty with `create_new`, so concurrent callers never
    /// get the same name. On a clash the timestamp moves forward one millisecond.
    fn reserve(&self, at: DateTime<Utc>) -> EncoreResult<PathBuf> {
        let mut at = at;
        for _ in 0..MAX_NAME_ATTEMPTS {
            let path = self.path_for(at);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(_) => return Ok(path),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    at += Duration::milliseconds(1);
                }
                Err(e) => {
                    return Err(EncoreError::Io(format!(
                        "Failed to create backup file: {}",
                        e
                    )))
                }
            }
        }
        Err(EncoreError::Io(format!(
            "No free backup filename in {}",
            self.dir.display()
        )))
    }

    /// List archived snapshots, newest first
    pub fn list(&self) -> EncoreResult<Vec<ArchiveEntry>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.dir)
            .map_err(|e| EncoreError::Io(format!("Failed to read backup directory: {}", e)))?
        {
            let entry = entry
                .map_err(|e| EncoreError::Io(format!("Failed to read directory entry: {}", e)))?;

            let path = entry.path();
            if path.extension().map_or(false, |ext| ext == EXTENSION) {
                if let Some(info) = parse_entry(&path) {
                    entries.push(info);
                }
            }
        }

        entries.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.filename.cmp(&a.filename))
        });
        Ok(entries)
    }

    /// The most recent snapshot
    pub fn latest(&self) -> EncoreResult<Option<ArchiveEntry>> {
        Ok(self.list()?.into_iter().next())
    }

    /// A snapshot by filename
    pub fn get(&self, filename: &str) -> EncoreResult<Option<ArchiveEntry>> {
        let path = self.dir.join(filename);
        if path.exists() {
            Ok(parse_entry(&path))
        } else {
            Ok(None)
        }
    }

    /// Resolve `latest`, an archive filename (with or without extension), or a path
    pub fn resolve(&self, identifier: &str) -> EncoreResult<PathBuf> {
        if identifier.eq_ignore_ascii_case("latest") {
            return self
                .latest()?
                .map(|e| e.path)
                .ok_or_else(|| EncoreError::backup_not_found("latest"));
        }

        let path = PathBuf::from(identifier);
        if path.is_file() {
            return Ok(path);
        }

        let in_dir = self.dir.join(identifier);
        if in_dir.is_file() {
            return Ok(in_dir);
        }

        let with_ext = self.dir.join(format!("{}.{}", identifier, EXTENSION));
        if with_ext.is_file() {
            return Ok(with_ext);
        }

        Err(EncoreError::backup_not_found(identifier))
    }

    /// Delete all but the newest `keep` snapshots, returning deleted paths
    pub fn prune(&self, keep: usize) -> EncoreResult<Vec<PathBuf>> {
        let mut deleted = Vec::new();

        for entry in self.list()?.into_iter().skip(keep) {
            fs::remove_file(&entry.path)
                .map_err(|e| EncoreError::Io(format!("Failed to delete old backup: {}", e)))?;
            deleted.push(entry.path);
        }

        if !deleted.is_empty() {
            tracing::info!(deleted = deleted.len(), keep, "archive pruned");
        }
        Ok(deleted)
    }
}

fn parse_entry(path: &Path) -> Option<ArchiveEntry> {
    let filename = path.file_name()?.to_string_lossy().to_string();
    let stamp = filename
        .strip_prefix(PREFIX)?
        .strip_suffix(EXTENSION)?
        .strip_suffix('.')?;
    let created_at = parse_archive_timestamp(stamp)?;
    let size_bytes = fs::metadata(path).ok()?.len();

    Some(ArchiveEntry {
        filename,
        path: path.to_path_buf(),
        created_at,
        size_bytes,
    })
}

/// Parse `YYYYMMDD-HHMMSS` or `YYYYMMDD-HHMMSS-mmm`
fn parse_archive_timestamp(stamp: &str) -> Option<DateTime<Utc>> {
    let parts: Vec<&str> = stamp.split('-').collect();
    if parts.len() < 2 || parts.len() > 3 {
        return None;
    }

    let date_part = parts[0];
    let time_part = parts[1];
    let millis: u32 = match parts.get(2) {
        Some(ms) => ms.parse().ok()?,
        None => 0,
    };

    if date_part.len() != 8 || time_part.len() != 6 {
        return None;
    }

    let year: i32 = date_part[0..4].parse().ok()?;
    let month: u32 = date_part[4..6].parse().ok()?;
    let day: u32 = date_part[6..8].parse().ok()?;
    let hour: u32 = time_part[0..2].parse().ok()?;
    let minute: u32 = time_part[2..4].parse().ok()?;
    let second: u32 = time_part[4..6].parse().ok()?;

    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    let time = NaiveTime::from_hms_milli_opt(hour, minute, second, millis)?;

    Some(DateTime::from_naive_utc_and_offset(
        NaiveDateTime::new(date, time),
        Utc,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::adapter::{StoreAdapter, StoreSet};
    use crate::backup::section::Section;
    use crate::backup::snapshot::SectionRecords;
    use crate::config::EncorePaths;
    use crate::error::BackupError;
    use crate::storage::Storage;
    use chrono::{Datelike, TimeZone, Timelike};
    use tempfile::TempDir;

    fn create_test_archive() -> (TempDir, BackupArchive, BackupEngine) {
        let temp_dir = TempDir::new().unwrap();
        let paths = EncorePaths::with_base_dir(temp_dir.path().to_path_buf());
        let storage = Storage::new(paths.clone()).unwrap();
        let engine = BackupEngine::new(StoreSet::from_storage(&storage));
        (temp_dir, BackupArchive::new(paths.backup_dir()), engine)
    }

    /// Write a placeholder snapshot with a chosen timestamp
    fn touch(archive: &BackupArchive, at: DateTime<Utc>) -> PathBuf {
        let path = archive.path_for(at);
        fs::write(&path, r#"{"formatVersion":1}"#).unwrap();
        path
    }

    #[test]
    fn test_create_writes_snapshot() {
        let (_temp, archive, engine) = create_test_archive();

        let (path, report) = archive.create(&engine, &Selection::all()).unwrap();
        assert!(path.exists());
        assert!(path.file_name().unwrap().to_string_lossy().starts_with("encore-"));
        assert_eq!(report.sections.len(), 5);
    }

    #[test]
    fn test_same_millisecond_gets_next_name() {
        let (_temp, archive, _engine) = create_test_archive();
        fs::create_dir_all(archive.dir()).unwrap();
        let at = Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap();
        let taken = touch(&archive, at);

        let reserved = archive.reserve(at).unwrap();
        assert_eq!(reserved, archive.path_for(at + Duration::milliseconds(1)));
        assert_eq!(
            fs::read_to_string(&taken).unwrap(),
            r#"{"formatVersion":1}"#
        );
    }

    #[test]
    fn test_back_to_back_creates_keep_both() {
        let (_temp, archive, engine) = create_test_archive();

        let (first, _) = archive.create(&engine, &Selection::all()).unwrap();
        let (second, _) = archive.create(&engine, &Selection::all()).unwrap();

        assert_ne!(first, second);
        assert!(fs::metadata(&first).unwrap().len() > 0);
        assert!(fs::metadata(&second).unwrap().len() > 0);
        assert_eq!(archive.list().unwrap().len(), 2);
    }

    struct UnreadableStore;

    impl StoreAdapter for UnreadableStore {
        fn section(&self) -> Section {
            Section::Favorites
        }

        fn export(&self) -> Result<SectionRecords, BackupError> {
            Err(BackupError::store(Section::Favorites, "disk gone"))
        }

        fn replace(&self, _records: SectionRecords) -> Result<(), BackupError> {
            Ok(())
        }
    }

    #[test]
    fn test_failed_create_leaves_no_file() {
        let (_temp, archive, _engine) = create_test_archive();
        let engine = BackupEngine::new(StoreSet::new().with(UnreadableStore));

        assert!(archive.create(&engine, &Selection::all()).is_err());
        assert!(archive.list().unwrap().is_empty());
    }

    #[test]
    fn test_list_newest_first_and_ignores_strangers() {
        let (_temp, archive, _engine) = create_test_archive();
        let base = Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap();
        touch(&archive, base);
        let newest = touch(&archive, base + Duration::minutes(5));
        fs::write(archive.dir().join("notes.json"), "{}").unwrap();
        fs::write(archive.dir().join("encore-garbage.json"), "{}").unwrap();

        let entries = archive.list().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].path, newest);
        assert_eq!(archive.latest().unwrap().unwrap().path, newest);
    }

    #[test]
    fn test_prune_keeps_newest() {
        let (_temp, archive, _engine) = create_test_archive();
        let base = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        for i in 0..5 {
            touch(&archive, base + Duration::seconds(i));
        }

        let deleted = archive.prune(3).unwrap();
        assert_eq!(deleted.len(), 2);

        let remaining = archive.list().unwrap();
        assert_eq!(remaining.len(), 3);
        assert_eq!(remaining[2].created_at, base + Duration::seconds(2));
    }

    #[test]
    fn test_resolve() {
        let (_temp, archive, _engine) = create_test_archive();
        assert!(archive.resolve("latest").unwrap_err().is_not_found());

        let at = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let path = touch(&archive, at);
        let filename = path.file_name().unwrap().to_string_lossy().to_string();
        let stem = filename.trim_end_matches(".json").to_string();

        assert_eq!(archive.resolve("latest").unwrap(), path);
        assert_eq!(archive.resolve(&filename).unwrap(), path);
        assert_eq!(archive.resolve(&stem).unwrap(), path);
        assert_eq!(archive.resolve(path.to_str().unwrap()).unwrap(), path);
        assert!(archive.resolve("nope").is_err());
        assert!(archive.get(&filename).unwrap().is_some());
    }

    #[test]
    fn test_parse_archive_timestamp() {
        let ts = parse_archive_timestamp("20251127-143022").unwrap();
        assert_eq!((ts.year(), ts.month(), ts.day()), (2025, 11, 27));

        let ts = parse_archive_timestamp("20251127-143022-456").unwrap();
        assert_eq!(ts.hour(), 14);
        assert_eq!(ts.timestamp_subsec_millis(), 456);

        assert!(parse_archive_timestamp("2025-11-27").is_none());
        assert!(parse_archive_timestamp("20251327-143022").is_none());
    }

    #[test]
    fn test_empty_archive_dir() {
        let temp_dir = TempDir::new().unwrap();
        let archive = BackupArchive::new(temp_dir.path().join("missing"));
        assert!(archive.list().unwrap().is_empty());
    }
}
