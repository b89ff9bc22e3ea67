//! On-disk form of a store table
//!
//! A table file is one JSON document per store. A missing file is an empty
//! table. Writes go through a staging file next to the target and are renamed
//! into place, so a restore that fails halfway through a section leaves the
//! previous table file readable.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};

use crate::error::EncoreError;

fn storage_error(action: &str, path: &Path, err: impl std::fmt::Display) -> EncoreError {
    EncoreError::Storage(format!("Failed to {} {}: {}", action, path.display(), err))
}

/// Sibling path the next version of `path` is written to
fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".staging");
    path.with_file_name(name)
}

/// Load a table file, or the empty table when it has never been written
pub fn read_table_file<T>(path: &Path) -> Result<T, EncoreError>
where
    T: DeserializeOwned + Default,
{
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(T::default()),
        Err(e) => return Err(storage_error("open", path, e)),
    };

    serde_json::from_reader(BufReader::new(file)).map_err(|e| storage_error("parse", path, e))
}

/// Replace a table file with `table`
///
/// Either the whole new document lands or the old file stays as it was.
pub fn write_table_file<T>(path: &Path, table: &T) -> Result<(), EncoreError>
where
    T: Serialize,
{
    if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|e| storage_error("create directory", dir, e))?;
    }

    let staging = staging_path(path);
    let result = write_staged(&staging, table)
        .and_then(|()| fs::rename(&staging, path).map_err(|e| storage_error("replace", path, e)));
    if result.is_err() {
        let _ = fs::remove_file(&staging);
    }
    result
}

fn write_staged<T: Serialize>(staging: &Path, table: &T) -> Result<(), EncoreError> {
    let file = File::create(staging).map_err(|e| storage_error("create", staging, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, table)
        .map_err(|e| storage_error("serialize into", staging, e))?;
    writer
        .flush()
        .map_err(|e| storage_error("flush", staging, e))?;
    writer
        .get_ref()
        .sync_all()
        .map_err(|e| storage_error("sync", staging, e))
}
