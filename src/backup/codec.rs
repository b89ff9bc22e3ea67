//! Snapshot codec
//!
//! Snapshots are pretty-printed JSON objects:
//!
//! ```text
//! {
//!   "formatVersion": 1,
//!   "exportedAtEpochMillis": 1717171717171,
//!   "favorites": [ ... ],
//!   "searchHistory": [],
//!   ...
//! }
//! ```
//!
//! # Compatibility rules
//!
//! - Unknown top-level fields are ignored.
//! - `formatVersion` must be present and a positive integer, otherwise the
//!   snapshot is corrupt.
//! - Versions above `MAX_SUPPORTED_FORMAT_VERSION` are refused outright.
//! - A missing `exportedAtEpochMillis` reads as 0.
//! - A section key that is missing or `null` means the section was not
//!   exported. Sections that were not exported are never written, not even as
//!   `null`.
//! - A section whose entries don't match the record shape fails alone; the
//!   other sections still decode.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::BackupError;
use crate::models::{Favorite, LyricsEntry, PreferenceEntry, SearchHistoryEntry, TransitionRule};

use super::section::Section;
use super::snapshot::{SectionRecord, SectionRecords, Snapshot};

/// Version written by `encode`
pub const CURRENT_FORMAT_VERSION: u32 = 1;

/// Highest version `decode` accepts
pub const MAX_SUPPORTED_FORMAT_VERSION: u32 = 1;

const FORMAT_VERSION_FIELD: &str = "formatVersion";
const EXPORTED_AT_FIELD: &str = "exportedAtEpochMillis";

/// Result of decoding a snapshot
///
/// `rejected` holds a `SectionDecodeFailure` for every section that was
/// present but malformed; those sections are absent from `snapshot`.
#[derive(Debug)]
pub struct DecodedSnapshot {
    pub snapshot: Snapshot,
    pub rejected: BTreeMap<Section, BackupError>,
}

/// Serialize a snapshot to bytes
pub fn encode(snapshot: &Snapshot) -> Result<Vec<u8>, BackupError> {
    let mut root = Map::new();
    root.insert(
        FORMAT_VERSION_FIELD.to_string(),
        Value::from(snapshot.format_version),
    );
    root.insert(
        EXPORTED_AT_FIELD.to_string(),
        Value::from(snapshot.exported_at_epoch_millis),
    );

    for (section, records) in &snapshot.sections {
        let value = records_to_json(records).map_err(|e| BackupError::StoreFailure {
            section: *section,
            message: format!("records could not be serialized: {}", e),
        })?;
        root.insert(section.key().to_string(), value);
    }

    serde_json::to_vec_pretty(&Value::Object(root))
        .map_err(|e| BackupError::CorruptSnapshot(format!("failed to serialize snapshot: {}", e)))
}

fn records_to_json(records: &SectionRecords) -> Result<Value, serde_json::Error> {
    match records {
        SectionRecords::Preferences(r) => serde_json::to_value(r),
        SectionRecords::Favorites(r) => serde_json::to_value(r),
        SectionRecords::Lyrics(r) => serde_json::to_value(r),
        SectionRecords::SearchHistory(r) => serde_json::to_value(r),
        SectionRecords::Transitions(r) => serde_json::to_value(r),
    }
}

/// Parse bytes into a snapshot
pub fn decode(bytes: &[u8]) -> Result<DecodedSnapshot, BackupError> {
    let root: Value = serde_json::from_slice(bytes)
        .map_err(|e| BackupError::CorruptSnapshot(format!("not a JSON document: {}", e)))?;

    let Value::Object(mut root) = root else {
        return Err(BackupError::CorruptSnapshot(
            "top level is not an object".into(),
        ));
    };

    // Nothing else in the document is read before the version is accepted
    let version = read_version(&root)?;
    let decoder = decoder_for(version).ok_or(BackupError::UnsupportedFormat {
        found: version,
        supported: MAX_SUPPORTED_FORMAT_VERSION,
    })?;

    let exported_at = read_exported_at(&root)?;

    let mut decoded = DecodedSnapshot {
        snapshot: Snapshot {
            // Checked against MAX_SUPPORTED_FORMAT_VERSION by decoder_for
            format_version: version as u32,
            exported_at_epoch_millis: exported_at,
            sections: BTreeMap::new(),
        },
        rejected: BTreeMap::new(),
    };

    for section in Section::all() {
        let value = match root.remove(section.key()) {
            None | Some(Value::Null) => continue,
            Some(value) => value,
        };

        match decoder(*section, value) {
            Ok(records) => decoded.snapshot.insert(records),
            Err(message) => {
                tracing::warn!(section = %section, %message, "section rejected while decoding");
                decoded.rejected.insert(
                    *section,
                    BackupError::SectionDecodeFailure {
                        section: *section,
                        message,
                    },
                );
            }
        }
    }

    if !root.is_empty() {
        let unknown: Vec<_> = root.keys().map(String::as_str).collect();
        tracing::debug!(fields = ?unknown, "ignoring unknown snapshot fields");
    }

    Ok(decoded)
}

fn read_version(root: &Map<String, Value>) -> Result<u64, BackupError> {
    match root.get(FORMAT_VERSION_FIELD) {
        None | Some(Value::Null) => Err(BackupError::CorruptSnapshot(format!(
            "missing '{}'",
            FORMAT_VERSION_FIELD
        ))),
        Some(value) => value
            .as_u64()
            .filter(|v| *v >= 1)
            .ok_or_else(|| {
                BackupError::CorruptSnapshot(format!(
                    "'{}' must be a positive integer, found {}",
                    FORMAT_VERSION_FIELD, value
                ))
            }),
    }
}

fn read_exported_at(root: &Map<String, Value>) -> Result<i64, BackupError> {
    match root.get(EXPORTED_AT_FIELD) {
        None | Some(Value::Null) => {
            tracing::warn!("snapshot has no export timestamp, using 0");
            Ok(0)
        }
        Some(value) => value.as_i64().ok_or_else(|| {
            BackupError::CorruptSnapshot(format!(
                "'{}' must be an integer, found {}",
                EXPORTED_AT_FIELD, value
            ))
        }),
    }
}

/// Decodes one section's JSON for a given format version
type SectionDecoder = fn(Section, Value) -> Result<SectionRecords, String>;

/// Per-version decode rules
///
/// A new format version that changes a section's shape gets its own decoder
/// here; versions with an unchanged layout can share one.
fn decoder_for(version: u64) -> Option<SectionDecoder> {
    match version {
        1 => Some(decode_section_v1),
        _ => None,
    }
}

fn decode_section_v1(section: Section, value: Value) -> Result<SectionRecords, String> {
    match section {
        Section::Preferences => decode_records::<PreferenceEntry>(value),
        Section::Favorites => decode_records::<Favorite>(value),
        Section::Lyrics => decode_records::<LyricsEntry>(value),
        Section::SearchHistory => decode_records::<SearchHistoryEntry>(value),
        Section::Transitions => decode_records::<TransitionRule>(value),
    }
}

fn decode_records<R: SectionRecord>(value: Value) -> Result<SectionRecords, String> {
    let Value::Array(items) = value else {
        return Err(format!("expected an array, found {}", json_kind(&value)));
    };

    let mut records = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let record: R =
            serde_json::from_value(item).map_err(|e| format!("entry {}: {}", index, e))?;
        record
            .check()
            .map_err(|e| format!("entry {}: {}", index, e))?;
        records.push(record);
    }

    Ok(R::into_section(records))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
