//! Preference store
//!
//! Typed key/value preferences, persisted to preferences.json

use std::cmp::Ordering;

use crate::error::EncoreError;
use crate::models::{PreferenceEntry, PreferenceValue};

use super::table::{JsonTable, StoredRecord};

impl StoredRecord for PreferenceEntry {
    type Key = String;
    const ENTITY: &'static str = "Preference";

    fn key(&self) -> String {
        self.key.clone()
    }

    fn natural_cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

/// Repository for preference persistence
pub type PreferenceRepository = JsonTable<PreferenceEntry>;

impl JsonTable<PreferenceEntry> {
    /// Read a preference value
    pub fn value(&self, key: &str) -> Result<Option<PreferenceValue>, EncoreError> {
        Ok(self.get(&key.to_string())?.map(|entry| entry.value))
    }

    /// Set a preference value
    pub fn set(&self, key: impl Into<String>, value: PreferenceValue) -> Result<(), EncoreError> {
        let entry = PreferenceEntry::new(key, value);
        entry.validate()?;
        self.upsert(entry)
    }
}
