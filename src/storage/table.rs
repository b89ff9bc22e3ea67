//! Keyed JSON tables
//!
//! Every Encore store is a JSON file holding a list of records, indexed in
//! memory by each record's key. `JsonTable` provides the shared load/save and
//! CRUD operations; the per-store modules add their own queries on top.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::EncoreError;

use super::table_file::{read_table_file, write_table_file};

/// A record that can live in a `JsonTable`
pub trait StoredRecord: Clone + Serialize + DeserializeOwned + Send + Sync {
    /// Unique key within the table
    type Key: Ord + Clone + fmt::Debug + Send + Sync;

    /// Name used in log and error messages
    const ENTITY: &'static str;

    fn key(&self) -> Self::Key;

    /// Order in which records are listed and exported
    fn natural_cmp(&self, other: &Self) -> Ordering;
}

/// On-disk layout of a table file
#[derive(Debug, Serialize, Deserialize)]
#[serde(bound = "R: Serialize + DeserializeOwned")]
struct TableData<R> {
    #[serde(default)]
    records: Vec<R>,
}

impl<R> Default for TableData<R> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
        }
    }
}

/// A JSON-file backed table of records
pub struct JsonTable<R: StoredRecord> {
    path: PathBuf,
    data: RwLock<BTreeMap<R::Key, R>>,
}

impl<R: StoredRecord> JsonTable<R> {
    /// Create a new, empty table backed by `path`
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            data: RwLock::new(BTreeMap::new()),
        }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<R::Key, R>>, EncoreError> {
        self.data
            .read()
            .map_err(|e| EncoreError::Storage(format!("Failed to acquire read lock: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<R::Key, R>>, EncoreError> {
        self.data
            .write()
            .map_err(|e| EncoreError::Storage(format!("Failed to acquire write lock: {}", e)))
    }

    /// Load records from disk, replacing the in-memory contents
    pub fn load(&self) -> Result<(), EncoreError> {
        let file_data: TableData<R> = read_table_file(&self.path)?;

        let mut data = self.write()?;
        data.clear();
        for record in file_data.records {
            data.insert(record.key(), record);
        }

        Ok(())
    }

    /// Save records to disk
    pub fn save(&self) -> Result<(), EncoreError> {
        let data = self.read()?;
        write_table_file(&self.path, &TableData { records: sorted(&*data) })
    }

    /// Get a record by key
    pub fn get(&self, key: &R::Key) -> Result<Option<R>, EncoreError> {
        Ok(self.read()?.get(key).cloned())
    }

    /// Get all records in natural order
    pub fn get_all(&self) -> Result<Vec<R>, EncoreError> {
        Ok(sorted(&*self.read()?))
    }

    /// Insert or update a record
    pub fn upsert(&self, record: R) -> Result<(), EncoreError> {
        self.write()?.insert(record.key(), record);
        Ok(())
    }

    /// Delete a record, returning whether it existed
    pub fn delete(&self, key: &R::Key) -> Result<bool, EncoreError> {
        Ok(self.write()?.remove(key).is_some())
    }

    /// Count records
    pub fn count(&self) -> Result<usize, EncoreError> {
        Ok(self.read()?.len())
    }

    /// Remove every record from memory
    pub fn clear(&self) -> Result<(), EncoreError> {
        self.write()?.clear();
        Ok(())
    }

    /// Wipe the table and insert `records`, persisting before the swap
    ///
    /// The write lock is held for the whole call. The new contents are written
    /// to disk first; if that fails, both the file and the in-memory index keep
    /// their previous contents. Later duplicates of a key win.
    pub fn replace_all(&self, records: Vec<R>) -> Result<(), EncoreError> {
        let mut data = self.write()?;

        let mut replacement = BTreeMap::new();
        for record in records {
            replacement.insert(record.key(), record);
        }

        write_table_file(
            &self.path,
            &TableData {
                records: sorted(&replacement),
            },
        )?;

        *data = replacement;
        Ok(())
    }
}

fn sorted<R: StoredRecord>(data: &BTreeMap<R::Key, R>) -> Vec<R> {
    let mut records: Vec<R> = data.values().cloned().collect();
    records.sort_by(|a, b| a.natural_cmp(b));
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        id: u32,
        rank: i32,
    }

    impl StoredRecord for Note {
        type Key = u32;
        const ENTITY: &'static str = "Note";

        fn key(&self) -> u32 {
            self.id
        }

        fn natural_cmp(&self, other: &Self) -> Ordering {
            self.rank.cmp(&other.rank).then(self.id.cmp(&other.id))
        }
    }

    fn note(id: u32, rank: i32) -> Note {
        Note { id, rank }
    }

    fn create_test_table() -> (TempDir, JsonTable<Note>) {
        let temp_dir = TempDir::new().unwrap();
        let table = JsonTable::new(temp_dir.path().join("notes.json"));
        (temp_dir, table)
    }

    #[test]
    fn test_empty_load() {
        let (_temp_dir, table) = create_test_table();
        table.load().unwrap();
        assert_eq!(table.count().unwrap(), 0);
    }

    #[test]
    fn test_get_all_uses_natural_order() {
        let (_temp_dir, table) = create_test_table();
        table.upsert(note(1, 30)).unwrap();
        table.upsert(note(2, 10)).unwrap();
        table.upsert(note(3, 20)).unwrap();

        let ids: Vec<_> = table.get_all().unwrap().iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn test_save_and_reload() {
        let (temp_dir, table) = create_test_table();
        table.upsert(note(7, 1)).unwrap();
        table.save().unwrap();

        let reloaded: JsonTable<Note> = JsonTable::new(temp_dir.path().join("notes.json"));
        reloaded.load().unwrap();
        assert_eq!(reloaded.get(&7).unwrap(), Some(note(7, 1)));
    }

    #[test]
    fn test_replace_all_drops_omitted_records() {
        let (_temp_dir, table) = create_test_table();
        table.upsert(note(1, 1)).unwrap();
        table.upsert(note(2, 2)).unwrap();

        table.replace_all(vec![note(3, 3)]).unwrap();

        assert_eq!(table.get_all().unwrap(), vec![note(3, 3)]);
        assert!(table.path().exists());
    }

    #[test]
    fn test_replace_all_with_nothing_empties_table() {
        let (temp_dir, table) = create_test_table();
        table.upsert(note(1, 1)).unwrap();
        table.replace_all(Vec::new()).unwrap();
        assert_eq!(table.count().unwrap(), 0);

        let reloaded: JsonTable<Note> = JsonTable::new(temp_dir.path().join("notes.json"));
        reloaded.load().unwrap();
        assert_eq!(reloaded.count().unwrap(), 0);
    }

    #[test]
    fn test_replace_all_last_duplicate_wins() {
        let (_temp_dir, table) = create_test_table();
        table.replace_all(vec![note(1, 1), note(1, 9)]).unwrap();
        assert_eq!(table.get(&1).unwrap(), Some(note(1, 9)));
    }

    #[test]
    fn test_failed_replace_keeps_previous_contents() {
        let temp_dir = TempDir::new().unwrap();
        // A directory where the file should be makes the final rename fail
        let path = temp_dir.path().join("notes.json");
        fs::create_dir_all(path.join("occupied")).unwrap();

        let table: JsonTable<Note> = JsonTable::new(path);
        table.upsert(note(1, 1)).unwrap();

        let result = table.replace_all(vec![note(2, 2)]);
        assert!(matches!(result, Err(EncoreError::Storage(_))));
        assert_eq!(table.get_all().unwrap(), vec![note(1, 1)]);
    }

    #[test]
    fn test_delete() {
        let (_temp_dir, table) = create_test_table();
        table.upsert(note(1, 1)).unwrap();
        assert!(table.delete(&1).unwrap());
        assert!(!table.delete(&1).unwrap());
        assert_eq!(table.count().unwrap(), 0);
    }
}
