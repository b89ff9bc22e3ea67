//! Store adapters
//!
//! `SectionStore` is the typed capability every store offers the backup engine:
//! read everything, or wipe and bulk-insert. `StoreAdapter` erases the record
//! type so the engine can hold one adapter per section in a single map.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{BackupError, EncoreError};
use crate::storage::{JsonTable, Storage, StoredRecord};

use super::section::Section;
use super::snapshot::{SectionRecord, SectionRecords};

/// Full-export and full-replace access to one store
pub trait SectionStore: Send + Sync {
    type Record: SectionRecord;

    /// Read the full contents in a stable order, without mutating
    fn export_all(&self) -> Result<Vec<Self::Record>, EncoreError>;

    /// Delete everything, then insert `records`
    ///
    /// Records left out of `records` must not survive the call.
    fn replace_all(&self, records: Vec<Self::Record>) -> Result<(), EncoreError>;
}

impl<R> SectionStore for JsonTable<R>
where
    R: StoredRecord + SectionRecord,
{
    type Record = R;

    fn export_all(&self) -> Result<Vec<R>, EncoreError> {
        self.get_all()
    }

    fn replace_all(&self, records: Vec<R>) -> Result<(), EncoreError> {
        JsonTable::replace_all(self, records)
    }
}

/// A section store with its record type erased
pub trait StoreAdapter: Send + Sync {
    fn section(&self) -> Section;

    fn export(&self) -> Result<SectionRecords, BackupError>;

    fn replace(&self, records: SectionRecords) -> Result<(), BackupError>;
}

/// Adapts any `SectionStore` to `StoreAdapter`
pub struct Adapter<S>(pub S);

impl<S, T> StoreAdapter for Adapter<T>
where
    S: SectionStore + ?Sized,
    T: std::ops::Deref<Target = S> + Send + Sync,
{
    fn section(&self) -> Section {
        S::Record::SECTION
    }

    fn export(&self) -> Result<SectionRecords, BackupError> {
        let records = self
            .0
            .export_all()
            .map_err(|e| BackupError::store(self.section(), e))?;
        Ok(S::Record::into_section(records))
    }

    fn replace(&self, records: SectionRecords) -> Result<(), BackupError> {
        let section = self.section();
        let records = S::Record::from_section(records).map_err(|other| {
            BackupError::store(
                section,
                format!("received records for section '{}'", other.section()),
            )
        })?;
        self.0
            .replace_all(records)
            .map_err(|e| BackupError::store(section, e))
    }
}

/// The adapters an engine works with, at most one per section
#[derive(Default, Clone)]
pub struct StoreSet {
    adapters: BTreeMap<Section, Arc<dyn StoreAdapter>>,
}

impl StoreSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wire every repository of `storage`
    pub fn from_storage(storage: &Storage) -> Self {
        Self::new()
            .with(Adapter(Arc::clone(&storage.preferences)))
            .with(Adapter(Arc::clone(&storage.favorites)))
            .with(Adapter(Arc::clone(&storage.lyrics)))
            .with(Adapter(Arc::clone(&storage.search_history)))
            .with(Adapter(Arc::clone(&storage.transitions)))
    }

    /// Register an adapter, replacing any previous one for its section
    pub fn with(mut self, adapter: impl StoreAdapter + 'static) -> Self {
        self.register(Arc::new(adapter));
        self
    }

    pub fn register(&mut self, adapter: Arc<dyn StoreAdapter>) {
        self.adapters.insert(adapter.section(), adapter);
    }

    pub fn get(&self, section: Section) -> Option<&Arc<dyn StoreAdapter>> {
        self.adapters.get(&section)
    }

    pub fn contains(&self, section: Section) -> bool {
        self.adapters.contains_key(&section)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EncorePaths;
    use crate::models::{Favorite, LyricsEntry};
    use tempfile::TempDir;

    fn create_test_storage() -> (TempDir, Storage) {
        let temp_dir = TempDir::new().unwrap();
        let paths = EncorePaths::with_base_dir(temp_dir.path().to_path_buf());
        let storage = Storage::new(paths).unwrap();
        (temp_dir, storage)
    }

    #[test]
    fn test_from_storage_covers_every_section() {
        let (_temp, storage) = create_test_storage();
        let stores = StoreSet::from_storage(&storage);
        for section in Section::all() {
            assert!(stores.contains(*section), "missing adapter for {}", section);
            assert_eq!(stores.get(*section).unwrap().section(), *section);
        }
    }

    #[test]
    fn test_export_then_replace_through_adapter() {
        let (_temp, storage) = create_test_storage();
        storage.favorites.add(Favorite::new("t1", "One")).unwrap();
        let adapter = Adapter(Arc::clone(&storage.favorites));

        let exported = adapter.export().unwrap();
        assert_eq!(exported.len(), 1);

        storage.favorites.add(Favorite::new("t2", "Two")).unwrap();
        adapter.replace(exported).unwrap();

        assert_eq!(storage.favorites.count().unwrap(), 1);
        assert!(storage.favorites.is_favorite("t1").unwrap());
    }

    #[test]
    fn test_replace_with_wrong_section_is_store_failure() {
        let (_temp, storage) = create_test_storage();
        let adapter = Adapter(Arc::clone(&storage.favorites));

        let err = adapter
            .replace(SectionRecords::Lyrics(vec![LyricsEntry::new("t1", "p", "x")]))
            .unwrap_err();
        assert!(matches!(
            err,
            BackupError::StoreFailure {
                section: Section::Favorites,
                ..
            }
        ));
    }
}
