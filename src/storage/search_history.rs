//! Search history store
//!
//! Manages search_history.json. Queries are deduplicated case-insensitively;
//! searching again moves a query to the front.

use std::cmp::Ordering;

use crate::error::EncoreError;
use crate::models::SearchHistoryEntry;

use super::table::{JsonTable, StoredRecord};

impl StoredRecord for SearchHistoryEntry {
    type Key = String;
    const ENTITY: &'static str = "Search";

    fn key(&self) -> String {
        self.normalized_query()
    }

    fn natural_cmp(&self, other: &Self) -> Ordering {
        self.searched_at
            .cmp(&other.searched_at)
            .then_with(|| self.query.cmp(&other.query))
    }
}

/// Repository for search history
pub type SearchHistoryRepository = JsonTable<SearchHistoryEntry>;

impl JsonTable<SearchHistoryEntry> {
    /// Record that a query was searched now
    pub fn record(&self, query: &str) -> Result<(), EncoreError> {
        let entry = SearchHistoryEntry::new(query);
        entry.validate()?;
        self.upsert(entry)
    }

    /// Most recent queries, newest first
    pub fn recent(&self, limit: usize) -> Result<Vec<SearchHistoryEntry>, EncoreError> {
        let mut entries = self.get_all()?;
        entries.reverse();
        entries.truncate(limit);
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use tempfile::TempDir;

    #[test]
    fn test_record_deduplicates() {
        let temp_dir = TempDir::new().unwrap();
        let repo = SearchHistoryRepository::new(temp_dir.path().join("search_history.json"));

        repo.record("Bonobo").unwrap();
        repo.record("bonobo ").unwrap();
        assert_eq!(repo.count().unwrap(), 1);
        assert!(repo.record("  ").is_err());
    }

    #[test]
    fn test_recent_newest_first() {
        let temp_dir = TempDir::new().unwrap();
        let repo = SearchHistoryRepository::new(temp_dir.path().join("search_history.json"));
        let now = Utc::now();

        for (i, query) in ["one", "two", "three"].iter().enumerate() {
            let mut entry = SearchHistoryEntry::new(*query);
            entry.searched_at = now + Duration::seconds(i as i64);
            repo.upsert(entry).unwrap();
        }

        let recent: Vec<_> = repo.recent(2).unwrap().into_iter().map(|e| e.query).collect();
        assert_eq!(recent, vec!["three", "two"]);
    }
}
