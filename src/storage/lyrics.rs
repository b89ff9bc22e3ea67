//! Lyrics cache store
//!
//! Manages lyrics.json, keyed by media id

use std::cmp::Ordering;

use crate::error::EncoreError;
use crate::models::LyricsEntry;

use super::table::{JsonTable, StoredRecord};

impl StoredRecord for LyricsEntry {
    type Key = String;
    const ENTITY: &'static str = "Lyrics";

    fn key(&self) -> String {
        self.media_id.clone()
    }

    fn natural_cmp(&self, other: &Self) -> Ordering {
        self.media_id.cmp(&other.media_id)
    }
}

/// Repository for cached lyrics
pub type LyricsRepository = JsonTable<LyricsEntry>;

impl JsonTable<LyricsEntry> {
    /// Look up cached lyrics for a track
    pub fn lyrics_for(&self, media_id: &str) -> Result<Option<LyricsEntry>, EncoreError> {
        self.get(&media_id.to_string())
    }

    /// Cache lyrics for a track, replacing any previous entry
    pub fn cache(&self, entry: LyricsEntry) -> Result<(), EncoreError> {
        entry.validate()?;
        self.upsert(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_cache_and_lookup() {
        let temp_dir = TempDir::new().unwrap();
        let repo = LyricsRepository::new(temp_dir.path().join("lyrics.json"));

        repo.cache(LyricsEntry::new("t1", "lrclib", "first")).unwrap();
        repo.cache(LyricsEntry::new("t1", "lrclib", "second")).unwrap();

        assert_eq!(repo.lyrics_for("t1").unwrap().unwrap().content, "second");
        assert!(repo.lyrics_for("t2").unwrap().is_none());
        assert!(repo.cache(LyricsEntry::new("", "lrclib", "x")).is_err());
    }
}
