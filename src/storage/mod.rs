//! Storage layer for Encore
//!
//! Each backup section lives in its own JSON file under the data directory.
//! Writes go to a staging file that is renamed over the table and every store keeps an in-memory
//! index behind an `RwLock`.

pub mod favorites;
pub mod lyrics;
pub mod preferences;
pub mod search_history;
pub mod table;
pub mod table_file;
pub mod transitions;

pub use favorites::FavoriteRepository;
pub use lyrics::LyricsRepository;
pub use preferences::PreferenceRepository;
pub use search_history::SearchHistoryRepository;
pub use table::{JsonTable, StoredRecord};
pub use table_file::{read_table_file, write_table_file};
pub use transitions::TransitionRepository;

use std::sync::Arc;

use crate::config::paths::EncorePaths;
use crate::error::EncoreError;

/// Main storage coordinator that provides access to all stores
///
/// Repositories are reference-counted so backup adapters can share them with
/// the rest of the application.
pub struct Storage {
    paths: EncorePaths,
    pub preferences: Arc<PreferenceRepository>,
    pub favorites: Arc<FavoriteRepository>,
    pub lyrics: Arc<LyricsRepository>,
    pub search_history: Arc<SearchHistoryRepository>,
    pub transitions: Arc<TransitionRepository>,
}

impl Storage {
    /// Create a new Storage instance
    pub fn new(paths: EncorePaths) -> Result<Self, EncoreError> {
        paths.ensure_directories()?;

        Ok(Self {
            preferences: Arc::new(PreferenceRepository::new(paths.preferences_file())),
            favorites: Arc::new(FavoriteRepository::new(paths.favorites_file())),
            lyrics: Arc::new(LyricsRepository::new(paths.lyrics_file())),
            search_history: Arc::new(SearchHistoryRepository::new(paths.search_history_file())),
            transitions: Arc::new(TransitionRepository::new(paths.transitions_file())),
            paths,
        })
    }

    /// Get the paths configuration
    pub fn paths(&self) -> &EncorePaths {
        &self.paths
    }

    /// Load all data from disk
    pub fn load_all(&self) -> Result<(), EncoreError> {
        self.preferences.load()?;
        self.favorites.load()?;
        self.lyrics.load()?;
        self.search_history.load()?;
        self.transitions.load()?;
        Ok(())
    }

    /// Save all data to disk
    pub fn save_all(&self) -> Result<(), EncoreError> {
        self.preferences.save()?;
        self.favorites.save()?;
        self.lyrics.save()?;
        self.search_history.save()?;
        self.transitions.save()?;
        Ok(())
    }
}
