//! Favorites store
//!
//! Manages favorites.json, keyed by media id

use std::cmp::Ordering;

use crate::error::EncoreError;
use crate::models::Favorite;

use super::table::{JsonTable, StoredRecord};

impl StoredRecord for Favorite {
    type Key = String;
    const ENTITY: &'static str = "Favorite";

    fn key(&self) -> String {
        self.media_id.clone()
    }

    fn natural_cmp(&self, other: &Self) -> Ordering {
        self.added_at
            .cmp(&other.added_at)
            .then_with(|| self.media_id.cmp(&other.media_id))
    }
}

/// Repository for favorite persistence
pub type FavoriteRepository = JsonTable<Favorite>;

impl JsonTable<Favorite> {
    /// Check whether a track is favorited
    pub fn is_favorite(&self, media_id: &str) -> Result<bool, EncoreError> {
        Ok(self.get(&media_id.to_string())?.is_some())
    }

    /// Favorite a track, keeping the original date if it already was one
    pub fn add(&self, favorite: Favorite) -> Result<(), EncoreError> {
        favorite.validate()?;
        match self.get(&favorite.media_id)? {
            Some(existing) => self.upsert(Favorite {
                added_at: existing.added_at,
                ..favorite
            }),
            None => self.upsert(favorite),
        }
    }
}
