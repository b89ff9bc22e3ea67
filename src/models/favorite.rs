//! Favorite model
//!
//! A track the user starred. `media_id` is the player library's identifier and
//! is unique within the favorites store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EncoreError;

/// A favorited track
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Favorite {
    /// Library media identifier
    pub media_id: String,

    /// Track title at the time it was favorited
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artwork_uri: Option<String>,

    /// When the track was favorited
    pub added_at: DateTime<Utc>,
}

impl Favorite {
    /// Create a new favorite added now
    pub fn new(media_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            media_id: media_id.into(),
            title: title.into(),
            artist: None,
            album: None,
            artwork_uri: None,
            added_at: Utc::now(),
        }
    }

    /// Set the artist
    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = Some(artist.into());
        self
    }

    /// Validate the favorite
    pub fn validate(&self) -> Result<(), EncoreError> {
        if self.media_id.trim().is_empty() {
            return Err(EncoreError::Validation(
                "Favorite media id cannot be empty".into(),
            ));
        }
        Ok(())
    }
}
