//! Lyrics cache model
//!
//! Cached lyrics keyed by media id. Synced lyrics carry LRC timestamps in
//! `content`; plain lyrics are free text.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EncoreError;

/// A cached lyrics document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LyricsEntry {
    /// Library media identifier
    pub media_id: String,

    /// Where the lyrics came from (e.g. "lrclib", "embedded")
    pub provider: String,

    pub content: String,

    /// Whether `content` is time-synced (LRC)
    #[serde(default)]
    pub synced: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    pub fetched_at: DateTime<Utc>,
}

impl LyricsEntry {
    pub fn new(
        media_id: impl Into<String>,
        provider: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let content = content.into();
        Self {
            media_id: media_id.into(),
            provider: provider.into(),
            synced: looks_synced(&content),
            content,
            language: None,
            fetched_at: Utc::now(),
        }
    }

    /// Validate the entry
    pub fn validate(&self) -> Result<(), EncoreError> {
        if self.media_id.trim().is_empty() {
            return Err(EncoreError::Validation(
                "Lyrics media id cannot be empty".into(),
            ));
        }
        if self.provider.trim().is_empty() {
            return Err(EncoreError::Validation(format!(
                "Lyrics for '{}' have no provider",
                self.media_id
            )));
        }
        Ok(())
    }
}

/// LRC lines start with a `[mm:ss.xx]` tag
fn looks_synced(content: &str) -> bool {
    content
        .lines()
        .find(|l| !l.trim().is_empty())
        .map(|l| {
            let l = l.trim_start();
            l.starts_with('[') && l.as_bytes().get(1).map_or(false, u8::is_ascii_digit)
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synced_detection() {
        let synced = LyricsEntry::new("t1", "lrclib", "[00:12.00] Hello\n[00:15.30] World");
        assert!(synced.synced);

        let plain = LyricsEntry::new("t2", "embedded", "Hello\nWorld");
        assert!(!plain.synced);

        let tagged = LyricsEntry::new("t3", "embedded", "[ar: Someone]\nHello");
        assert!(!tagged.synced);
    }

    #[test]
    fn test_synced_defaults_to_false() {
        let entry: LyricsEntry = serde_json::from_str(
            r#"{"mediaId":"t1","provider":"lrclib","content":"x","fetchedAt":"2024-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert!(!entry.synced);
        assert!(entry.language.is_none());
    }

    #[test]
    fn test_validate_requires_provider() {
        let entry = LyricsEntry::new("t1", "", "x");
        assert!(entry.validate().is_err());
    }
}
