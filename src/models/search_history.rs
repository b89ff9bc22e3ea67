//! Search history model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EncoreError;

/// A past search query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHistoryEntry {
    pub query: String,
    pub searched_at: DateTime<Utc>,
}

impl SearchHistoryEntry {
    /// Record a query searched now; surrounding whitespace is dropped
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into().trim().to_string(),
            searched_at: Utc::now(),
        }
    }

    /// The key the store deduplicates on
    pub fn normalized_query(&self) -> String {
        self.query.trim().to_lowercase()
    }

    /// Validate the entry
    pub fn validate(&self) -> Result<(), EncoreError> {
        if self.query.trim().is_empty() {
            return Err(EncoreError::Validation(
                "Search query cannot be blank".into(),
            ));
        }
        Ok(())
    }
}
