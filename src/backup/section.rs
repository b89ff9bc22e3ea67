//! Section registry
//!
//! The set of backup-able sections is closed and compiled in. Adding a store
//! to backups means adding a variant here, a record type, and an adapter; the
//! snapshot codec's field set follows this enum.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EncoreError;

/// A backup-able section of Encore's data
///
/// Variants are declared in catalog order, which is also their `Ord` order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Section {
    Preferences,
    Favorites,
    Lyrics,
    SearchHistory,
    Transitions,
}

const CATALOG: [Section; 5] = [
    Section::Preferences,
    Section::Favorites,
    Section::Lyrics,
    Section::SearchHistory,
    Section::Transitions,
];

impl Section {
    /// Every section, in catalog order
    pub fn all() -> &'static [Section] {
        &CATALOG
    }

    /// Stable identity key, also the snapshot field name
    pub fn key(&self) -> &'static str {
        match self {
            Self::Preferences => "preferences",
            Self::Favorites => "favorites",
            Self::Lyrics => "lyrics",
            Self::SearchHistory => "searchHistory",
            Self::Transitions => "transitions",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Preferences => "Preferences",
            Self::Favorites => "Favorites",
            Self::Lyrics => "Lyrics cache",
            Self::SearchHistory => "Search history",
            Self::Transitions => "Transition rules",
        }
    }

    /// Look up a section by key
    ///
    /// Accepts the exact key, and case-insensitively the key or its
    /// kebab/snake spelling (`search-history`, `search_history`).
    pub fn from_key(key: &str) -> Option<Section> {
        if let Some(section) = CATALOG.iter().find(|s| s.key() == key) {
            return Some(*section);
        }

        let folded: String = key
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .flat_map(char::to_lowercase)
            .collect();
        CATALOG
            .iter()
            .find(|s| s.key().to_lowercase() == folded)
            .copied()
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl FromStr for Section {
    type Err = EncoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Section::from_key(s).ok_or_else(|| EncoreError::NotFound {
            entity_type: "Section",
            identifier: s.to_string(),
        })
    }
}

/// A set of sections to export or restore
///
/// Iteration is always in catalog order, whatever order sections were added.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection(BTreeSet<Section>);

impl Selection {
    /// Every section (the default selection)
    pub fn all() -> Self {
        Self(CATALOG.iter().copied().collect())
    }

    /// No sections
    pub fn none() -> Self {
        Self(BTreeSet::new())
    }

    /// Build a selection from keys, ignoring keys no section answers to
    pub fn from_keys<'a, I>(keys: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut selection = Self::none();
        for key in keys {
            match Section::from_key(key) {
                Some(section) => selection.insert(section),
                None => tracing::debug!(key, "ignoring unknown section key"),
            }
        }
        selection
    }

    pub fn insert(&mut self, section: Section) {
        self.0.insert(section);
    }

    pub fn contains(&self, section: Section) -> bool {
        self.0.contains(&section)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Sections in catalog order
    pub fn iter(&self) -> impl Iterator<Item = Section> + '_ {
        self.0.iter().copied()
    }

    /// Sections in catalog order, collected
    pub fn sections(&self) -> Vec<Section> {
        self.iter().collect()
    }

    /// Keep only sections for which `known` holds
    pub fn intersect(&self, known: impl Fn(Section) -> bool) -> Selection {
        Self(self.0.iter().copied().filter(|s| known(*s)).collect())
    }

    /// Keys, comma separated, for messages and logs
    pub fn keys(&self) -> String {
        self.iter().map(|s| s.key()).collect::<Vec<_>>().join(",")
    }
}

impl FromIterator<Section> for Selection {
    fn from_iter<T: IntoIterator<Item = Section>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// The full, ordered catalog of sections
pub fn all_sections() -> Selection {
    Selection::all()
}

/// The selection used when a caller names none: everything
pub fn default_selection() -> Selection {
    Selection::all()
}
