//! Snapshot model
//!
//! A `Snapshot` is the in-memory aggregate of one backup artifact. It is built
//! fresh for every export and materialised once per restore; nothing keeps it
//! around afterwards.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::EncoreError;
use crate::models::{Favorite, LyricsEntry, PreferenceEntry, SearchHistoryEntry, TransitionRule};

use super::section::Section;

/// The records of one section
#[derive(Debug, Clone, PartialEq)]
pub enum SectionRecords {
    Preferences(Vec<PreferenceEntry>),
    Favorites(Vec<Favorite>),
    Lyrics(Vec<LyricsEntry>),
    SearchHistory(Vec<SearchHistoryEntry>),
    Transitions(Vec<TransitionRule>),
}

impl SectionRecords {
    /// An empty record set for `section`
    pub fn empty(section: Section) -> Self {
        match section {
            Section::Preferences => Self::Preferences(Vec::new()),
            Section::Favorites => Self::Favorites(Vec::new()),
            Section::Lyrics => Self::Lyrics(Vec::new()),
            Section::SearchHistory => Self::SearchHistory(Vec::new()),
            Section::Transitions => Self::Transitions(Vec::new()),
        }
    }

    /// The section these records belong to
    pub fn section(&self) -> Section {
        match self {
            Self::Preferences(_) => Section::Preferences,
            Self::Favorites(_) => Section::Favorites,
            Self::Lyrics(_) => Section::Lyrics,
            Self::SearchHistory(_) => Section::SearchHistory,
            Self::Transitions(_) => Section::Transitions,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Preferences(r) => r.len(),
            Self::Favorites(r) => r.len(),
            Self::Lyrics(r) => r.len(),
            Self::SearchHistory(r) => r.len(),
            Self::Transitions(r) => r.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A record type that belongs to exactly one section
pub trait SectionRecord: Serialize + DeserializeOwned + Sized {
    const SECTION: Section;

    fn into_section(records: Vec<Self>) -> SectionRecords;

    /// Take the records back out; `Err` hands back records of another section
    fn from_section(records: SectionRecords) -> Result<Vec<Self>, SectionRecords>;

    /// Semantic checks applied when decoding
    fn check(&self) -> Result<(), EncoreError>;
}

macro_rules! section_record {
    ($record:ty, $variant:ident) => {
        impl SectionRecord for $record {
            const SECTION: Section = Section::$variant;

            fn into_section(records: Vec<Self>) -> SectionRecords {
                SectionRecords::$variant(records)
            }

            fn from_section(records: SectionRecords) -> Result<Vec<Self>, SectionRecords> {
                match records {
                    SectionRecords::$variant(records) => Ok(records),
                    other => Err(other),
                }
            }

            fn check(&self) -> Result<(), EncoreError> {
                self.validate()
            }
        }
    };
}

section_record!(PreferenceEntry, Preferences);
section_record!(Favorite, Favorites);
section_record!(LyricsEntry, Lyrics);
section_record!(SearchHistoryEntry, SearchHistory);
section_record!(TransitionRule, Transitions);

/// The root transfer object
///
/// A section missing from `sections` was not exported; a section mapped to an
/// empty record set was exported empty. Restore treats the two differently.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub format_version: u32,
    pub exported_at_epoch_millis: i64,
    pub sections: BTreeMap<Section, SectionRecords>,
}

impl Snapshot {
    /// An empty snapshot stamped with `format_version` and `exported_at`
    pub fn new(format_version: u32, exported_at: DateTime<Utc>) -> Self {
        Self {
            format_version,
            exported_at_epoch_millis: exported_at.timestamp_millis(),
            sections: BTreeMap::new(),
        }
    }

    /// Add a section's records
    pub fn insert(&mut self, records: SectionRecords) {
        self.sections.insert(records.section(), records);
    }

    /// Records for a section, `None` when the section was not exported
    pub fn get(&self, section: Section) -> Option<&SectionRecords> {
        self.sections.get(&section)
    }

    pub fn contains(&self, section: Section) -> bool {
        self.sections.contains_key(&section)
    }

    /// Take a section's records out of the snapshot
    pub fn take(&mut self, section: Section) -> Option<SectionRecords> {
        self.sections.remove(&section)
    }

    /// Sections present, in catalog order
    pub fn present_sections(&self) -> Vec<Section> {
        self.sections.keys().copied().collect()
    }

    /// Export time as a timestamp, if representable
    pub fn exported_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.exported_at_epoch_millis).single()
    }
}
