//! Record models for Encore
//!
//! One record type per backup section. Each defines its own JSON shape and a
//! `validate()` that the snapshot codec applies to restored entries.

pub mod favorite;
pub mod ids;
pub mod lyrics;
pub mod preference;
pub mod search_history;
pub mod transition;

pub use favorite::Favorite;
pub use ids::TransitionRuleId;
pub use lyrics::LyricsEntry;
pub use preference::{PreferenceEntry, PreferenceType, PreferenceValue};
pub use search_history::SearchHistoryEntry;
pub use transition::{TransitionMode, TransitionRule, MAX_TRANSITION_MS};
