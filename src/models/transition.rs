//! Audio transition rules
//!
//! A rule says how playback moves from one track to the next. Either side may
//! be left open to match any track, so `{from: None, to: Some(x)}` applies to
//! every transition into `x`.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::TransitionRuleId;
use crate::error::EncoreError;

/// Longest transition a rule may ask for
pub const MAX_TRANSITION_MS: u32 = 30_000;

/// How the outgoing and incoming tracks are joined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum TransitionMode {
    /// No gap, no overlap
    #[default]
    Gapless,
    /// Overlap with volume ramps
    Crossfade,
    /// Fade out fully, then fade in
    FadeOutIn,
    /// Hard stop and start
    Cut,
}

impl TransitionMode {
    /// Whether the mode uses `duration_ms`
    pub fn is_timed(&self) -> bool {
        matches!(self, Self::Crossfade | Self::FadeOutIn)
    }
}

impl fmt::Display for TransitionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gapless => write!(f, "gapless"),
            Self::Crossfade => write!(f, "crossfade"),
            Self::FadeOutIn => write!(f, "fade out/in"),
            Self::Cut => write!(f, "cut"),
        }
    }
}

/// A transition rule between two tracks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRule {
    pub id: TransitionRuleId,

    /// Outgoing track; `None` matches any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_media_id: Option<String>,

    /// Incoming track; `None` matches any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_media_id: Option<String>,

    pub mode: TransitionMode,

    #[serde(default)]
    pub duration_ms: u32,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    pub created_at: DateTime<Utc>,
}

fn default_enabled() -> bool {
    true
}

impl TransitionRule {
    pub fn new(
        from_media_id: Option<String>,
        to_media_id: Option<String>,
        mode: TransitionMode,
        duration_ms: u32,
    ) -> Self {
        Self {
            id: TransitionRuleId::new(),
            from_media_id,
            to_media_id,
            mode,
            duration_ms,
            enabled: true,
            created_at: Utc::now(),
        }
    }

    /// Check whether the rule applies to a transition between two tracks
    pub fn matches(&self, from: &str, to: &str) -> bool {
        self.enabled
            && self.from_media_id.as_deref().map_or(true, |id| id == from)
            && self.to_media_id.as_deref().map_or(true, |id| id == to)
    }

    /// Validate the rule
    pub fn validate(&self) -> Result<(), EncoreError> {
        if self.mode.is_timed() && self.duration_ms > MAX_TRANSITION_MS {
            return Err(EncoreError::Validation(format!(
                "Transition {} lasts {}ms, the maximum is {}ms",
                self.id, self.duration_ms, MAX_TRANSITION_MS
            )));
        }

        if let (Some(from), Some(to)) = (&self.from_media_id, &self.to_media_id) {
            if from == to {
                return Err(EncoreError::Validation(format!(
                    "Transition {} goes from '{}' to itself",
                    self.id, from
                )));
            }
        }

        Ok(())
    }
}
