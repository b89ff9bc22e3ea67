//! Transition rule store
//!
//! Manages transitions.json, keyed by rule id

use std::cmp::Ordering;

use crate::error::EncoreError;
use crate::models::{TransitionRule, TransitionRuleId};

use super::table::{JsonTable, StoredRecord};

impl StoredRecord for TransitionRule {
    type Key = TransitionRuleId;
    const ENTITY: &'static str = "Transition rule";

    fn key(&self) -> TransitionRuleId {
        self.id
    }

    fn natural_cmp(&self, other: &Self) -> Ordering {
        self.created_at
            .cmp(&other.created_at)
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Repository for transition rules
pub type TransitionRepository = JsonTable<TransitionRule>;

impl JsonTable<TransitionRule> {
    /// Add a rule after validating it
    pub fn add_rule(&self, rule: TransitionRule) -> Result<(), EncoreError> {
        rule.validate()?;
        self.upsert(rule)
    }

    /// Find the rule for a transition, preferring the most specific one
    ///
    /// An exact pair beats a rule with one open side, which beats a catch-all.
    /// Among equally specific rules the newest wins.
    pub fn rule_for(&self, from: &str, to: &str) -> Result<Option<TransitionRule>, EncoreError> {
        let specificity = |r: &TransitionRule| {
            usize::from(r.from_media_id.is_some()) + usize::from(r.to_media_id.is_some())
        };

        Ok(self
            .get_all()?
            .into_iter()
            .filter(|r| r.matches(from, to))
            .max_by(|a, b| {
                specificity(a)
                    .cmp(&specificity(b))
                    .then_with(|| a.natural_cmp(b))
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TransitionMode;
    use tempfile::TempDir;

    #[test]
    fn test_most_specific_rule_wins() {
        let temp_dir = TempDir::new().unwrap();
        let repo = TransitionRepository::new(temp_dir.path().join("transitions.json"));

        repo.add_rule(TransitionRule::new(None, None, TransitionMode::Crossfade, 3000))
            .unwrap();
        repo.add_rule(TransitionRule::new(
            Some("a".into()),
            Some("b".into()),
            TransitionMode::Gapless,
            0,
        ))
        .unwrap();

        let rule = repo.rule_for("a", "b").unwrap().unwrap();
        assert_eq!(rule.mode, TransitionMode::Gapless);

        let fallback = repo.rule_for("c", "d").unwrap().unwrap();
        assert_eq!(fallback.mode, TransitionMode::Crossfade);
    }

    #[test]
    fn test_add_rule_validates() {
        let temp_dir = TempDir::new().unwrap();
        let repo = TransitionRepository::new(temp_dir.path().join("transitions.json"));
        let rule = TransitionRule::new(None, None, TransitionMode::Crossfade, 60_000);
        assert!(repo.add_rule(rule).is_err());
        assert_eq!(repo.count().unwrap(), 0);
    }
}
