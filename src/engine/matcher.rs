//! Selects the rule that owns a decoded event.

use std::sync::Arc;

use crate::{
    models::{DecodedEvent, Rule, rule::normalize_address},
    persistence::{AppRepository, PersistenceError},
};

/// Looks up the active rule for a decoded event.
pub struct RuleMatcher {
    repo: Arc<dyn AppRepository>,
}

impl RuleMatcher {
    /// Creates a matcher reading rules from `repo`.
    pub fn new(repo: Arc<dyn AppRepository>) -> Self {
        Self { repo }
    }

    /// Returns the active rule with the lowest id whose contract equals the
    /// event's contract and whose signature hashes to the log's topic-0.
    /// `None` when no rule matches.
    #[tracing::instrument(skip_all, level = "debug", fields(event = %event.name, contract = %event.source_contract))]
    pub async fn find_match(&self, event: &DecodedEvent) -> Result<Option<Rule>, PersistenceError> {
        let Some(topic0) = event.log.topic0().copied() else {
            return Ok(None);
        };

        let candidates = self.repo.get_active_rules_for_contract(&normalize_address(&event.source_contract)).await?;
        let matched = candidates.into_iter().find(|rule| rule.topic0() == topic0);

        match &matched {
            Some(rule) => tracing::debug!(rule_id = rule.id, "Event matched rule."),
            None => tracing::debug!("No active rule for event."),
        }
        Ok(matched)
    }
}
