//! The storage interface used by the HTTP API and the event pipeline.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::{
    models::{NewNotification, Notification, NotificationStatus, Rule, RuleConfig},
    persistence::error::PersistenceError,
};

/// Rule and notification storage.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AppRepository: Send + Sync {
    /// All rules, ordered by id.
    async fn get_rules(&self) -> Result<Vec<Rule>, PersistenceError>;

    /// A single rule, `None` when unknown.
    async fn get_rule(&self, rule_id: i64) -> Result<Option<Rule>, PersistenceError>;

    /// All active rules, ordered by id.
    async fn get_active_rules(&self) -> Result<Vec<Rule>, PersistenceError>;

    /// Active rules for a lower-case contract address, ordered by id.
    async fn get_active_rules_for_contract(&self, contract_address: &str) -> Result<Vec<Rule>, PersistenceError>;

    /// Persists a validated rule and returns it with its id.
    async fn create_rule(&self, config: RuleConfig) -> Result<Rule, PersistenceError>;

    /// Deletes a rule and its notifications. `NotFound` when unknown.
    async fn delete_rule(&self, rule_id: i64) -> Result<(), PersistenceError>;

    /// Inserts a pending notification. `AlreadyExists` when one exists for
    /// the same rule, transaction and log index.
    async fn create_notification(&self, notification: NewNotification) -> Result<Notification, PersistenceError>;

    /// Moves a notification to `status`, recording `error` for failures.
    async fn update_notification_status(
        &self,
        notification_id: i64,
        status: NotificationStatus,
        error: Option<String>,
    ) -> Result<(), PersistenceError>;

    /// A single notification, `None` when unknown.
    async fn get_notification(&self, notification_id: i64) -> Result<Option<Notification>, PersistenceError>;

    /// Notifications of a rule, newest first.
    async fn get_notifications_for_rule(&self, rule_id: i64) -> Result<Vec<Notification>, PersistenceError>;

    /// Releases the underlying resources before shutdown.
    async fn close(&self);
}
