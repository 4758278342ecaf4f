//! Implementation of the AppRepository trait for SqliteStateRepository

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};

use crate::{
    models::{NewNotification, Notification, NotificationStatus, Rule, RuleConfig},
    persistence::{error::PersistenceError, sqlite::SqliteStateRepository, traits::AppRepository},
};

// Helper struct for mapping from the database row
#[derive(sqlx::FromRow)]
struct RuleRow {
    rule_id: i64,
    contract_address: String,
    event_signature: String,
    chain: String,
    filters: Option<String>,
    adapter: String,
    adapter_value: String,
    active: bool,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

impl TryFrom<RuleRow> for Rule {
    type Error = PersistenceError;

    fn try_from(row: RuleRow) -> Result<Self, Self::Error> {
        let filters = row
            .filters
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(|e| PersistenceError::Serialization(format!("filters of rule {}: {e}", row.rule_id)))?;
        let adapter = row
            .adapter
            .parse()
            .map_err(|e| PersistenceError::Serialization(format!("adapter of rule {}: {e}", row.rule_id)))?;

        Ok(Rule {
            id: row.rule_id,
            contract_address: row.contract_address,
            event_signature: row.event_signature,
            chain: row.chain,
            filters,
            adapter,
            adapter_value: row.adapter_value,
            active: row.active,
            created_at: DateTime::<Utc>::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::<Utc>::from_naive_utc_and_offset(row.updated_at, Utc),
        })
    }
}

// Helper struct for mapping from the database row
#[derive(sqlx::FromRow)]
struct NotificationRow {
    notification_id: i64,
    rule_id: i64,
    event_data: String,
    status: String,
    block: i64,
    block_timestamp: String,
    tx_hash: String,
    log_index: i64,
    error: Option<String>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = PersistenceError;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        let id = row.notification_id;
        let invalid = |field: &str, e: String| PersistenceError::Serialization(format!("{field} of notification {id}: {e}"));

        Ok(Notification {
            id,
            rule_id: row.rule_id,
            event_data: serde_json::from_str(&row.event_data).map_err(|e| invalid("event_data", e.to_string()))?,
            status: row.status.parse().map_err(|e| invalid("status", e))?,
            block: u64::try_from(row.block).map_err(|e| invalid("block", e.to_string()))?,
            block_timestamp: DateTime::parse_from_rfc3339(&row.block_timestamp)
                .map_err(|e| invalid("block_timestamp", e.to_string()))?
                .with_timezone(&Utc),
            tx_hash: row.tx_hash,
            log_index: u64::try_from(row.log_index).map_err(|e| invalid("log_index", e.to_string()))?,
            error: row.error,
            created_at: DateTime::<Utc>::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::<Utc>::from_naive_utc_and_offset(row.updated_at, Utc),
        })
    }
}

fn to_i64(value: u64, field: &str) -> Result<i64, PersistenceError> {
    i64::try_from(value).map_err(|e| {
        tracing::error!(error = %e, value, field, "Value does not fit a database integer.");
        PersistenceError::InvalidInput(format!("{field}: {e}"))
    })
}

#[async_trait]
impl AppRepository for SqliteStateRepository {
    #[tracing::instrument(skip(self), level = "debug")]
    async fn get_rules(&self) -> Result<Vec<Rule>, PersistenceError> {
        let rows = self
            .execute_query_with_error_handling(
                "query rules",
                sqlx::query_as::<_, RuleRow>(
                    "SELECT rule_id, contract_address, event_signature, chain, filters, adapter, adapter_value, \
                     active, created_at, updated_at FROM rules ORDER BY rule_id",
                )
                .fetch_all(&self.pool),
            )
            .await?;
        rows.into_iter().map(Rule::try_from).collect()
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn get_rule(&self, rule_id: i64) -> Result<Option<Rule>, PersistenceError> {
        let row = self
            .execute_query_with_error_handling(
                "query rule",
                sqlx::query_as::<_, RuleRow>(
                    "SELECT rule_id, contract_address, event_signature, chain, filters, adapter, adapter_value, \
                     active, created_at, updated_at FROM rules WHERE rule_id = ?",
                )
                .bind(rule_id)
                .fetch_optional(&self.pool),
            )
            .await?;
        row.map(Rule::try_from).transpose()
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn get_active_rules(&self) -> Result<Vec<Rule>, PersistenceError> {
        let rows = self
            .execute_query_with_error_handling(
                "query active rules",
                sqlx::query_as::<_, RuleRow>(
                    "SELECT rule_id, contract_address, event_signature, chain, filters, adapter, adapter_value, \
                     active, created_at, updated_at FROM rules WHERE active = 1 ORDER BY rule_id",
                )
                .fetch_all(&self.pool),
            )
            .await?;
        tracing::debug!(count = rows.len(), "Active rules loaded.");
        rows.into_iter().map(Rule::try_from).collect()
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn get_active_rules_for_contract(&self, contract_address: &str) -> Result<Vec<Rule>, PersistenceError> {
        let rows = self
            .execute_query_with_error_handling(
                "query active rules for contract",
                sqlx::query_as::<_, RuleRow>(
                    "SELECT rule_id, contract_address, event_signature, chain, filters, adapter, adapter_value, \
                     active, created_at, updated_at FROM rules WHERE contract_address = ? AND active = 1 \
                     ORDER BY rule_id",
                )
                .bind(contract_address.to_lowercase())
                .fetch_all(&self.pool),
            )
            .await?;
        rows.into_iter().map(Rule::try_from).collect()
    }

    #[tracing::instrument(skip(self, config), level = "debug", fields(contract = %config.contract_address))]
    async fn create_rule(&self, config: RuleConfig) -> Result<Rule, PersistenceError> {
        let filters = config
            .filters
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| PersistenceError::Serialization(e.to_string()))?;

        let row = self
            .execute_query_with_error_handling(
                "insert rule",
                sqlx::query_as::<_, RuleRow>(
                    "INSERT INTO rules (contract_address, event_signature, chain, filters, adapter, adapter_value, \
                     active) VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING rule_id, contract_address, event_signature, \
                     chain, filters, adapter, adapter_value, active, created_at, updated_at",
                )
                .bind(config.contract_address.to_lowercase())
                .bind(&config.event_signature)
                .bind(&config.chain)
                .bind(filters)
                .bind(config.adapter.as_str())
                .bind(&config.adapter_value)
                .bind(config.active)
                .fetch_one(&self.pool),
            )
            .await?;

        let rule = Rule::try_from(row)?;
        tracing::info!(rule_id = rule.id, signature = %rule.event_signature, "Rule created.");
        Ok(rule)
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn delete_rule(&self, rule_id: i64) -> Result<(), PersistenceError> {
        let result = self
            .execute_query_with_error_handling(
                "delete rule",
                sqlx::query("DELETE FROM rules WHERE rule_id = ?").bind(rule_id).execute(&self.pool),
            )
            .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::NotFound(format!("rule {rule_id}")));
        }
        tracing::info!(rule_id, "Rule deleted.");
        Ok(())
    }

    #[tracing::instrument(skip(self, notification), level = "debug", fields(rule_id = notification.rule_id, tx_hash = %notification.tx_hash))]
    async fn create_notification(&self, notification: NewNotification) -> Result<Notification, PersistenceError> {
        let block = to_i64(notification.block, "block")?;
        let log_index = to_i64(notification.log_index, "log_index")?;

        let row = self
            .execute_query_with_error_handling(
                "insert notification",
                sqlx::query_as::<_, NotificationRow>(
                    "INSERT INTO notifications (rule_id, event_data, status, block, block_timestamp, tx_hash, \
                     log_index) VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING notification_id, rule_id, event_data, status, \
                     block, block_timestamp, tx_hash, log_index, error, created_at, updated_at",
                )
                .bind(notification.rule_id)
                .bind(notification.event_data.to_string())
                .bind(NotificationStatus::Pending.as_str())
                .bind(block)
                .bind(notification.block_timestamp.to_rfc3339())
                .bind(&notification.tx_hash)
                .bind(log_index)
                .fetch_one(&self.pool),
            )
            .await?;

        Notification::try_from(row)
    }

    #[tracing::instrument(skip(self, error), level = "debug")]
    async fn update_notification_status(
        &self,
        notification_id: i64,
        status: NotificationStatus,
        error: Option<String>,
    ) -> Result<(), PersistenceError> {
        let result = self
            .execute_query_with_error_handling(
                "update notification status",
                sqlx::query(
                    "UPDATE notifications SET status = ?, error = ?, updated_at = CURRENT_TIMESTAMP \
                     WHERE notification_id = ?",
                )
                .bind(status.as_str())
                .bind(error)
                .bind(notification_id)
                .execute(&self.pool),
            )
            .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::NotFound(format!("notification {notification_id}")));
        }
        Ok(())
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn get_notification(&self, notification_id: i64) -> Result<Option<Notification>, PersistenceError> {
        let row = self
            .execute_query_with_error_handling(
                "query notification",
                sqlx::query_as::<_, NotificationRow>(
                    "SELECT notification_id, rule_id, event_data, status, block, block_timestamp, tx_hash, \
                     log_index, error, created_at, updated_at FROM notifications WHERE notification_id = ?",
                )
                .bind(notification_id)
                .fetch_optional(&self.pool),
            )
            .await?;
        row.map(Notification::try_from).transpose()
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn get_notifications_for_rule(&self, rule_id: i64) -> Result<Vec<Notification>, PersistenceError> {
        let rows = self
            .execute_query_with_error_handling(
                "query notifications for rule",
                sqlx::query_as::<_, NotificationRow>(
                    "SELECT notification_id, rule_id, event_data, status, block, block_timestamp, tx_hash, \
                     log_index, error, created_at, updated_at FROM notifications WHERE rule_id = ? \
                     ORDER BY notification_id DESC",
                )
                .bind(rule_id)
                .fetch_all(&self.pool),
            )
            .await?;
        rows.into_iter().map(Notification::try_from).collect()
    }

    #[tracing::instrument(skip(self), level = "info")]
    async fn close(&self) {
        tracing::debug!("Closing SQLite connection pool.");
        self.pool.close().await;
        tracing::info!("SQLite connection pool closed successfully.");
    }
}
