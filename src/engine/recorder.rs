//! Persists the lifecycle of a notification: pending, then sent or failed.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{
    models::{DecodedEvent, NewNotification, Notification, NotificationStatus, Rule},
    persistence::{AppRepository, PersistenceError},
    providers::{ChainClient, ChainClientError},
};

/// Errors raised while recording a pending notification.
#[derive(Error, Debug)]
pub enum RecorderError {
    /// The log lacks a field needed to identify the notification.
    #[error("Log has no {0}")]
    IncompleteLog(&'static str),

    /// The block timestamp could not be fetched.
    #[error("Failed to fetch block timestamp: {0}")]
    Chain(#[from] ChainClientError),

    /// The node reported a timestamp outside the representable range.
    #[error("Block {block} has invalid timestamp {timestamp}")]
    InvalidTimestamp {
        /// Block number.
        block: u64,
        /// Raw seconds reported by the node.
        timestamp: u64,
    },

    /// The store failed.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Writes notification records.
pub struct NotificationRecorder {
    repo: Arc<dyn AppRepository>,
    chain: Arc<dyn ChainClient>,
}

impl NotificationRecorder {
    /// Creates a recorder over `repo`, fetching block times from `chain`.
    pub fn new(repo: Arc<dyn AppRepository>, chain: Arc<dyn ChainClient>) -> Self {
        Self { repo, chain }
    }

    /// Inserts a pending notification for `rule` and `event`. Returns `None`
    /// when the same log was already recorded for this rule.
    #[tracing::instrument(skip_all, level = "debug", fields(rule_id = rule.id))]
    pub async fn record_pending(
        &self,
        rule: &Rule,
        event: &DecodedEvent,
    ) -> Result<Option<Notification>, RecorderError> {
        let block = event.log.block_number().ok_or(RecorderError::IncompleteLog("block number"))?;
        let tx_hash = event.log.transaction_hash().ok_or(RecorderError::IncompleteLog("transaction hash"))?;
        let log_index = event.log.log_index().unwrap_or_default();

        let timestamp = self.chain.block_timestamp(block).await?;
        let block_timestamp = i64::try_from(timestamp)
            .ok()
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
            .ok_or(RecorderError::InvalidTimestamp { block, timestamp })?;

        let new = NewNotification {
            rule_id: rule.id,
            event_data: event.fields_json(),
            block,
            block_timestamp,
            tx_hash: tx_hash.to_string(),
            log_index,
        };

        match self.repo.create_notification(new).await {
            Ok(notification) => {
                tracing::debug!(notification_id = notification.id, "Pending notification recorded.");
                Ok(Some(notification))
            }
            Err(PersistenceError::AlreadyExists(_)) => {
                tracing::info!(block, %tx_hash, log_index, "Log already recorded for rule, skipping.");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Marks a notification delivered.
    pub async fn mark_sent(&self, notification_id: i64) -> Result<(), PersistenceError> {
        self.repo.update_notification_status(notification_id, NotificationStatus::Sent, None).await
    }

    /// Marks a notification failed with the adapter's error text.
    pub async fn mark_failed(&self, notification_id: i64, error: &str) -> Result<(), PersistenceError> {
        self.repo
            .update_notification_status(notification_id, NotificationStatus::Failed, Some(error.to_string()))
            .await
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{Address, U256, address};
    use mockall::predicate::eq;

    use super::*;
    use crate::{
        abi::decode,
        models::Log,
        persistence::traits::MockAppRepository,
        providers::traits::MockChainClient,
        test_helpers::{FakeChainClient, LogBuilder, RuleBuilder, erc20_interface},
    };

    const TOKEN: Address = address!("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");

    fn event(log: Log) -> DecodedEvent {
        decode(&log, &erc20_interface()).unwrap()
    }

    fn transfer() -> LogBuilder {
        LogBuilder::erc20_transfer(TOKEN, Address::ZERO, Address::ZERO, U256::from(1u64))
    }

    fn stored(new: NewNotification) -> Notification {
        let now = Utc::now();
        Notification {
            id: 11,
            rule_id: new.rule_id,
            event_data: new.event_data,
            status: NotificationStatus::Pending,
            block: new.block,
            block_timestamp: new.block_timestamp,
            tx_hash: new.tx_hash,
            log_index: new.log_index,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_record_pending_uses_block_timestamp() {
        let mut repo = MockAppRepository::new();
        repo.expect_create_notification()
            .withf(|new| {
                new.rule_id == 4
                    && new.block == 100
                    && new.log_index == 0
                    && new.block_timestamp.timestamp() == 1_650_000_000
                    && new.tx_hash.starts_with("0xaaaa")
            })
            .times(1)
            .returning(|new| Ok(stored(new)));
        let chain = FakeChainClient::new().with_block_timestamp(100, 1_650_000_000);

        let recorder = NotificationRecorder::new(Arc::new(repo), Arc::new(chain));
        let rule = RuleBuilder::new(TOKEN).id(4).build();
        let notification = recorder.record_pending(&rule, &event(transfer().build())).await.unwrap().unwrap();

        assert_eq!(notification.id, 11);
        assert_eq!(notification.event_data["value"], "1");
    }

    #[tokio::test]
    async fn test_duplicate_is_not_an_error() {
        let mut repo = MockAppRepository::new();
        repo.expect_create_notification()
            .returning(|_| Err(PersistenceError::AlreadyExists("notification".into())));

        let recorder = NotificationRecorder::new(Arc::new(repo), Arc::new(FakeChainClient::new()));
        let rule = RuleBuilder::new(TOKEN).build();
        assert!(recorder.record_pending(&rule, &event(transfer().build())).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_block_lookup_failure_aborts() {
        let mut repo = MockAppRepository::new();
        repo.expect_create_notification().never();
        let chain = FakeChainClient::new();
        chain.fail_block_lookups(true);

        let recorder = NotificationRecorder::new(Arc::new(repo), Arc::new(chain));
        let rule = RuleBuilder::new(TOKEN).build();
        let result = recorder.record_pending(&rule, &event(transfer().build())).await;
        assert!(matches!(result, Err(RecorderError::Chain(ChainClientError::BlockNotFound(100)))));
    }

    #[tokio::test]
    async fn test_out_of_range_timestamp() {
        let mut chain = MockChainClient::new();
        chain.expect_block_timestamp().with(eq(100)).returning(|_| Ok(u64::MAX));

        let recorder = NotificationRecorder::new(Arc::new(MockAppRepository::new()), Arc::new(chain));
        let rule = RuleBuilder::new(TOKEN).build();
        let result = recorder.record_pending(&rule, &event(transfer().build())).await;
        assert!(matches!(result, Err(RecorderError::InvalidTimestamp { block: 100, .. })));
    }

    #[tokio::test]
    async fn test_pending_log_without_block_is_rejected() {
        let log = LogBuilder::new()
            .address(TOKEN)
            .topics(transfer().build().topics().to_vec())
            .data(transfer().build().data().clone())
            .build();

        let recorder =
            NotificationRecorder::new(Arc::new(MockAppRepository::new()), Arc::new(FakeChainClient::new()));
        let rule = RuleBuilder::new(TOKEN).build();
        let result = recorder.record_pending(&rule, &event(log)).await;
        assert!(matches!(result, Err(RecorderError::IncompleteLog("block number"))));
    }

    #[tokio::test]
    async fn test_mark_failed_records_error() {
        let mut repo = MockAppRepository::new();
        repo.expect_update_notification_status()
            .with(eq(3), eq(NotificationStatus::Failed), eq(Some("discord returned 500".to_string())))
            .times(1)
            .returning(|_, _, _| Ok(()));

        let recorder = NotificationRecorder::new(Arc::new(repo), Arc::new(FakeChainClient::new()));
        recorder.mark_failed(3, "discord returned 500").await.unwrap();
    }
}
