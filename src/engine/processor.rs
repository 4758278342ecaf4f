//! Runs one log through decode, match, record and dispatch.

use std::sync::Arc;

use thiserror::Error;

use crate::{
    abi::{ContractInterface, DecodeError, decode},
    engine::{NotificationRecorder, RecorderError, RuleMatcher},
    models::Log,
    notification::NotificationService,
    persistence::PersistenceError,
};

/// How a log left the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// The log was retracted by a reorg.
    Removed,
    /// No active rule watches this event.
    NoMatch,
    /// The log was already recorded for the matched rule.
    Duplicate,
    /// The notification with this id was delivered.
    Sent(i64),
    /// Delivery of the notification with this id failed.
    Failed(i64),
}

/// Errors that abort processing of a single log.
#[derive(Error, Debug)]
pub enum ProcessError {
    /// The log could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Rule lookup or a status update failed.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    /// The pending notification could not be recorded.
    #[error(transparent)]
    Recorder(#[from] RecorderError),
}

/// The per-log pipeline.
pub struct EventProcessor {
    interface: Arc<ContractInterface>,
    matcher: RuleMatcher,
    recorder: NotificationRecorder,
    notifier: Arc<NotificationService>,
}

impl EventProcessor {
    /// Assembles the pipeline.
    pub fn new(
        interface: Arc<ContractInterface>,
        matcher: RuleMatcher,
        recorder: NotificationRecorder,
        notifier: Arc<NotificationService>,
    ) -> Self {
        Self { interface, matcher, recorder, notifier }
    }

    /// Processes one log. Delivery failures are recorded on the notification
    /// and reported as [`ProcessOutcome::Failed`], not as errors.
    #[tracing::instrument(
        skip_all,
        level = "debug",
        fields(block = ?log.block_number(), tx_hash = ?log.transaction_hash(), log_index = ?log.log_index())
    )]
    pub async fn process(&self, log: &Log) -> Result<ProcessOutcome, ProcessError> {
        if log.removed() {
            tracing::debug!("Skipping removed log.");
            return Ok(ProcessOutcome::Removed);
        }

        let event = decode(log, &self.interface)?;
        let Some(rule) = self.matcher.find_match(&event).await? else {
            return Ok(ProcessOutcome::NoMatch);
        };
        let Some(notification) = self.recorder.record_pending(&rule, &event).await? else {
            return Ok(ProcessOutcome::Duplicate);
        };

        match self.notifier.dispatch(&rule, &event, notification.block_timestamp).await {
            Ok(()) => {
                self.recorder.mark_sent(notification.id).await?;
                Ok(ProcessOutcome::Sent(notification.id))
            }
            Err(e) => {
                tracing::warn!(rule_id = rule.id, notification_id = notification.id, error = %e, "Notification delivery failed.");
                self.recorder.mark_failed(notification.id, &e.to_string()).await?;
                Ok(ProcessOutcome::Failed(notification.id))
            }
        }
    }
}
