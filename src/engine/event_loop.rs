//! The long-lived processing task.
//!
//! The loop is the single owner of the [`SubscriptionManager`]. It waits on
//! the cancellation token, the subscription command queue and the merged log
//! stream, handling one item to completion before taking the next.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{
    engine::{EventProcessor, ProcessOutcome},
    models::Log,
    subscription::{SubscriptionCommand, SubscriptionEvent, SubscriptionManager},
};

/// Drives subscriptions and feeds their logs through the [`EventProcessor`].
pub struct EventLoop {
    manager: SubscriptionManager,
    processor: EventProcessor,
    commands: mpsc::Receiver<SubscriptionCommand>,
    cancellation_token: CancellationToken,
    step_timeout: Duration,
}

impl EventLoop {
    /// Creates the loop. `step_timeout` bounds the processing of each log.
    pub fn new(
        manager: SubscriptionManager,
        processor: EventProcessor,
        commands: mpsc::Receiver<SubscriptionCommand>,
        cancellation_token: CancellationToken,
        step_timeout: Duration,
    ) -> Self {
        Self { manager, processor, commands, cancellation_token, step_timeout }
    }

    /// Runs until the cancellation token fires, then cancels every
    /// subscription. An item already being processed is finished first.
    pub async fn run(mut self) {
        tracing::info!(subscriptions = self.manager.len(), "Event loop started.");
        loop {
            tokio::select! {
                biased;

                _ = self.cancellation_token.cancelled() => {
                    tracing::info!("Event loop received shutdown signal.");
                    break;
                }
                Some(command) = self.commands.recv() => self.handle_command(command).await,
                Some(event) = self.manager.next(), if self.manager.has_streams() => match event {
                    SubscriptionEvent::Log(log) => self.handle_log(log).await,
                    SubscriptionEvent::Closed(key) => {
                        if let Err(e) = self.manager.reopen(key).await {
                            tracing::error!(%key, error = %e, "Failed to re-open log subscription.");
                        }
                    }
                },
            }
        }

        self.manager.shutdown();
        tracing::info!("Event loop stopped.");
    }

    async fn handle_command(&mut self, command: SubscriptionCommand) {
        match command {
            SubscriptionCommand::Add(rule) => {
                if let Err(e) = self.manager.add_subscription(&rule).await {
                    tracing::error!(rule_id = rule.id, error = %e, "Failed to subscribe rule.");
                }
            }
            SubscriptionCommand::Remove(rule_id) => {
                if !self.manager.remove_rule(rule_id) {
                    tracing::debug!(rule_id, "Rule had no subscription.");
                }
            }
        }
    }

    async fn handle_log(&mut self, log: Log) {
        match tokio::time::timeout(self.step_timeout, self.processor.process(&log)).await {
            Ok(Ok(ProcessOutcome::Sent(id))) => tracing::debug!(notification_id = id, "Log processed."),
            Ok(Ok(outcome)) => tracing::debug!(?outcome, "Log processed."),
            Ok(Err(e)) => tracing::error!(
                error = %e,
                tx_hash = ?log.transaction_hash(),
                log_index = ?log.log_index(),
                "Failed to process log."
            ),
            Err(_) => tracing::error!(
                timeout = ?self.step_timeout,
                tx_hash = ?log.transaction_hash(),
                "Processing of log timed out."
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use alloy::primitives::{Address, U256, address};

    use super::*;
    use crate::{
        engine::{NotificationRecorder, RuleMatcher},
        notification::NotificationService,
        persistence::traits::MockAppRepository,
        subscription::{BackpressurePolicy, subscription_channel},
        test_helpers::{FakeChainClient, LogBuilder, RuleBuilder, erc20_interface},
    };

    const TOKEN: Address = address!("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");

    fn event_loop(
        repo: MockAppRepository,
        chain: Arc<FakeChainClient>,
        commands: mpsc::Receiver<SubscriptionCommand>,
        token: CancellationToken,
    ) -> EventLoop {
        let repo: Arc<dyn crate::persistence::AppRepository> = Arc::new(repo);
        let processor = EventProcessor::new(
            Arc::new(erc20_interface()),
            RuleMatcher::new(repo.clone()),
            NotificationRecorder::new(repo, chain.clone()),
            Arc::new(NotificationService::with_channels([])),
        );
        EventLoop::new(SubscriptionManager::new(chain), processor, commands, token, Duration::from_secs(5))
    }

    async fn wait_for(condition: impl Fn() -> bool) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while !condition() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    fn assert_send<T: Send>(_: &T) {}

    #[test]
    fn test_run_future_is_send() {
        let (_requester, commands) = subscription_channel(1, BackpressurePolicy::Block);
        let event_loop =
            event_loop(MockAppRepository::new(), Arc::new(FakeChainClient::new()), commands, CancellationToken::new());
        let run = event_loop.run();
        assert_send(&run);
    }

    #[tokio::test]
    async fn test_add_command_subscribes_and_processes_logs() {
        let lookups = Arc::new(AtomicUsize::new(0));
        let mut repo = MockAppRepository::new();
        repo.expect_get_active_rules_for_contract().times(1).returning({
            let lookups = lookups.clone();
            move |_| {
                lookups.fetch_add(1, Ordering::SeqCst);
                Ok(vec![])
            }
        });

        let chain = Arc::new(FakeChainClient::new());
        let (requester, commands) = subscription_channel(4, BackpressurePolicy::Block);
        let token = CancellationToken::new();
        let handle = tokio::spawn(event_loop(repo, chain.clone(), commands, token.clone()).run());

        requester.request(SubscriptionCommand::Add(RuleBuilder::new(TOKEN).build())).await.unwrap();
        wait_for(|| chain.open_feeds() == 1).await;

        let log = LogBuilder::erc20_transfer(TOKEN, Address::ZERO, Address::ZERO, U256::from(1u64)).build();
        assert_eq!(chain.emit(log), 1);

        wait_for(|| lookups.load(Ordering::SeqCst) == 1).await;
        token.cancel();
        handle.await.unwrap();
        assert_eq!(chain.open_feeds(), 0);
    }

    #[tokio::test]
    async fn test_remove_command_cancels_subscription() {
        let chain = Arc::new(FakeChainClient::new());
        let (requester, commands) = subscription_channel(4, BackpressurePolicy::Block);
        let token = CancellationToken::new();
        let handle =
            tokio::spawn(event_loop(MockAppRepository::new(), chain.clone(), commands, token.clone()).run());

        requester.request(SubscriptionCommand::Add(RuleBuilder::new(TOKEN).id(3).build())).await.unwrap();
        wait_for(|| chain.open_feeds() == 1).await;
        requester.request(SubscriptionCommand::Remove(3)).await.unwrap();
        wait_for(|| chain.open_feeds() == 0).await;

        token.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_closed_stream_is_reopened() {
        let chain = Arc::new(FakeChainClient::new());
        let (requester, commands) = subscription_channel(4, BackpressurePolicy::Block);
        let token = CancellationToken::new();
        let handle =
            tokio::spawn(event_loop(MockAppRepository::new(), chain.clone(), commands, token.clone()).run());

        requester.request(SubscriptionCommand::Add(RuleBuilder::new(TOKEN).build())).await.unwrap();
        wait_for(|| chain.subscribe_calls() == 1).await;

        chain.close_all();
        wait_for(|| chain.subscribe_calls() == 2 && chain.open_feeds() == 1).await;

        token.cancel();
        handle.await.unwrap();
    }
}
