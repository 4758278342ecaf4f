//! Live chain subscriptions.
//!
//! Rules are grouped by `(contract, topic0)`: every distinct key owns exactly
//! one upstream log subscription, no matter how many rules reference it. All
//! upstream streams are merged into a single stream consumed by the event
//! loop, which is also the only owner of the registry. Other tasks request
//! changes through a [`SubscriptionRequester`].

mod requester;

use std::{
    collections::{BTreeSet, HashMap},
    fmt,
    sync::Arc,
};

use alloy::{
    primitives::{Address, B256},
    rpc::types::Filter,
};
use futures::{
    StreamExt,
    stream::{self, BoxStream, SelectAll},
};
use serde::Deserialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

pub use requester::{SubscriptionRequester, subscription_channel};

use crate::{
    models::{Log, Rule, RuleValidationError},
    providers::{ChainClient, ChainClientError},
};

/// What to do when the request queue is full.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackpressurePolicy {
    /// Wait until the event loop makes room.
    #[default]
    Block,
    /// Fail `Add` immediately with [`SubscriptionError::QueueFull`].
    /// `Remove` still waits for room.
    Reject,
}

/// A change to the subscription set, requested by another task.
#[derive(Debug, Clone, PartialEq)]
pub enum SubscriptionCommand {
    /// Start watching for a newly created rule.
    Add(Rule),
    /// Stop watching for a deleted rule.
    Remove(i64),
}

/// Errors of the subscription layer.
#[derive(Error, Debug)]
pub enum SubscriptionError {
    /// The upstream subscription could not be opened.
    #[error("Failed to open log subscription for {key}: {source}")]
    Connection {
        /// The key that failed.
        key: SubscriptionKey,
        /// The chain client error.
        #[source]
        source: ChainClientError,
    },

    /// The rule cannot be turned into a filter.
    #[error("Rule {rule_id} cannot be subscribed: {source}")]
    InvalidRule {
        /// The offending rule.
        rule_id: i64,
        /// Why it is invalid.
        #[source]
        source: RuleValidationError,
    },

    /// The request queue is full and the policy is `reject`.
    #[error("Subscription request queue is full")]
    QueueFull,

    /// The event loop is gone.
    #[error("Subscription request queue is closed")]
    QueueClosed,
}

/// The identity of an upstream subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionKey {
    /// Watched contract.
    pub contract: Address,
    /// Watched event selector.
    pub topic0: B256,
}

impl SubscriptionKey {
    /// The key a rule subscribes under.
    pub fn for_rule(rule: &Rule) -> Result<Self, SubscriptionError> {
        let contract =
            rule.contract().map_err(|source| SubscriptionError::InvalidRule { rule_id: rule.id, source })?;
        Ok(Self { contract, topic0: rule.topic0() })
    }

    /// The log filter for this key.
    pub fn filter(&self) -> Filter {
        Filter::new().address(self.contract).event_signature(self.topic0)
    }
}

impl fmt::Display for SubscriptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.contract, self.topic0)
    }
}

/// Lifecycle of one upstream subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    /// Opening.
    Requested,
    /// Delivering logs.
    Active,
    /// The upstream stream ended or could not be opened.
    Error,
    /// No rule references the key any more.
    Cancelled,
}

/// An item of the merged stream.
#[derive(Debug, Clone, PartialEq)]
pub enum SubscriptionEvent {
    /// A log from one of the upstream subscriptions.
    Log(Log),
    /// The upstream stream of this key ended on its own.
    Closed(SubscriptionKey),
}

struct Subscription {
    rule_ids: BTreeSet<i64>,
    state: SubscriptionState,
    cancel: CancellationToken,
}

/// Owns the set of upstream subscriptions and their merged stream.
pub struct SubscriptionManager {
    client: Arc<dyn ChainClient>,
    registry: HashMap<SubscriptionKey, Subscription>,
    rule_keys: HashMap<i64, SubscriptionKey>,
    streams: SelectAll<BoxStream<'static, SubscriptionEvent>>,
}

impl SubscriptionManager {
    /// Creates an empty manager.
    pub fn new(client: Arc<dyn ChainClient>) -> Self {
        Self { client, registry: HashMap::new(), rule_keys: HashMap::new(), streams: SelectAll::new() }
    }

    /// Subscribes every active rule. Fails on the first subscription that
    /// cannot be opened.
    #[tracing::instrument(skip_all, level = "info", fields(rules = rules.len()))]
    pub async fn start(&mut self, rules: &[Rule]) -> Result<(), SubscriptionError> {
        for rule in rules.iter().filter(|rule| rule.active) {
            self.add_subscription(rule).await?;
        }
        tracing::info!(subscriptions = self.registry.len(), "Subscriptions started.");
        Ok(())
    }

    /// Attaches `rule` to the subscription of its key, opening one if the key
    /// is new. Inactive rules are ignored.
    #[tracing::instrument(skip_all, level = "debug", fields(rule_id = rule.id))]
    pub async fn add_subscription(&mut self, rule: &Rule) -> Result<(), SubscriptionError> {
        if !rule.active {
            tracing::debug!("Rule is inactive, not subscribing.");
            return Ok(());
        }
        let key = SubscriptionKey::for_rule(rule)?;

        match self.rule_keys.get(&rule.id).copied() {
            Some(existing) if existing == key => return Ok(()),
            Some(_) => {
                self.remove_rule(rule.id);
            }
            None => {}
        }

        if let Some(subscription) = self.registry.get_mut(&key) {
            if subscription.state == SubscriptionState::Active {
                subscription.rule_ids.insert(rule.id);
                self.rule_keys.insert(rule.id, key);
                tracing::debug!(%key, rules = subscription.rule_ids.len(), "Rule attached to existing subscription.");
                return Ok(());
            }
        }

        let rule_ids = self
            .registry
            .remove(&key)
            .map(|stale| {
                stale.cancel.cancel();
                stale.rule_ids
            })
            .unwrap_or_default();
        self.open(key, rule_ids).await?;
        if let Some(subscription) = self.registry.get_mut(&key) {
            subscription.rule_ids.insert(rule.id);
        }
        self.rule_keys.insert(rule.id, key);
        Ok(())
    }

    /// Detaches a rule. The upstream subscription is cancelled once no rule
    /// references its key. Returns `false` for unknown rules.
    pub fn remove_rule(&mut self, rule_id: i64) -> bool {
        let Some(key) = self.rule_keys.remove(&rule_id) else {
            return false;
        };

        if let Some(subscription) = self.registry.get_mut(&key) {
            subscription.rule_ids.remove(&rule_id);
            if subscription.rule_ids.is_empty() {
                subscription.cancel.cancel();
                subscription.state = SubscriptionState::Cancelled;
                self.registry.remove(&key);
                tracing::info!(%key, "Subscription cancelled, no rules left.");
            }
        }
        true
    }

    /// Re-opens the subscription of a key whose stream ended, keeping its
    /// rules attached.
    pub async fn reopen(&mut self, key: SubscriptionKey) -> Result<(), SubscriptionError> {
        let Some(stale) = self.registry.remove(&key) else {
            return Ok(());
        };
        stale.cancel.cancel();
        self.open(key, stale.rule_ids).await
    }

    /// The next item of the merged stream. Returns `None` only when no
    /// subscription is open.
    pub async fn next(&mut self) -> Option<SubscriptionEvent> {
        let event = self.streams.next().await?;
        if let SubscriptionEvent::Closed(key) = &event {
            if let Some(subscription) = self.registry.get_mut(key) {
                subscription.state = SubscriptionState::Error;
            }
            tracing::warn!(%key, "Upstream log subscription ended.");
        }
        Some(event)
    }

    /// `true` while at least one stream is merged, including cancelled
    /// streams that have not been drained yet.
    pub fn has_streams(&self) -> bool {
        !self.streams.is_empty()
    }

    /// State of the subscription for `key`, `None` when there is none.
    pub fn state(&self, key: &SubscriptionKey) -> Option<SubscriptionState> {
        self.registry.get(key).map(|subscription| subscription.state)
    }

    /// Rules attached to `key`, ascending.
    pub fn rules_for(&self, key: &SubscriptionKey) -> Vec<i64> {
        self.registry.get(key).map(|s| s.rule_ids.iter().copied().collect()).unwrap_or_default()
    }

    /// Number of upstream subscriptions held.
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    /// `true` when no subscription is held.
    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Cancels every subscription.
    pub fn shutdown(&mut self) {
        for (key, subscription) in self.registry.iter_mut() {
            subscription.cancel.cancel();
            subscription.state = SubscriptionState::Cancelled;
            tracing::debug!(%key, "Subscription cancelled.");
        }
        self.registry.clear();
        self.rule_keys.clear();
        self.streams = SelectAll::new();
    }

    async fn open(&mut self, key: SubscriptionKey, rule_ids: BTreeSet<i64>) -> Result<(), SubscriptionError> {
        let cancel = CancellationToken::new();
        self.registry.insert(
            key,
            Subscription { rule_ids, state: SubscriptionState::Requested, cancel: cancel.clone() },
        );

        let logs = match self.client.subscribe_logs(&key.filter()).await {
            Ok(logs) => logs,
            Err(source) => {
                tracing::error!(%key, error = %source, "Failed to open log subscription.");
                // Rules already attached stay registered so a later open
                // picks them up again.
                match self.registry.get_mut(&key) {
                    Some(subscription) if !subscription.rule_ids.is_empty() => {
                        subscription.state = SubscriptionState::Error;
                    }
                    _ => {
                        self.registry.remove(&key);
                    }
                }
                return Err(SubscriptionError::Connection { key, source });
            }
        };

        // The sentinel is only reached when upstream ends by itself;
        // cancellation cuts the stream before it.
        let stream = logs
            .map(SubscriptionEvent::Log)
            .chain(stream::once(async move { SubscriptionEvent::Closed(key) }))
            .take_until(cancel.cancelled_owned())
            .boxed();
        self.streams.push(stream);

        if let Some(subscription) = self.registry.get_mut(&key) {
            subscription.state = SubscriptionState::Active;
        }
        tracing::info!(%key, "Log subscription active.");
        Ok(())
    }
}
