//! An in-process [`ChainClient`] that lets tests push logs into open
//! subscriptions.

use std::{
    collections::HashMap,
    sync::{
        Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use alloy::rpc::types::Filter;
use async_trait::async_trait;
use futures::{StreamExt, channel::mpsc};

use crate::{
    models::Log,
    providers::{ChainClient, ChainClientError, LogStream},
};

struct Feed {
    filter: Filter,
    sender: mpsc::UnboundedSender<Log>,
}

/// A fake chain. Every `subscribe_logs` call opens a feed; [`emit`] sends a
/// log to every open feed whose filter matches it.
///
/// [`emit`]: FakeChainClient::emit
pub struct FakeChainClient {
    feeds: Mutex<Vec<Feed>>,
    timestamps: Mutex<HashMap<u64, u64>>,
    default_timestamp: u64,
    fail_subscriptions: AtomicBool,
    fail_block_lookups: AtomicBool,
    subscribe_calls: AtomicUsize,
}

impl Default for FakeChainClient {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeChainClient {
    /// Blocks default to timestamp `1_700_000_000` (2023-11-14 22:13:20 UTC).
    pub fn new() -> Self {
        Self {
            feeds: Mutex::new(Vec::new()),
            timestamps: Mutex::new(HashMap::new()),
            default_timestamp: 1_700_000_000,
            fail_subscriptions: AtomicBool::new(false),
            fail_block_lookups: AtomicBool::new(false),
            subscribe_calls: AtomicUsize::new(0),
        }
    }

    /// Overrides the timestamp of one block.
    pub fn with_block_timestamp(self, block_number: u64, timestamp: u64) -> Self {
        self.timestamps.lock().unwrap_or_else(|e| e.into_inner()).insert(block_number, timestamp);
        self
    }

    /// Makes subsequent `subscribe_logs` calls fail.
    pub fn fail_subscriptions(&self, fail: bool) {
        self.fail_subscriptions.store(fail, Ordering::SeqCst);
    }

    /// Makes subsequent `block_timestamp` calls fail.
    pub fn fail_block_lookups(&self, fail: bool) {
        self.fail_block_lookups.store(fail, Ordering::SeqCst);
    }

    /// Number of successful `subscribe_logs` calls so far.
    pub fn subscribe_calls(&self) -> usize {
        self.subscribe_calls.load(Ordering::SeqCst)
    }

    /// Number of feeds whose consumer is still listening.
    pub fn open_feeds(&self) -> usize {
        let mut feeds = self.feeds.lock().unwrap_or_else(|e| e.into_inner());
        feeds.retain(|feed| !feed.sender.is_closed());
        feeds.len()
    }

    /// Delivers `log` to every open feed whose filter matches it and returns
    /// how many feeds received it.
    pub fn emit(&self, log: Log) -> usize {
        let mut feeds = self.feeds.lock().unwrap_or_else(|e| e.into_inner());
        feeds.retain(|feed| !feed.sender.is_closed());

        let topic0 = log.topic0().copied();
        feeds
            .iter()
            .filter(|feed| {
                feed.filter.address.matches(&log.address())
                    && topic0.is_some_and(|topic| feed.filter.topics[0].matches(&topic))
            })
            .filter(|feed| feed.sender.unbounded_send(log.clone()).is_ok())
            .count()
    }

    /// Ends every open stream, as if the node dropped all subscriptions.
    pub fn close_all(&self) {
        self.feeds.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

#[async_trait]
impl ChainClient for FakeChainClient {
    async fn subscribe_logs(&self, filter: &Filter) -> Result<LogStream, ChainClientError> {
        if self.fail_subscriptions.load(Ordering::SeqCst) {
            return Err(ChainClientError::Provider("subscription refused".into()));
        }
        let (sender, receiver) = mpsc::unbounded();
        self.feeds.lock().unwrap_or_else(|e| e.into_inner()).push(Feed { filter: filter.clone(), sender });
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        Ok(receiver.boxed())
    }

    async fn block_timestamp(&self, block_number: u64) -> Result<u64, ChainClientError> {
        if self.fail_block_lookups.load(Ordering::SeqCst) {
            return Err(ChainClientError::BlockNotFound(block_number));
        }
        let timestamps = self.timestamps.lock().unwrap_or_else(|e| e.into_inner());
        Ok(timestamps.get(&block_number).copied().unwrap_or(self.default_timestamp))
    }
}
