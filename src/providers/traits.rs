//! The interface the pipeline uses to talk to an EVM node.

use alloy::rpc::types::Filter;
use async_trait::async_trait;
use futures::stream::BoxStream;
#[cfg(test)]
use mockall::automock;
use thiserror::Error;

use crate::models::Log;

/// A live stream of logs matching a subscription filter. The stream ends when
/// the upstream subscription is dropped by the node or the connection.
pub type LogStream = BoxStream<'static, Log>;

/// Errors returned by a [`ChainClient`].
#[derive(Error, Debug)]
pub enum ChainClientError {
    /// The RPC URL is unusable.
    #[error("Failed to parse RPC URL: {0}")]
    UrlParse(#[from] url::ParseError),

    /// The node could not be reached or refused the request.
    #[error("Provider error: {0}")]
    Provider(#[from] Box<dyn std::error::Error + Send + Sync>),

    /// The requested block does not exist (yet).
    #[error("Block not found: {0}")]
    BlockNotFound(u64),
}

/// A source of log subscriptions and block metadata.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Opens a log subscription for `filter`.
    async fn subscribe_logs(&self, filter: &Filter) -> Result<LogStream, ChainClientError>;

    /// Unix timestamp (seconds) of block `block_number`.
    async fn block_timestamp(&self, block_number: u64) -> Result<u64, ChainClientError>;
}
