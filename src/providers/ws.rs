//! [`ChainClient`] over an alloy WebSocket provider.

use alloy::{
    eips::BlockNumberOrTag,
    providers::{DynProvider, Provider, ProviderBuilder, WsConnect},
    rpc::types::Filter,
};
use async_trait::async_trait;
use futures::StreamExt;
use url::Url;

use super::traits::{ChainClient, ChainClientError, LogStream};
use crate::models::Log;

/// Connects to a WebSocket RPC endpoint.
#[tracing::instrument(level = "info", skip(url), fields(host = url.host_str()))]
pub async fn create_ws_provider(url: &Url) -> Result<DynProvider, ChainClientError> {
    if !matches!(url.scheme(), "ws" | "wss") {
        return Err(ChainClientError::Provider(format!("expected a ws:// or wss:// URL, got '{}'", url.scheme()).into()));
    }
    let provider = ProviderBuilder::new()
        .connect_ws(WsConnect::new(url.as_str()))
        .await
        .map_err(|e| ChainClientError::Provider(Box::new(e)))?;
    tracing::info!("Connected to WebSocket RPC endpoint.");
    Ok(provider.erased())
}

/// A [`ChainClient`] backed by any alloy provider with pubsub support.
pub struct WsChainClient<P> {
    provider: P,
}

impl<P> WsChainClient<P>
where
    P: Provider,
{
    /// Wraps `provider`.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<P> ChainClient for WsChainClient<P>
where
    P: Provider + Send + Sync,
{
    #[tracing::instrument(skip(self, filter), level = "debug")]
    async fn subscribe_logs(&self, filter: &Filter) -> Result<LogStream, ChainClientError> {
        let subscription =
            self.provider.subscribe_logs(filter).await.map_err(|e| ChainClientError::Provider(Box::new(e)))?;
        tracing::debug!("Log subscription opened.");
        Ok(subscription.into_stream().map(Log::from).boxed())
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn block_timestamp(&self, block_number: u64) -> Result<u64, ChainClientError> {
        let block = self
            .provider
            .get_block_by_number(BlockNumberOrTag::Number(block_number))
            .await
            .map_err(|e| ChainClientError::Provider(Box::new(e)))?
            .ok_or(ChainClientError::BlockNotFound(block_number))?;
        Ok(block.header.timestamp)
    }
}
