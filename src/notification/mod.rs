//! # Notification dispatch
//!
//! Renders a matched event into the fixed message template and hands it to the
//! channel adapter selected by the rule. Each adapter owns its failure domain:
//! a Telegram outage does not affect Discord delivery and vice versa.

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};
use reqwest_middleware::ClientWithMiddleware;
use url::Url;

use crate::{
    config::AppConfig,
    http_client::HttpClientPool,
    models::{AdapterKind, DecodedEvent, Rule},
};

pub mod channel;
pub mod discord;
pub mod error;
pub mod message;
pub mod telegram;

pub use channel::{Channel, ChannelAdapter};
pub use discord::DiscordAdapter;
pub use error::NotificationError;
pub use message::render_message;
pub use telegram::TelegramAdapter;

/// Routes notifications to the channel adapters.
pub struct NotificationService {
    channels: HashMap<AdapterKind, Channel>,
}

impl NotificationService {
    /// Creates a service with the Telegram and Discord adapters sharing
    /// `client`.
    pub fn new(client: Arc<ClientWithMiddleware>, telegram_api_url: Url, telegram_token: Option<String>) -> Self {
        Self::with_channels([
            Channel::Telegram(TelegramAdapter::new(client.clone(), telegram_api_url, telegram_token)),
            Channel::Discord(DiscordAdapter::new(client)),
        ])
    }

    /// Creates a service from the application configuration, taking its HTTP
    /// client from `pool`.
    pub async fn from_config(config: &AppConfig, pool: &HttpClientPool) -> Result<Self, NotificationError> {
        let client = pool.get_or_create(&config.http_retry_config).await?;
        if config.telegram_bot_token.is_none() {
            tracing::warn!("No Telegram bot token configured; Telegram rules will fail to deliver.");
        }
        Ok(Self::new(client, config.telegram_api_url.clone(), config.telegram_bot_token.clone()))
    }

    /// Creates a service serving exactly `channels`.
    pub fn with_channels(channels: impl IntoIterator<Item = Channel>) -> Self {
        Self { channels: channels.into_iter().map(|channel| (channel.kind(), channel)).collect() }
    }

    /// Renders `event` and sends it through the rule's channel.
    #[tracing::instrument(skip_all, level = "debug", fields(rule_id = rule.id, adapter = %rule.adapter))]
    pub async fn dispatch(
        &self,
        rule: &Rule,
        event: &DecodedEvent,
        block_timestamp: DateTime<Utc>,
    ) -> Result<(), NotificationError> {
        let destination = rule.adapter_value.trim();
        if destination.is_empty() {
            return Err(NotificationError::EmptyDestination { rule_id: rule.id });
        }
        let channel = self.channels.get(&rule.adapter).ok_or(NotificationError::UnsupportedAdapter(rule.adapter))?;

        let message = render_message(event, block_timestamp);
        channel.send(destination, &message).await?;
        tracing::info!(event = %event.name, "Notification delivered.");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{Address, U256, address};

    use super::*;
    use crate::{
        abi::decode,
        config::HttpRetryConfig,
        test_helpers::{LogBuilder, RuleBuilder, erc20_interface},
    };

    const TOKEN: Address = address!("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");

    async fn client() -> Arc<ClientWithMiddleware> {
        let retry = HttpRetryConfig { max_retries: 0, ..HttpRetryConfig::default() };
        HttpClientPool::default().get_or_create(&retry).await.unwrap()
    }

    fn event() -> DecodedEvent {
        let log = LogBuilder::erc20_transfer(TOKEN, Address::ZERO, Address::ZERO, U256::from(1u64)).build();
        decode(&log, &erc20_interface()).unwrap()
    }

    #[tokio::test]
    async fn test_dispatch_rejects_empty_destination() {
        let service = NotificationService::new(client().await, Url::parse("http://127.0.0.1:1").unwrap(), None);
        let rule = RuleBuilder::new(TOKEN).id(7).adapter(AdapterKind::Discord, " ").build();

        let result = service.dispatch(&rule, &event(), Utc::now()).await;
        assert!(matches!(result, Err(NotificationError::EmptyDestination { rule_id: 7 })));
    }

    #[tokio::test]
    async fn test_dispatch_telegram_without_token() {
        let service = NotificationService::new(client().await, Url::parse("http://127.0.0.1:1").unwrap(), None);
        let rule = RuleBuilder::new(TOKEN).adapter(AdapterKind::Telegram, "-100123").build();

        let result = service.dispatch(&rule, &event(), Utc::now()).await;
        assert!(matches!(result, Err(NotificationError::MissingCredential(_))));
    }

    #[tokio::test]
    async fn test_dispatch_unregistered_adapter() {
        let service = NotificationService::with_channels([Channel::Discord(DiscordAdapter::new(client().await))]);
        let rule = RuleBuilder::new(TOKEN).adapter(AdapterKind::Telegram, "-100123").build();

        let result = service.dispatch(&rule, &event(), Utc::now()).await;
        assert!(matches!(result, Err(NotificationError::UnsupportedAdapter(AdapterKind::Telegram))));
    }

    #[tokio::test]
    async fn test_dispatch_discord() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/hook")
            .match_body(mockito::Matcher::Regex("New Event Detected".to_string()))
            .with_status(204)
            .expect(1)
            .create_async()
            .await;

        let service = NotificationService::new(client().await, Url::parse("http://127.0.0.1:1").unwrap(), None);
        let rule = RuleBuilder::new(TOKEN).adapter(AdapterKind::Discord, &format!("{}/hook", server.url())).build();

        service.dispatch(&rule, &event(), Utc::now()).await.unwrap();
        mock.assert();
    }
}
