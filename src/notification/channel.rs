//! The channel adapter capability and the closed set of implementations.

use async_trait::async_trait;

use super::{discord::DiscordAdapter, error::NotificationError, telegram::TelegramAdapter};
use crate::models::AdapterKind;

/// Delivers a rendered message to a destination.
#[async_trait]
pub trait ChannelAdapter: Send + Sync {
    /// Sends `message` to `destination` (a chat id, a webhook URL, ...).
    async fn send(&self, destination: &str, message: &str) -> Result<(), NotificationError>;
}

/// Every supported channel.
pub enum Channel {
    /// Telegram bot API.
    Telegram(TelegramAdapter),
    /// Discord webhooks.
    Discord(DiscordAdapter),
}

impl Channel {
    /// The rule adapter kind served by this channel.
    pub fn kind(&self) -> AdapterKind {
        match self {
            Self::Telegram(_) => AdapterKind::Telegram,
            Self::Discord(_) => AdapterKind::Discord,
        }
    }
}

#[async_trait]
impl ChannelAdapter for Channel {
    async fn send(&self, destination: &str, message: &str) -> Result<(), NotificationError> {
        match self {
            Self::Telegram(adapter) => adapter.send(destination, message).await,
            Self::Discord(adapter) => adapter.send(destination, message).await,
        }
    }
}
