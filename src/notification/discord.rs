//! Discord webhook delivery.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest_middleware::ClientWithMiddleware;
use serde_json::json;

use super::{channel::ChannelAdapter, error::NotificationError};

/// Discord rejects message content longer than this many characters.
const MAX_CONTENT_CHARS: usize = 2000;

/// Posts messages to Discord webhook URLs.
pub struct DiscordAdapter {
    client: Arc<ClientWithMiddleware>,
}

impl DiscordAdapter {
    /// Creates an adapter sending through `client`.
    pub fn new(client: Arc<ClientWithMiddleware>) -> Self {
        Self { client }
    }

    fn payload(message: &str) -> serde_json::Value {
        let content = if message.chars().count() > MAX_CONTENT_CHARS {
            let mut truncated = message.chars().take(MAX_CONTENT_CHARS - 1).collect::<String>();
            truncated.push('…');
            truncated
        } else {
            message.to_string()
        };
        json!({ "content": content })
    }
}

#[async_trait]
impl ChannelAdapter for DiscordAdapter {
    #[tracing::instrument(skip_all, level = "debug")]
    async fn send(&self, webhook_url: &str, message: &str) -> Result<(), NotificationError> {
        let response = self.client.post(webhook_url).json(&Self::payload(message)).send().await?;

        // Webhooks without `?wait=true` answer 204 on success.
        let status = response.status();
        if status != StatusCode::NO_CONTENT {
            tracing::warn!(status = status.as_u16(), "Discord webhook returned an unexpected status.");
            return Err(NotificationError::Delivery { channel: "discord", status: status.as_u16() });
        }
        tracing::debug!("Discord message delivered.");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_truncates_long_messages() {
        let long = "a".repeat(MAX_CONTENT_CHARS + 10);
        let payload = DiscordAdapter::payload(&long);
        let content = payload["content"].as_str().unwrap();
        assert_eq!(content.chars().count(), MAX_CONTENT_CHARS);
        assert!(content.ends_with('…'));

        assert_eq!(DiscordAdapter::payload("hi"), json!({ "content": "hi" }));
    }
}
