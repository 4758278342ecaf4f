//! Telegram bot delivery.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use serde_json::json;
use url::Url;

use super::{channel::ChannelAdapter, error::NotificationError};

const SPECIAL: &[char] =
    &['_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!', '\\'];

// Bold labels open a line, optionally after a list marker. Anything else is
// message content and gets escaped.
static LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^(?:- )?\*[^*\n]+\*").expect("label pattern is valid"));

#[derive(Deserialize)]
struct TelegramResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Sends messages through the Telegram bot API.
pub struct TelegramAdapter {
    client: Arc<ClientWithMiddleware>,
    api_url: Url,
    token: Option<String>,
}

impl TelegramAdapter {
    /// Creates an adapter. A missing token is only reported when a message
    /// is actually sent.
    pub fn new(client: Arc<ClientWithMiddleware>, api_url: Url, token: Option<String>) -> Self {
        Self { client, api_url, token }
    }

    fn token(&self) -> Result<&str, NotificationError> {
        self.token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(NotificationError::MissingCredential("telegram bot token"))
    }

    /// Escapes `text` for the MarkdownV2 parse mode, keeping the `*bold*`
    /// labels that start a line.
    pub fn escape_markdown_v2(text: &str) -> String {
        fn push_escaped(out: &mut String, text: &str) {
            for c in text.chars() {
                if SPECIAL.contains(&c) {
                    out.push('\\');
                }
                out.push(c);
            }
        }

        let mut out = String::with_capacity(text.len() * 2);
        let mut last = 0;
        for label in LABEL.find_iter(text) {
            push_escaped(&mut out, &text[last..label.start()]);
            let bold = match label.as_str().strip_prefix("- ") {
                Some(bold) => {
                    out.push_str("\\- ");
                    bold
                }
                None => label.as_str(),
            };
            out.push('*');
            push_escaped(&mut out, &bold[1..bold.len() - 1]);
            out.push('*');
            last = label.end();
        }
        push_escaped(&mut out, &text[last..]);
        out
    }

    async fn post(&self, token: &str, chat_id: &str, message: &str) -> Result<(), NotificationError> {
        let url = format!("{}/bot{}/sendMessage", self.api_url.as_str().trim_end_matches('/'), token);
        let payload = json!({
            "chat_id": chat_id,
            "text": Self::escape_markdown_v2(message),
            "parse_mode": "MarkdownV2",
            "disable_web_page_preview": true,
        });

        let response = self.client.post(&url).json(&payload).send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "Telegram API returned an error status.");
            return Err(NotificationError::Delivery { channel: "telegram", status: status.as_u16() });
        }

        let body: TelegramResponse = response.json().await?;
        if !body.ok {
            return Err(NotificationError::Rejected {
                channel: "telegram",
                reason: body.description.unwrap_or_else(|| "unknown error".to_string()),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ChannelAdapter for TelegramAdapter {
    #[tracing::instrument(skip(self, message), level = "debug")]
    async fn send(&self, chat_id: &str, message: &str) -> Result<(), NotificationError> {
        // The token is part of the request path and must not reach error
        // text that is logged or stored.
        let token = self.token()?;
        self.post(token, chat_id, message).await.map_err(|e| e.redact(token))?;
        tracing::debug!("Telegram message delivered.");
        Ok(())
    }
}
