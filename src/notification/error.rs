//! Error types for notification delivery.

use thiserror::Error;

use crate::{http_client::HttpClientPoolError, models::AdapterKind};

/// Errors raised while delivering a notification.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// The rule has no destination to deliver to.
    #[error("Rule {rule_id} has an empty adapter_value")]
    EmptyDestination {
        /// The rule lacking a destination.
        rule_id: i64,
    },

    /// A channel credential was not configured.
    #[error("Missing credential: {0}")]
    MissingCredential(&'static str),

    /// No adapter is registered for the rule's channel.
    #[error("No adapter registered for '{0}'")]
    UnsupportedAdapter(AdapterKind),

    /// The channel answered with an unexpected HTTP status.
    #[error("{channel} delivery failed with HTTP status {status}")]
    Delivery {
        /// Channel name.
        channel: &'static str,
        /// HTTP status code.
        status: u16,
    },

    /// The channel accepted the request but refused the message.
    #[error("{channel} rejected the message: {reason}")]
    Rejected {
        /// Channel name.
        channel: &'static str,
        /// Reason given by the channel.
        reason: String,
    },

    /// The request could not be sent or its response could not be read.
    #[error("Request error: {0}")]
    Transport(String),

    /// An error originating from the HTTP client pool.
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] HttpClientPoolError),
}

impl NotificationError {
    /// Replaces every occurrence of `secret` in the error text.
    pub fn redact(self, secret: &str) -> Self {
        if secret.is_empty() {
            return self;
        }
        match self {
            Self::Transport(text) => Self::Transport(text.replace(secret, "<redacted>")),
            Self::Rejected { channel, reason } => Self::Rejected { channel, reason: reason.replace(secret, "<redacted>") },
            other => other,
        }
    }
}

impl From<reqwest_middleware::Error> for NotificationError {
    fn from(error: reqwest_middleware::Error) -> Self {
        match error {
            reqwest_middleware::Error::Reqwest(e) => Self::Transport(e.without_url().to_string()),
            other => Self::Transport(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for NotificationError {
    fn from(error: reqwest::Error) -> Self {
        Self::Transport(error.without_url().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_transport_text() {
        let error = NotificationError::Transport("error sending request for url (http://x/bot123:abc/sendMessage)".into());
        let redacted = error.redact("123:abc").to_string();
        assert!(!redacted.contains("123:abc"));
        assert!(redacted.contains("/bot<redacted>/sendMessage"));
    }

    #[test]
    fn test_redact_leaves_other_variants() {
        let error = NotificationError::Delivery { channel: "telegram", status: 401 };
        assert!(matches!(error.redact("123:abc"), NotificationError::Delivery { status: 401, .. }));
    }
}
