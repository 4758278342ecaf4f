//! Delivery records written for every matched event.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of a notification: `pending` until the channel adapter answers,
/// then `sent` or `failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    /// Recorded, not yet delivered.
    Pending,
    /// Accepted by the channel.
    Sent,
    /// The channel adapter reported an error.
    Failed,
}

impl NotificationStatus {
    /// The stored representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "sent" => Ok(Self::Sent),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown notification status '{other}'")),
        }
    }
}

/// A persisted notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Unique identifier assigned by the store.
    pub id: i64,
    /// The rule that matched.
    pub rule_id: i64,
    /// Decoded event parameters keyed by name.
    pub event_data: serde_json::Value,
    /// Delivery status.
    pub status: NotificationStatus,
    /// Block the event was emitted in.
    pub block: u64,
    /// Timestamp of that block.
    pub block_timestamp: DateTime<Utc>,
    /// `0x` hex transaction hash.
    pub tx_hash: String,
    /// Position of the log in its block.
    pub log_index: u64,
    /// Adapter error text for failed deliveries.
    pub error: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last status change.
    pub updated_at: DateTime<Utc>,
}

/// The fields needed to insert a pending notification.
#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    /// The rule that matched.
    pub rule_id: i64,
    /// Decoded event parameters keyed by name.
    pub event_data: serde_json::Value,
    /// Block the event was emitted in.
    pub block: u64,
    /// Timestamp of that block.
    pub block_timestamp: DateTime<Utc>,
    /// `0x` hex transaction hash.
    pub tx_hash: String,
    /// Position of the log in its block.
    pub log_index: u64,
}
