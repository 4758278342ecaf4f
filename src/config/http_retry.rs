use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{
    deserialize_duration_from_ms, deserialize_duration_from_seconds, serialize_duration_to_ms,
    serialize_duration_to_seconds,
};

/// Jitter applied to retry backoff.
#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum JitterSetting {
    /// Exact exponential backoff.
    None,
    /// Randomize the whole backoff interval.
    #[default]
    Full,
}

/// Retry policy for outgoing HTTP requests to the chat channels.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(default)]
pub struct HttpRetryConfig {
    /// Retries after the first attempt for transient errors.
    pub max_retries: u32,
    /// Exponent base of the backoff.
    pub base_for_backoff: u32,
    /// Backoff before the first retry, in milliseconds.
    #[serde(deserialize_with = "deserialize_duration_from_ms", serialize_with = "serialize_duration_to_ms")]
    pub initial_backoff_ms: Duration,
    /// Upper bound of the backoff, in seconds.
    #[serde(
        deserialize_with = "deserialize_duration_from_seconds",
        serialize_with = "serialize_duration_to_seconds"
    )]
    pub max_backoff_secs: Duration,
    /// Jitter strategy.
    pub jitter: JitterSetting,
}

impl Default for HttpRetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_for_backoff: 2,
            initial_backoff_ms: Duration::from_millis(250),
            max_backoff_secs: Duration::from_secs(10),
            jitter: JitterSetting::Full,
        }
    }
}
