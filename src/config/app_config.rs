use std::{path::PathBuf, time::Duration};

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use url::Url;

use super::{BaseHttpClientConfig, HttpRetryConfig, ServerConfig, deserialize_duration_from_seconds};
use crate::subscription::BackpressurePolicy;

fn default_telegram_bot_token() -> Option<String> {
    std::env::var("TELEGRAM_BOT_TOKEN").ok().filter(|token| !token.is_empty())
}

fn default_telegram_api_url() -> Url {
    Url::parse("https://api.telegram.org").expect("default Telegram API URL is valid")
}

fn default_subscription_queue_capacity() -> usize {
    64
}

fn default_event_processing_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(30)
}

/// Application configuration for Herald.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// SQLite database URL, e.g. `sqlite:herald.db`.
    pub database_url: String,

    /// WebSocket RPC endpoint of the watched chain.
    pub ws_rpc_url: Url,

    /// Path of the JSON ABI describing the watched events.
    pub abi_path: PathBuf,

    /// Telegram bot token. Falls back to `TELEGRAM_BOT_TOKEN`; only required
    /// once a Telegram rule matches.
    #[serde(default = "default_telegram_bot_token")]
    pub telegram_bot_token: Option<String>,

    /// Base URL of the Telegram bot API.
    #[serde(default = "default_telegram_api_url")]
    pub telegram_api_url: Url,

    /// Capacity of the subscription request queue.
    #[serde(default = "default_subscription_queue_capacity")]
    pub subscription_queue_capacity: usize,

    /// What API requests do when the subscription queue is full.
    #[serde(default)]
    pub subscription_backpressure: BackpressurePolicy,

    /// Upper bound for each step of processing one event, in seconds.
    #[serde(
        rename = "event_processing_timeout_secs",
        deserialize_with = "deserialize_duration_from_seconds",
        default = "default_event_processing_timeout"
    )]
    pub event_processing_timeout: Duration,

    /// The maximum time in seconds to wait for graceful shutdown.
    #[serde(
        deserialize_with = "deserialize_duration_from_seconds",
        default = "default_shutdown_timeout"
    )]
    pub shutdown_timeout: Duration,

    /// Retry policy of the notification HTTP clients.
    #[serde(default)]
    pub http_retry_config: HttpRetryConfig,

    /// Connection settings of the notification HTTP clients.
    #[serde(default)]
    pub http_base_config: BaseHttpClientConfig,

    /// Rule API server.
    #[serde(default)]
    pub server: ServerConfig,
}

impl AppConfig {
    /// Reads `{config_dir}/app.yaml` (default `configs`) and applies
    /// `HERALD__*` environment overrides, e.g. `HERALD__SERVER__API_KEY`.
    pub fn new(config_dir: Option<&str>) -> Result<Self, ConfigError> {
        let config_dir = config_dir.unwrap_or("configs");
        let settings = Config::builder()
            .add_source(File::with_name(&format!("{config_dir}/app.yaml")))
            .add_source(Environment::with_prefix("HERALD").separator("__"))
            .build()?;
        settings.try_deserialize()
    }
}
