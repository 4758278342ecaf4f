use serde::Deserialize;

/// Configuration for the rule API server.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Whether to serve the API at all.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Address and port to listen on.
    #[serde(default = "default_listen_address")]
    pub listen_address: String,

    /// Bearer token required by write endpoints. Falls back to the
    /// `HERALD_API_KEY` environment variable; unset leaves them open.
    #[serde(default = "default_api_key_from_env")]
    pub api_key: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { enabled: default_enabled(), listen_address: default_listen_address(), api_key: default_api_key_from_env() }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_listen_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_api_key_from_env() -> Option<String> {
    std::env::var("HERALD_API_KEY").ok().filter(|key| !key.is_empty())
}
