//! Access to the chain: log subscriptions and block lookups.

pub mod traits;
pub mod ws;

pub use traits::{ChainClient, ChainClientError, LogStream};
pub use ws::{WsChainClient, create_ws_provider};
