#![warn(missing_docs)]
//! Herald watches EVM contract events, matches them against user-defined rules
//! and relays a notification for every match to Telegram or Discord.

pub mod abi;
pub mod cmd;
pub mod config;
pub mod engine;
pub mod http_client;
pub mod http_server;
pub mod models;
pub mod notification;
pub mod persistence;
pub mod providers;
pub mod subscription;
pub mod supervisor;
pub mod test_helpers;
