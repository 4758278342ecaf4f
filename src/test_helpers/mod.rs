//! A set of helpers for testing

mod abi;
mod chain_client;
mod log;
mod rule;

pub use abi::{erc20_abi_json, erc20_interface};
pub use chain_client::FakeChainClient;
pub use log::LogBuilder;
pub use rule::RuleBuilder;
