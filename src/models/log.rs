//! The raw EVM log as delivered by a chain subscription.

use alloy::{
    primitives::{Address, B256, Bytes},
    rpc::types::Log as AlloyLog,
};
use serde::{Deserialize, Serialize};

/// Newtype over the alloy RPC log so the rest of the crate does not depend
/// on the provider's wire type directly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Log(pub AlloyLog);

impl Log {
    /// Address of the contract that emitted the log.
    pub fn address(&self) -> Address {
        self.0.address()
    }

    /// All topics of the log. The first one is the event selector unless the
    /// event is anonymous.
    pub fn topics(&self) -> &[B256] {
        self.0.topics()
    }

    /// The selector topic, if the log carries any topics at all.
    pub fn topic0(&self) -> Option<&B256> {
        self.topics().first()
    }

    /// ABI encoded non-indexed parameters.
    pub fn data(&self) -> &Bytes {
        &self.0.data().data
    }

    /// Block number, `None` for pending logs.
    pub fn block_number(&self) -> Option<u64> {
        self.0.block_number
    }

    /// Transaction hash, `None` for pending logs.
    pub fn transaction_hash(&self) -> Option<B256> {
        self.0.transaction_hash
    }

    /// Position of the log in its block, `None` for pending logs.
    pub fn log_index(&self) -> Option<u64> {
        self.0.log_index
    }

    /// `true` when the node retracted the log because of a reorg.
    pub fn removed(&self) -> bool {
        self.0.removed
    }
}

impl From<AlloyLog> for Log {
    fn from(log: AlloyLog) -> Self {
        Self(log)
    }
}
