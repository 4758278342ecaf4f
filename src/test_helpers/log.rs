//! A builder for creating `Log` instances for testing.

use crate::models::Log;
use alloy::{
    dyn_abi::DynSolValue,
    primitives::{Address, B256, Bytes, LogData, U256, keccak256},
    rpc::types::Log as AlloyLog,
};

/// A builder for creating `Log` instances for testing.
#[derive(Debug, Clone, Default)]
pub struct LogBuilder {
    address: Address,
    topics: Vec<B256>,
    data: Bytes,
    transaction_hash: Option<B256>,
    block_number: Option<u64>,
    log_index: Option<u64>,
    removed: bool,
}

impl LogBuilder {
    /// Creates a new `LogBuilder`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the address of the contract that emitted the log.
    pub fn address(mut self, address: Address) -> Self {
        self.address = address;
        self
    }

    /// Adds a topic to the log.
    pub fn topic(mut self, topic: B256) -> Self {
        self.topics.push(topic);
        self
    }

    /// Sets the topics of the log.
    pub fn topics(mut self, topics: Vec<B256>) -> Self {
        self.topics = topics;
        self
    }

    /// Sets the data of the log.
    pub fn data(mut self, data: Bytes) -> Self {
        self.data = data;
        self
    }

    /// Sets the transaction hash of the log.
    pub fn transaction_hash(mut self, hash: B256) -> Self {
        self.transaction_hash = Some(hash);
        self
    }

    /// Sets the block number of the log.
    pub fn block_number(mut self, number: u64) -> Self {
        self.block_number = Some(number);
        self
    }

    /// Sets the log index of the log.
    pub fn log_index(mut self, index: u64) -> Self {
        self.log_index = Some(index);
        self
    }

    /// Sets the removed status of the log.
    pub fn removed(mut self, removed: bool) -> Self {
        self.removed = removed;
        self
    }

    /// Fills in an ERC-20 `Transfer(from, to, value)` for `token`, mined in
    /// block 100 with log index 0 unless overridden afterwards.
    pub fn erc20_transfer(token: Address, from: Address, to: Address, value: U256) -> Self {
        Self::new()
            .address(token)
            .topic(keccak256("Transfer(address,address,uint256)"))
            .topic(from.into_word())
            .topic(to.into_word())
            .data(DynSolValue::Uint(value, 256).abi_encode().into())
            .block_number(100)
            .transaction_hash(B256::repeat_byte(0xaa))
            .log_index(0)
    }

    /// Builds the `Log` with the provided values.
    pub fn build(self) -> Log {
        AlloyLog {
            inner: alloy::primitives::Log {
                address: self.address,
                data: LogData::new_unchecked(self.topics, self.data),
            },
            transaction_hash: self.transaction_hash,
            transaction_index: None,
            block_hash: None,
            block_number: self.block_number,
            log_index: self.log_index,
            removed: self.removed,
            block_timestamp: None,
        }
        .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{address, b256};

    #[test]
    fn test_erc20_transfer_preset() {
        let token = address!("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");
        let log = LogBuilder::erc20_transfer(token, Address::ZERO, Address::ZERO, U256::from(5u64))
            .log_index(9)
            .build();

        assert_eq!(log.address(), token);
        assert_eq!(log.topics().len(), 3);
        assert_eq!(log.data().len(), 32);
        assert_eq!(log.block_number(), Some(100));
        assert_eq!(log.log_index(), Some(9));
    }

    #[test]
    fn test_log_builder() {
        let log = LogBuilder::new()
            .address(address!("1111111111111111111111111111111111111111"))
            .topic(b256!(
                "2222222222222222222222222222222222222222222222222222222222222222"
            ))
            .data(Bytes::from(vec![0xde, 0xad, 0xbe, 0xef]))
            .build();

        assert_eq!(
            log.address(),
            address!("1111111111111111111111111111111111111111")
        );
        assert_eq!(log.topics().len(), 1);
        assert_eq!(
            log.topics()[0],
            b256!("2222222222222222222222222222222222222222222222222222222222222222")
        );
        assert_eq!(*log.data(), Bytes::from(vec![0xde, 0xad, 0xbe, 0xef]));
    }
}
