//! ABI fixtures.

use crate::abi::ContractInterface;

/// The ERC-20 ABI shipped under `abis/`.
pub fn erc20_abi_json() -> &'static str {
    include_str!("../../abis/erc20.json")
}

/// The ERC-20 ABI parsed into a [`ContractInterface`].
pub fn erc20_interface() -> ContractInterface {
    match ContractInterface::parse(erc20_abi_json()) {
        Ok(interface) => interface,
        Err(e) => panic!("bundled ERC-20 ABI is invalid: {e}"),
    }
}
