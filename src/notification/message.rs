//! Renders the chat message for a matched event.

use alloy::hex;
use chrono::{DateTime, Utc};

use crate::models::DecodedEvent;

/// Renders the fixed notification template.
///
/// The text uses `*bold*` markers understood by both Telegram and Discord;
/// adapters escape it for their own dialect. Every field sits on its own
/// line; line breaks inside values are flattened to spaces.
pub fn render_message(event: &DecodedEvent, block_timestamp: DateTime<Utc>) -> String {
    let block = event.log.block_number().map(|n| n.to_string()).unwrap_or_else(|| "pending".to_string());
    let tx_hash = event.log.transaction_hash().map(hex::encode_prefixed).unwrap_or_else(|| "pending".to_string());

    let mut message = format!(
        "*New Event Detected*\n\n*Event:* {}\n*Contract:* {}\n*Block:* {}\n*Timestamp:* {}\n*Tx Hash:* {}\n\n*Parameters:*\n",
        event.name,
        event.source_contract.to_checksum(None),
        block,
        block_timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
        tx_hash,
    );
    for (name, value) in &event.fields {
        let value = value.to_string().replace(['\r', '\n'], " ");
        message.push_str(&format!("- *{name}:* {value}\n"));
    }
    message
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{B256, U256, address};

    use super::*;
    use crate::{
        abi::decode,
        models::FieldValue,
        test_helpers::{LogBuilder, erc20_interface},
    };

    #[test]
    fn test_render_transfer() {
        let log = LogBuilder::erc20_transfer(
            address!("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48"),
            address!("d8da6bf26964af9d7eed9e03e53415d37aa96045"),
            address!("2222222222222222222222222222222222222222"),
            U256::from(1000u64),
        )
        .block_number(19_000_000)
        .transaction_hash(B256::repeat_byte(0x11))
        .build();
        let event = decode(&log, &erc20_interface()).unwrap();
        let timestamp = DateTime::from_timestamp(1_700_000_000, 0).unwrap();

        let expected = format!(
            "*New Event Detected*\n\n\
             *Event:* Transfer\n\
             *Contract:* 0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48\n\
             *Block:* 19000000\n\
             *Timestamp:* 2023-11-14 22:13:20 UTC\n\
             *Tx Hash:* 0x{}\n\n\
             *Parameters:*\n\
             - *from:* 0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045\n\
             - *to:* 0x2222222222222222222222222222222222222222\n\
             - *value:* 1000\n",
            "11".repeat(32)
        );
        assert_eq!(render_message(&event, timestamp), expected);
    }

    #[test]
    fn test_render_flattens_multiline_values() {
        let log = LogBuilder::erc20_transfer(
            address!("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48"),
            address!("1111111111111111111111111111111111111111"),
            address!("2222222222222222222222222222222222222222"),
            U256::from(1u64),
        )
        .build();
        let mut event = decode(&log, &erc20_interface()).unwrap();
        event.fields = vec![("memo".to_string(), FieldValue::String("gm\n*Block:* 1".to_string()))];

        let message = render_message(&event, DateTime::from_timestamp(0, 0).unwrap());
        assert!(message.ends_with("*Parameters:*\n- *memo:* gm *Block:* 1\n"));
    }
}
