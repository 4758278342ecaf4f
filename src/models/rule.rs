//! Notification rules: which contract event to watch and where to relay it.

use std::{fmt, str::FromStr};

use alloy::{
    json_abi::Event,
    primitives::{Address, B256, keccak256},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The chat channel a rule delivers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdapterKind {
    /// Telegram bot message to a chat or channel id.
    Telegram,
    /// Discord webhook.
    Discord,
}

impl AdapterKind {
    /// The stored representation of the adapter kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Telegram => "telegram",
            Self::Discord => "discord",
        }
    }
}

impl fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdapterKind {
    type Err = RuleValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "telegram" => Ok(Self::Telegram),
            "discord" => Ok(Self::Discord),
            other => Err(RuleValidationError::UnknownAdapter(other.to_string())),
        }
    }
}

/// A persisted notification rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Unique identifier assigned by the store.
    pub id: i64,
    /// Lower-case hex address of the watched contract.
    pub contract_address: String,
    /// Canonical event signature, e.g. `Transfer(address,address,uint256)`.
    pub event_signature: String,
    /// Free-form chain label.
    pub chain: String,
    /// Opaque filter document. Stored and returned, never evaluated.
    pub filters: Option<serde_json::Value>,
    /// Delivery channel.
    pub adapter: AdapterKind,
    /// Channel destination: a Telegram chat id or a Discord webhook URL.
    pub adapter_value: String,
    /// Inactive rules are never subscribed nor matched.
    pub active: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl Rule {
    /// The topic-0 value logs of this rule's event carry.
    pub fn topic0(&self) -> B256 {
        keccak256(self.event_signature.as_bytes())
    }

    /// Parses the stored contract address.
    pub fn contract(&self) -> Result<Address, RuleValidationError> {
        parse_address(&self.contract_address)
    }
}

/// The fields a client supplies to create a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Contract address, any hex casing.
    pub contract_address: String,
    /// Event signature, either canonical or human readable
    /// (`event Transfer(address indexed from, ...)`).
    pub event_signature: String,
    /// Free-form chain label.
    pub chain: String,
    /// Opaque filter document.
    #[serde(default)]
    pub filters: Option<serde_json::Value>,
    /// Delivery channel.
    pub adapter: AdapterKind,
    /// Channel destination.
    pub adapter_value: String,
    /// Defaults to `false`.
    #[serde(default)]
    pub active: bool,
}

impl RuleConfig {
    /// Validates the rule and normalizes the address to lower case and the
    /// signature to its canonical form.
    pub fn validate(mut self) -> Result<Self, RuleValidationError> {
        let address = parse_address(&self.contract_address)?;
        self.contract_address = normalize_address(&address);

        let event = Event::parse(self.event_signature.trim()).map_err(|e| {
            RuleValidationError::InvalidEventSignature { signature: self.event_signature.clone(), reason: e.to_string() }
        })?;
        if event.anonymous {
            return Err(RuleValidationError::AnonymousEvent(self.event_signature));
        }
        self.event_signature = event.signature();

        self.chain = self.chain.trim().to_string();
        if self.chain.is_empty() {
            return Err(RuleValidationError::EmptyChain);
        }

        self.adapter_value = self.adapter_value.trim().to_string();
        if self.active && self.adapter_value.is_empty() {
            return Err(RuleValidationError::EmptyAdapterValue);
        }

        Ok(self)
    }
}

/// Reasons a rule is refused.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RuleValidationError {
    /// The contract address is not a 20-byte hex string.
    #[error("Invalid contract address: {0}")]
    InvalidContractAddress(String),

    /// The event signature cannot be parsed.
    #[error("Invalid event signature '{signature}': {reason}")]
    InvalidEventSignature {
        /// The rejected signature.
        signature: String,
        /// Parser message.
        reason: String,
    },

    /// Anonymous events carry no selector topic and cannot be watched.
    #[error("Anonymous events cannot be watched: {0}")]
    AnonymousEvent(String),

    /// The chain label is blank.
    #[error("Chain must not be empty")]
    EmptyChain,

    /// An active rule has no destination.
    #[error("adapter_value must not be empty for an active rule")]
    EmptyAdapterValue,

    /// An adapter kind outside the supported set.
    #[error("Unknown adapter: {0}")]
    UnknownAdapter(String),
}

/// Lower-case `0x` hex, the form rules are stored and queried with.
pub fn normalize_address(address: &Address) -> String {
    address.to_string().to_lowercase()
}

fn parse_address(raw: &str) -> Result<Address, RuleValidationError> {
    Address::from_str(raw.trim()).map_err(|_| RuleValidationError::InvalidContractAddress(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::b256;

    fn config(signature: &str) -> RuleConfig {
        RuleConfig {
            contract_address: "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48".to_string(),
            event_signature: signature.to_string(),
            chain: "ethereum".to_string(),
            filters: None,
            adapter: AdapterKind::Discord,
            adapter_value: "https://discord.example/webhook".to_string(),
            active: true,
        }
    }

    #[test]
    fn test_validate_normalizes_address_and_signature() {
        let rule = config("event Transfer(address indexed from, address indexed to, uint256 value)")
            .validate()
            .unwrap();

        assert_eq!(rule.contract_address, "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");
        assert_eq!(rule.event_signature, "Transfer(address,address,uint256)");
    }

    #[test]
    fn test_validate_rejects_bad_input() {
        let mut bad_address = config("Transfer(address,address,uint256)");
        bad_address.contract_address = "0x1234".to_string();
        assert!(matches!(bad_address.validate(), Err(RuleValidationError::InvalidContractAddress(_))));

        assert!(matches!(
            config("Transfer(address,").validate(),
            Err(RuleValidationError::InvalidEventSignature { .. })
        ));

        let mut no_destination = config("Transfer(address,address,uint256)");
        no_destination.adapter_value = "  ".to_string();
        assert_eq!(no_destination.validate(), Err(RuleValidationError::EmptyAdapterValue));
    }

    #[test]
    fn test_inactive_rule_may_have_empty_destination() {
        let mut rule = config("Transfer(address,address,uint256)");
        rule.active = false;
        rule.adapter_value = String::new();
        assert!(rule.validate().is_ok());
    }

    #[test]
    fn test_active_defaults_to_false() {
        let body = r#"{
            "contract_address": "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48",
            "event_signature": "Transfer(address,address,uint256)",
            "chain": "ethereum",
            "adapter": "telegram",
            "adapter_value": "-100123"
        }"#;
        let config: RuleConfig = serde_json::from_str(body).unwrap();
        assert!(!config.active);
        assert!(config.filters.is_none());
        assert_eq!(config.adapter, AdapterKind::Telegram);
    }

    #[test]
    fn test_rule_topic0() {
        let rule = Rule {
            id: 1,
            contract_address: "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48".to_string(),
            event_signature: "Transfer(address,address,uint256)".to_string(),
            chain: "ethereum".to_string(),
            filters: None,
            adapter: AdapterKind::Discord,
            adapter_value: "x".to_string(),
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        assert_eq!(rule.topic0(), b256!("ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"));
    }

    #[test]
    fn test_adapter_kind_from_str() {
        assert_eq!("Discord".parse::<AdapterKind>(), Ok(AdapterKind::Discord));
        assert_eq!(
            "slack".parse::<AdapterKind>(),
            Err(RuleValidationError::UnknownAdapter("slack".to_string()))
        );
    }
}
