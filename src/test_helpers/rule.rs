//! A builder for rules and rule requests.

use alloy::primitives::Address;
use chrono::Utc;

use crate::models::{AdapterKind, Rule, RuleConfig, rule::normalize_address};

/// Builds [`Rule`]s and [`RuleConfig`]s with sensible defaults: an active
/// Discord rule on `Transfer(address,address,uint256)`.
#[derive(Debug, Clone)]
pub struct RuleBuilder {
    id: i64,
    contract: Address,
    event_signature: String,
    chain: String,
    filters: Option<serde_json::Value>,
    adapter: AdapterKind,
    adapter_value: String,
    active: bool,
}

impl RuleBuilder {
    /// Starts a rule for `contract`.
    pub fn new(contract: Address) -> Self {
        Self {
            id: 1,
            contract,
            event_signature: "Transfer(address,address,uint256)".to_string(),
            chain: "ethereum".to_string(),
            filters: None,
            adapter: AdapterKind::Discord,
            adapter_value: "https://discord.example/webhook".to_string(),
            active: true,
        }
    }

    /// Sets the rule id used by [`build`](Self::build).
    pub fn id(mut self, id: i64) -> Self {
        self.id = id;
        self
    }

    /// Sets the watched event signature.
    pub fn event_signature(mut self, signature: &str) -> Self {
        self.event_signature = signature.to_string();
        self
    }

    /// Sets the filter document.
    pub fn filters(mut self, filters: serde_json::Value) -> Self {
        self.filters = Some(filters);
        self
    }

    /// Sets the delivery channel and destination.
    pub fn adapter(mut self, adapter: AdapterKind, value: &str) -> Self {
        self.adapter = adapter;
        self.adapter_value = value.to_string();
        self
    }

    /// Sets whether the rule is active.
    pub fn active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// The request body a client would send to create this rule.
    pub fn config(self) -> RuleConfig {
        RuleConfig {
            contract_address: normalize_address(&self.contract),
            event_signature: self.event_signature,
            chain: self.chain,
            filters: self.filters,
            adapter: self.adapter,
            adapter_value: self.adapter_value,
            active: self.active,
        }
    }

    /// A rule as if it had been stored.
    pub fn build(self) -> Rule {
        let now = Utc::now();
        Rule {
            id: self.id,
            contract_address: normalize_address(&self.contract),
            event_signature: self.event_signature,
            chain: self.chain,
            filters: self.filters,
            adapter: self.adapter,
            adapter_value: self.adapter_value,
            active: self.active,
            created_at: now,
            updated_at: now,
        }
    }
}
