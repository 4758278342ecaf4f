//! Contract interface registry.
//!
//! The interface is parsed from a JSON ABI at runtime, so the `sol!` macro
//! cannot be used; parameter types are resolved into [`DynSolType`]s once at
//! load time and the event table is immutable afterwards.

pub mod decoder;
pub mod loader;

use std::collections::HashMap;

use alloy::{
    dyn_abi::{DynSolType, Specifier},
    json_abi::{ContractObject, Event, JsonAbi},
    primitives::B256,
};
use thiserror::Error;

pub use decoder::{DecodeError, decode};
pub use loader::{AbiLoader, AbiLoaderError};

/// Errors raised while building a [`ContractInterface`].
#[derive(Error, Debug)]
pub enum AbiError {
    /// The document is not valid JSON or contains malformed ABI items.
    #[error("Failed to parse contract interface: {0}")]
    Parse(#[from] serde_json::Error),

    /// A build artifact object was given but it carries no `abi` field.
    #[error("Contract artifact has no ABI")]
    MissingAbi,

    /// A parameter type could not be resolved.
    #[error("Invalid type '{ty}' for parameter '{param}' of event '{event}': {reason}")]
    InvalidType {
        /// Event name.
        event: String,
        /// Parameter name.
        param: String,
        /// Declared type.
        ty: String,
        /// Resolver message.
        reason: String,
    },
}

/// One declared event parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventParam {
    /// Declared name, possibly empty.
    pub name: String,
    /// Resolved Solidity type.
    pub ty: DynSolType,
    /// Whether the value lives in a topic instead of the data section.
    pub indexed: bool,
}

impl EventParam {
    /// The name used for this parameter in decoded output. Unnamed parameters
    /// are called `param{index}`.
    pub fn field_name(&self, index: usize) -> String {
        if self.name.is_empty() { format!("param{index}") } else { self.name.clone() }
    }
}

/// An event declared by the contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDescriptor {
    /// Event name.
    pub name: String,
    /// Canonical signature, e.g. `Transfer(address,address,uint256)`.
    pub signature: String,
    /// keccak-256 of the signature, carried as topic-0.
    pub selector: B256,
    /// Anonymous events have no selector topic.
    pub anonymous: bool,
    /// Parameters in declaration order.
    pub params: Vec<EventParam>,
}

impl EventDescriptor {
    fn from_event(event: &Event) -> Result<Self, AbiError> {
        let params = event
            .inputs
            .iter()
            .map(|input| {
                let ty = input.resolve().map_err(|e| AbiError::InvalidType {
                    event: event.name.clone(),
                    param: input.name.clone(),
                    ty: input.ty.clone(),
                    reason: e.to_string(),
                })?;
                Ok(EventParam { name: input.name.clone(), ty, indexed: input.indexed })
            })
            .collect::<Result<Vec<_>, AbiError>>()?;

        Ok(Self {
            name: event.name.clone(),
            signature: event.signature(),
            selector: event.selector(),
            anonymous: event.anonymous,
            params,
        })
    }
}

/// The events of one contract, indexed by selector.
///
/// Events are held in name order; overloads of one name keep their declared
/// order, so on a duplicate selector the first declared event wins.
#[derive(Debug, Clone, Default)]
pub struct ContractInterface {
    events: Vec<EventDescriptor>,
    by_selector: HashMap<B256, usize>,
}

impl ContractInterface {
    /// Parses a JSON ABI. Accepts either the bare ABI array or a build
    /// artifact object carrying an `abi` field.
    pub fn parse(raw: &str) -> Result<Self, AbiError> {
        let abi = if raw.trim_start().starts_with('{') {
            let artifact: ContractObject = serde_json::from_str(raw)?;
            artifact.abi.ok_or(AbiError::MissingAbi)?
        } else {
            serde_json::from_str::<JsonAbi>(raw)?
        };
        Self::from_json_abi(&abi)
    }

    /// Builds the interface from an already parsed ABI.
    pub fn from_json_abi(abi: &JsonAbi) -> Result<Self, AbiError> {
        let mut interface = Self::default();
        for event in abi.events() {
            let descriptor = EventDescriptor::from_event(event)?;
            if !descriptor.anonymous {
                let index = interface.events.len();
                interface.by_selector.entry(descriptor.selector).or_insert(index);
            }
            interface.events.push(descriptor);
        }

        tracing::debug!(
            events = interface.events.len(),
            selectors = interface.by_selector.len(),
            "Contract interface loaded."
        );
        Ok(interface)
    }

    /// Looks an event up by its topic-0 selector. Anonymous events are never
    /// returned.
    pub fn event_by_selector(&self, selector: &B256) -> Option<&EventDescriptor> {
        self.by_selector.get(selector).map(|&index| &self.events[index])
    }

    /// Looks an event up by name. Overloads resolve to the first one.
    pub fn event(&self, name: &str) -> Option<&EventDescriptor> {
        self.events.iter().find(|event| event.name == name)
    }

    /// All events.
    pub fn events(&self) -> &[EventDescriptor] {
        &self.events
    }

    /// Number of declared events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// `true` when the ABI declares no events.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
