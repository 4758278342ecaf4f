//! Decodes raw logs into [`DecodedEvent`]s.

use alloy::{
    dyn_abi::{self, DynSolType, DynSolValue},
    primitives::{Address, B256, I256, U256},
};
use thiserror::Error;

use super::ContractInterface;
use crate::models::{DecodedEvent, FieldValue, Log};

/// Errors raised while decoding a log.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// The log has no topics, so the event cannot be identified.
    #[error("Log has no topics, cannot identify event")]
    MalformedLog,

    /// Topic-0 does not match any event of the interface.
    #[error("Event signature not found in contract interface: {0}")]
    UnknownEvent(B256),

    /// The log carries fewer topics than the event declares indexed params.
    #[error("Log for event '{event}' is missing the topic of indexed parameter '{param}'")]
    MissingTopic {
        /// Event name.
        event: String,
        /// Parameter lacking a topic.
        param: String,
    },

    /// The decoded data section holds fewer values than declared.
    #[error("Data of event '{event}' has no value for parameter '{param}'")]
    MissingValue {
        /// Event name.
        event: String,
        /// Parameter lacking a value.
        param: String,
    },

    /// The data section does not decode as the non-indexed parameters.
    #[error("Failed to decode data of event '{event}': {source}")]
    Data {
        /// Event name.
        event: String,
        /// Underlying ABI decoder error.
        #[source]
        source: dyn_abi::Error,
    },
}

/// Decodes `log` against `interface`.
///
/// Non-indexed parameters are ABI-decoded from the data section; indexed ones
/// are read from `topics[1..]` in declaration order. Indexed values of dynamic
/// or composite types are only available as their hash and are returned as
/// [`FieldValue::Topic`].
pub fn decode(log: &Log, interface: &ContractInterface) -> Result<DecodedEvent, DecodeError> {
    let selector = log.topic0().ok_or(DecodeError::MalformedLog)?;
    let event = interface.event_by_selector(selector).ok_or(DecodeError::UnknownEvent(*selector))?;

    let body_types =
        event.params.iter().filter(|param| !param.indexed).map(|param| param.ty.clone()).collect::<Vec<_>>();
    let mut body = decode_body(&body_types, log.data())
        .map_err(|source| DecodeError::Data { event: event.name.clone(), source })?
        .into_iter();
    let mut topics = log.topics()[1..].iter();

    let mut fields = Vec::with_capacity(event.params.len());
    for (index, param) in event.params.iter().enumerate() {
        let name = param.field_name(index);
        let value = if param.indexed {
            let topic = topics
                .next()
                .ok_or_else(|| DecodeError::MissingTopic { event: event.name.clone(), param: name.clone() })?;
            decode_topic(&param.ty, topic)
        } else {
            let value = body.next().ok_or_else(|| DecodeError::MissingValue { event: event.name.clone(), param: name.clone() })?;
            FieldValue::from(value)
        };
        fields.push((name, value));
    }

    tracing::trace!(event = %event.name, fields = fields.len(), "Decoded log.");

    Ok(DecodedEvent { name: event.name.clone(), fields, source_contract: log.address(), log: log.clone() })
}

fn decode_body(types: &[DynSolType], data: &[u8]) -> Result<Vec<DynSolValue>, dyn_abi::Error> {
    if types.is_empty() {
        return Ok(Vec::new());
    }
    match DynSolType::Tuple(types.to_vec()).abi_decode_params(data)? {
        DynSolValue::Tuple(values) => Ok(values),
        other => Ok(vec![other]),
    }
}

fn decode_topic(ty: &DynSolType, topic: &B256) -> FieldValue {
    match ty {
        DynSolType::Address => FieldValue::Address(Address::from_word(*topic)),
        DynSolType::Uint(_) => FieldValue::Uint(U256::from_be_bytes(topic.0)),
        DynSolType::Int(_) => FieldValue::Int(I256::from_raw(U256::from_be_bytes(topic.0))),
        DynSolType::Bool => FieldValue::Bool(!topic.is_zero()),
        _ => FieldValue::Topic(*topic),
    }
}
