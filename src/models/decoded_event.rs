//! Typed representation of a decoded contract event.

use std::fmt;

use alloy::{
    dyn_abi::DynSolValue,
    hex,
    primitives::{Address, B256, Bytes, I256, U256},
};
use serde::{Serialize, Serializer, ser::SerializeSeq};

use super::Log;

/// A single decoded event parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// A 20-byte account or contract address.
    Address(Address),
    /// Any unsigned integer width up to 256 bits.
    Uint(U256),
    /// Any signed integer width up to 256 bits.
    Int(I256),
    /// A boolean.
    Bool(bool),
    /// A UTF-8 string decoded from log data.
    String(String),
    /// Dynamic bytes decoded from log data.
    Bytes(Bytes),
    /// A `bytesN` value decoded from log data.
    FixedBytes(Vec<u8>),
    /// The raw topic word of an indexed parameter whose value cannot be
    /// recovered from the topic (strings, bytes, arrays and tuples are stored
    /// as their keccak-256 hash).
    Topic(B256),
    /// Arrays and tuples decoded from log data.
    List(Vec<FieldValue>),
}

impl From<DynSolValue> for FieldValue {
    fn from(value: DynSolValue) -> Self {
        match value {
            DynSolValue::Address(address) => Self::Address(address),
            DynSolValue::Bool(b) => Self::Bool(b),
            DynSolValue::Uint(u, _) => Self::Uint(u),
            DynSolValue::Int(i, _) => Self::Int(i),
            DynSolValue::String(s) => Self::String(s),
            DynSolValue::Bytes(b) => Self::Bytes(b.into()),
            DynSolValue::FixedBytes(word, size) => Self::FixedBytes(word[..size].to_vec()),
            DynSolValue::Function(function) => Self::FixedBytes(function.as_slice().to_vec()),
            DynSolValue::Array(values) | DynSolValue::FixedArray(values) | DynSolValue::Tuple(values) => {
                Self::List(values.into_iter().map(Self::from).collect())
            }
            #[allow(unreachable_patterns)]
            other => Self::String(format!("{other:?}")),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Address(address) => f.write_str(&address.to_checksum(None)),
            Self::Uint(u) => write!(f, "{u}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::String(s) => f.write_str(s),
            Self::Bytes(b) => f.write_str(&hex::encode_prefixed(b)),
            Self::FixedBytes(b) => f.write_str(&hex::encode_prefixed(b)),
            Self::Topic(t) => f.write_str(&hex::encode_prefixed(t)),
            Self::List(values) => {
                f.write_str("[")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{value}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::String(s) => serializer.serialize_str(s),
            Self::List(values) => {
                let mut seq = serializer.serialize_seq(Some(values.len()))?;
                for value in values {
                    seq.serialize_element(value)?;
                }
                seq.end()
            }
            // Integers are rendered as decimal strings since they routinely
            // exceed the precision of a JSON number.
            other => serializer.serialize_str(&other.to_string()),
        }
    }
}

/// An event decoded from a [`Log`] against a contract interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedEvent {
    /// Event name as declared in the ABI.
    pub name: String,
    /// Parameters in declaration order.
    pub fields: Vec<(String, FieldValue)>,
    /// The emitting contract.
    pub source_contract: Address,
    /// The log this event was decoded from.
    pub log: Log,
}

impl DecodedEvent {
    /// Looks a parameter up by name.
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(field, _)| field == name).map(|(_, value)| value)
    }

    /// The parameters as a JSON object, suitable for persisting.
    pub fn fields_json(&self) -> serde_json::Value {
        let map = self
            .fields
            .iter()
            .map(|(name, value)| (name.clone(), serde_json::to_value(value).unwrap_or(serde_json::Value::Null)))
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(map)
    }
}
