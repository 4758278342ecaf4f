//! `herald decode`: decodes a single log offline against an ABI file.

use std::path::PathBuf;

use alloy::{
    primitives::{Address, B256, Bytes, LogData},
    rpc::types::Log as AlloyLog,
};
use clap::Parser;
use serde_json::json;
use thiserror::Error;

use crate::{
    abi::{AbiLoader, AbiLoaderError, DecodeError, decode},
    models::Log,
};

/// Errors of the decode subcommand.
#[derive(Error, Debug)]
pub enum Error {
    /// The ABI file could not be loaded.
    #[error("ABI loading error: {0}")]
    Abi(#[from] AbiLoaderError),
    /// The log does not decode against the ABI.
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),
    /// The result could not be printed.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Arguments of `herald decode`.
#[derive(Parser, Debug)]
pub struct DecodeArgs {
    /// Path to the JSON ABI file.
    #[arg(long)]
    abi: PathBuf,
    /// Address of the emitting contract.
    #[arg(long, default_value_t = Address::ZERO)]
    address: Address,
    /// Log topics, topic-0 first.
    #[arg(long, num_args = 1..)]
    topics: Vec<B256>,
    /// Hex-encoded log data.
    #[arg(long, default_value = "0x")]
    data: Bytes,
}

/// Decodes the log described by `args` and returns it as JSON.
pub fn decode_to_json(args: &DecodeArgs) -> Result<serde_json::Value, Error> {
    let interface = AbiLoader::new(&args.abi).load()?;
    let log: Log = AlloyLog {
        inner: alloy::primitives::Log {
            address: args.address,
            data: LogData::new_unchecked(args.topics.clone(), args.data.clone()),
        },
        ..Default::default()
    }
    .into();

    let event = decode(&log, &interface)?;
    Ok(json!({
        "event": event.name,
        "contract": event.source_contract.to_checksum(None),
        "fields": event.fields_json(),
    }))
}

/// Runs the subcommand, printing the decoded event to stdout.
pub fn execute(args: DecodeArgs) -> Result<(), Error> {
    let decoded = decode_to_json(&args)?;
    println!("{}", serde_json::to_string_pretty(&decoded)?);
    Ok(())
}
