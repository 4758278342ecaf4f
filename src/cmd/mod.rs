//! Command line subcommands other than `run`.

pub mod decode;

pub use decode::DecodeArgs;
