//! Loads the contract interface document from disk.

use std::{fs, path::PathBuf};

use thiserror::Error;

use super::{AbiError, ContractInterface};

/// Errors that can occur while loading an ABI file.
#[derive(Debug, Error)]
pub enum AbiLoaderError {
    /// The file could not be read.
    #[error("Failed to read ABI file '{path}': {source}")]
    Io {
        /// The path to the ABI file.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file content is not a usable ABI.
    #[error("Failed to parse ABI file '{path}': {source}")]
    Parse {
        /// The path to the ABI file.
        path: PathBuf,
        /// The underlying parse error.
        #[source]
        source: AbiError,
    },
}

/// Reads and parses a JSON ABI file.
pub struct AbiLoader {
    path: PathBuf,
}

impl AbiLoader {
    /// Creates a loader for `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Loads the file into a [`ContractInterface`].
    pub fn load(&self) -> Result<ContractInterface, AbiLoaderError> {
        let content =
            fs::read_to_string(&self.path).map_err(|e| AbiLoaderError::Io { path: self.path.clone(), source: e })?;

        let interface = ContractInterface::parse(&content)
            .map_err(|e| AbiLoaderError::Parse { path: self.path.clone(), source: e })?;

        tracing::info!(path = %self.path.display(), events = interface.len(), "Loaded contract interface.");
        Ok(interface)
    }
}
