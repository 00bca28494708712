use starkcodec_core::error::DecodeError;
use thiserror::Error;

/// Errors raised while loading ABIs or history snapshots from disk.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("ABI file {path}: {source}")]
    Abi {
        path: String,
        #[source]
        source: DecodeError,
    },

    #[error("Cannot derive a contract address from file name {path}")]
    BadFileName { path: String },

    #[error("Snapshot parse error: {0}")]
    Snapshot(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
