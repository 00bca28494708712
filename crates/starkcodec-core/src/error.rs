//! Error types for the StarkCodec decode and resolution pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors that abort a single decode call.
///
/// Only structural problems surface here. Missing schemas degrade to the
/// anonymous representation and malformed lengths become [`DecodeWarning`]s.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Unsupported ABI shape for '{field}' ({ty}): {reason}")]
    UnsupportedShape {
        field: String,
        ty: String,
        reason: String,
    },

    #[error("Calldata exhausted decoding '{field}': slot {index} requested, {len} available")]
    CalldataExhausted {
        field: String,
        index: usize,
        len: usize,
    },

    #[error("No ABI definition for {what}")]
    SchemaAbsent { what: String },

    #[error("Malformed array length for '{field}': {raw}")]
    MalformedLength { field: String, raw: String },

    #[error("Invalid ABI: {reason}")]
    InvalidAbi { reason: String },

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl DecodeError {
    pub fn unsupported(field: &str, ty: &str, reason: impl Into<String>) -> Self {
        Self::UnsupportedShape {
            field: field.to_string(),
            ty: ty.to_string(),
            reason: reason.into(),
        }
    }
}

/// Recoverable problems noticed while decoding.
///
/// These never abort a decode; they are attached to the organized output so
/// callers can tell a best-effort value from a fully schema-backed one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecodeWarning {
    /// An array length slot did not parse as an unsigned integer; length 0 was used.
    MalformedLength { field: String, raw: String },
    /// A struct type had no schema; one slot was consumed as `anonymous`.
    StructSchemaAbsent { ty: String, slot: usize },
}

impl fmt::Display for DecodeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeWarning::MalformedLength { field, raw } => {
                write!(f, "{}", DecodeError::MalformedLength { field: field.clone(), raw: raw.clone() })
            }
            DecodeWarning::StructSchemaAbsent { ty, slot } => {
                write!(f, "{} (slot {slot} read as anonymous)", DecodeError::SchemaAbsent {
                    what: format!("struct '{ty}'"),
                })
            }
        }
    }
}

/// Faults reported by external collaborators (ABI sources, view-call
/// evaluators, historical query stores).
#[derive(Debug, Error)]
pub enum CollaboratorError {
    /// The requested block is not (yet) known to the collaborator.
    #[error("Block not found: {block}")]
    BlockNotFound { block: String },

    /// The contract has no entrypoint with that name.
    #[error("Entrypoint '{entrypoint}' not found on {contract}")]
    EntrypointNotFound { contract: String, entrypoint: String },

    /// The entrypoint exists but execution reverted.
    #[error("Call to '{entrypoint}' reverted: {reason}")]
    Reverted { entrypoint: String, reason: String },

    /// Connection reset, refused, or otherwise interrupted.
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Request timed out after {ms}ms")]
    Timeout { ms: u64 },

    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("{0}")]
    Other(String),
}

impl CollaboratorError {
    /// Returns `true` if the caller may retry the same request later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::BlockNotFound { .. }
                | Self::Transport(_)
                | Self::Timeout { .. }
                | Self::RateLimited(_)
        )
    }

    /// Returns `true` if the fault means the resource genuinely does not
    /// exist, so the request should resolve to "no result".
    pub fn is_absent_resource(&self) -> bool {
        matches!(self, Self::EntrypointNotFound { .. } | Self::Reverted { .. })
    }
}

/// Errors surfaced by implementation resolution.
#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("Collaborator fault: {0}")]
    Collaborator(#[from] CollaboratorError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),
}

impl ResolutionError {
    /// Returns `true` if the ingestion driver should retry the whole resolution.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Collaborator(e) => e.is_retryable(),
            Self::Decode(_) => false,
        }
    }
}
