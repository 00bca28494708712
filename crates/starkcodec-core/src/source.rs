//! Contracts for the external collaborators the decoder and resolver consume.
//!
//! Concrete in-memory implementations live in `starkcodec-registry`; RPC- or
//! database-backed ones belong to the embedding indexer.

use crate::abi::AbiEntry;
use crate::error::CollaboratorError;
use crate::felt::Felt;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A historical block, by height or by hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockId {
    Number(u64),
    Hash(Felt),
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockId::Number(n) => write!(f, "#{n}"),
            BlockId::Hash(h) => write!(f, "{h}"),
        }
    }
}

/// Case-insensitive substring match, the equivalent of SQL `LIKE '%needle%'`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NamePattern(String);

impl NamePattern {
    pub fn new(needle: impl Into<String>) -> Self {
        Self(needle.into().to_lowercase())
    }

    pub fn matches(&self, name: &str) -> bool {
        name.to_lowercase().contains(&self.0)
    }

    pub fn needle(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}%", self.0)
    }
}

/// Transaction types the constructor query can filter on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Deploy,
    DeployAccount,
    Invoke,
    Declare,
    L1Handler,
}

/// "Most recent event argument matching {contract, event, name pattern,
/// type, block ≤ N}", ordered by block height descending, limit 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventArgumentQuery {
    pub contract_address: Felt,
    pub event_name: String,
    pub argument_pattern: NamePattern,
    pub argument_type: String,
    pub at_block: u64,
}

/// "Most recent constructor input matching {contract, transaction type,
/// name pattern, type, block ≤ N}", ordered by block height descending, limit 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstructorInputQuery {
    pub contract_address: Felt,
    pub transaction_type: TransactionType,
    pub input_pattern: NamePattern,
    pub input_type: String,
    pub at_block: u64,
}

/// Fetches unclassified ABIs by contract address or class hash.
#[async_trait]
pub trait AbiSource: Send + Sync {
    /// `Ok(None)` means the contract has no published ABI; that is not an error.
    async fn get_abi(&self, address_or_class_hash: &Felt)
        -> Result<Option<Vec<AbiEntry>>, CollaboratorError>;
}

/// Evaluates read-only entrypoints against historical state.
#[async_trait]
pub trait ViewCallEvaluator: Send + Sync {
    /// Must report a missing entrypoint or revert distinctly from an unknown block.
    async fn call(
        &self,
        contract_address: &Felt,
        entrypoint: &str,
        block: &BlockId,
    ) -> Result<Vec<Felt>, CollaboratorError>;
}

/// Read-only historical lookups over previously ingested events and deploys.
#[async_trait]
pub trait HistoricalQuery: Send + Sync {
    async fn latest_event_argument(
        &self,
        query: &EventArgumentQuery,
    ) -> Result<Option<Felt>, CollaboratorError>;

    async fn latest_constructor_input(
        &self,
        query: &ConstructorInputQuery,
    ) -> Result<Option<Felt>, CollaboratorError>;
}
