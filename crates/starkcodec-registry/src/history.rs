//! In-memory historical state: event arguments, constructor inputs and view
//! call results, each effective from a block height.
//!
//! `MemoryHistory` answers the resolver's "most recent value at block ≤ N"
//! queries; `MemoryViewCalls` evaluates getters against recorded results.
//! Both can be loaded from a JSON [`HistorySnapshot`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use starkcodec_core::{
    error::CollaboratorError,
    felt::Felt,
    source::{
        BlockId, ConstructorInputQuery, EventArgumentQuery, HistoricalQuery, TransactionType,
        ViewCallEvaluator,
    },
};
use std::{
    collections::HashMap,
    path::Path,
    sync::{Arc, PoisonError, RwLock},
};

use crate::error::RegistryError;

/// One decoded event argument, as an indexer would have stored it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventArgumentRecord {
    pub contract_address: Felt,
    pub event_name: String,
    pub argument_name: String,
    pub argument_type: String,
    pub block_number: u64,
    pub value: Felt,
}

/// One decoded constructor input of a deploy-like transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstructorInputRecord {
    pub contract_address: Felt,
    pub transaction_type: TransactionType,
    pub input_name: String,
    pub input_type: String,
    pub block_number: u64,
    pub value: Felt,
}

#[derive(Default)]
struct HistoryInner {
    events: Vec<EventArgumentRecord>,
    constructors: Vec<ConstructorInputRecord>,
}

/// `HistoricalQuery` over records held in memory.
///
/// Matching follows the query contract exactly: same contract (by felt
/// value), exact event name and type, case-insensitive `%pattern%` on the
/// argument name, `block ≤ at_block`, highest block wins. Among records at
/// the same block the one recorded last wins.
#[derive(Clone, Default)]
pub struct MemoryHistory {
    inner: Arc<RwLock<HistoryInner>>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_event_argument(
        &self,
        contract_address: &Felt,
        event_name: &str,
        argument_name: &str,
        argument_type: &str,
        block_number: u64,
        value: impl Into<Felt>,
    ) {
        self.push_event(EventArgumentRecord {
            contract_address: contract_address.clone(),
            event_name: event_name.into(),
            argument_name: argument_name.into(),
            argument_type: argument_type.into(),
            block_number,
            value: value.into(),
        });
    }

    pub fn record_constructor_input(
        &self,
        contract_address: &Felt,
        transaction_type: TransactionType,
        input_name: &str,
        input_type: &str,
        block_number: u64,
        value: impl Into<Felt>,
    ) {
        self.push_constructor(ConstructorInputRecord {
            contract_address: contract_address.clone(),
            transaction_type,
            input_name: input_name.into(),
            input_type: input_type.into(),
            block_number,
            value: value.into(),
        });
    }

    pub fn push_event(&self, record: EventArgumentRecord) {
        self.write().events.push(record);
    }

    pub fn push_constructor(&self, record: ConstructorInputRecord) {
        self.write().constructors.push(record);
    }

    pub fn len(&self) -> usize {
        let inner = self.read();
        inner.events.len() + inner.constructors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HistoryInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HistoryInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl HistoricalQuery for MemoryHistory {
    async fn latest_event_argument(&self, query: &EventArgumentQuery) -> Result<Option<Felt>, CollaboratorError> {
        Ok(self
            .read()
            .events
            .iter()
            .filter(|r| {
                r.block_number <= query.at_block
                    && r.contract_address.same_value(&query.contract_address)
                    && r.event_name == query.event_name
                    && r.argument_type == query.argument_type
                    && query.argument_pattern.matches(&r.argument_name)
            })
            .max_by_key(|r| r.block_number)
            .map(|r| r.value.clone()))
    }

    async fn latest_constructor_input(&self, query: &ConstructorInputQuery) -> Result<Option<Felt>, CollaboratorError> {
        Ok(self
            .read()
            .constructors
            .iter()
            .filter(|r| {
                r.block_number <= query.at_block
                    && r.contract_address.same_value(&query.contract_address)
                    && r.transaction_type == query.transaction_type
                    && r.input_type == query.input_type
                    && query.input_pattern.matches(&r.input_name)
            })
            .max_by_key(|r| r.block_number)
            .map(|r| r.value.clone()))
    }
}

/// A recorded getter outcome, effective from `from_block` until superseded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewCallRecord {
    pub contract_address: Felt,
    pub entrypoint: String,
    pub from_block: u64,
    #[serde(default)]
    pub result: Vec<Felt>,
    /// When set, the call reverts with this reason instead of returning `result`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revert_reason: Option<String>,
}

#[derive(Default)]
struct ViewInner {
    head: u64,
    /// (canonical contract, entrypoint) → records sorted by `from_block`
    calls: HashMap<(String, String), Vec<ViewCallRecord>>,
    /// canonical block hash → height
    block_hashes: HashMap<String, u64>,
}

/// `ViewCallEvaluator` over recorded results.
///
/// Blocks above the configured head are reported as not found (retryable);
/// entrypoints with no result effective at the block are reported as missing.
#[derive(Clone, Default)]
pub struct MemoryViewCalls {
    inner: Arc<RwLock<ViewInner>>,
}

impl MemoryViewCalls {
    pub fn new(head: u64) -> Self {
        let calls = Self::default();
        calls.set_head(head);
        calls
    }

    pub fn head(&self) -> u64 {
        self.read().head
    }

    pub fn set_head(&self, head: u64) {
        self.write().head = head;
    }

    pub fn register_block_hash(&self, hash: &Felt, number: u64) {
        self.write().block_hashes.insert(hash.canonical(), number);
    }

    /// Record what `entrypoint` returns from `from_block` onward.
    pub fn record(&self, contract_address: &Felt, entrypoint: &str, from_block: u64, result: Vec<Felt>) {
        self.push(ViewCallRecord {
            contract_address: contract_address.clone(),
            entrypoint: entrypoint.into(),
            from_block,
            result,
            revert_reason: None,
        });
    }

    /// Record that `entrypoint` reverts from `from_block` onward.
    pub fn record_revert(&self, contract_address: &Felt, entrypoint: &str, from_block: u64, reason: &str) {
        self.push(ViewCallRecord {
            contract_address: contract_address.clone(),
            entrypoint: entrypoint.into(),
            from_block,
            result: Vec::new(),
            revert_reason: Some(reason.into()),
        });
    }

    pub fn push(&self, record: ViewCallRecord) {
        let key = (record.contract_address.canonical(), record.entrypoint.clone());
        let mut inner = self.write();
        let records = inner.calls.entry(key).or_default();
        records.push(record);
        records.sort_by_key(|r| r.from_block);
    }

    fn block_number(&self, block: &BlockId) -> Result<u64, CollaboratorError> {
        let inner = self.read();
        let number = match block {
            BlockId::Number(n) => *n,
            BlockId::Hash(h) => *inner
                .block_hashes
                .get(&h.canonical())
                .ok_or_else(|| CollaboratorError::BlockNotFound { block: block.to_string() })?,
        };
        if number > inner.head {
            return Err(CollaboratorError::BlockNotFound { block: block.to_string() });
        }
        Ok(number)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, ViewInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, ViewInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ViewCallEvaluator for MemoryViewCalls {
    async fn call(&self, contract_address: &Felt, entrypoint: &str, block: &BlockId) -> Result<Vec<Felt>, CollaboratorError> {
        let number = self.block_number(block)?;
        let inner = self.read();
        let record = inner
            .calls
            .get(&(contract_address.canonical(), entrypoint.to_string()))
            .and_then(|records| records.iter().rev().find(|r| r.from_block <= number))
            .ok_or_else(|| CollaboratorError::EntrypointNotFound {
                contract: contract_address.to_string(),
                entrypoint: entrypoint.to_string(),
            })?;
        match &record.revert_reason {
            Some(reason) => Err(CollaboratorError::Reverted {
                entrypoint: entrypoint.to_string(),
                reason: reason.clone(),
            }),
            None => Ok(record.result.clone()),
        }
    }
}

/// Serializable bundle of historical state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistorySnapshot {
    /// Highest block the view-call evaluator will serve
    #[serde(default)]
    pub head_block: u64,
    #[serde(default)]
    pub block_hashes: HashMap<Felt, u64>,
    #[serde(default)]
    pub event_arguments: Vec<EventArgumentRecord>,
    #[serde(default)]
    pub constructor_inputs: Vec<ConstructorInputRecord>,
    #[serde(default)]
    pub view_calls: Vec<ViewCallRecord>,
}

impl HistorySnapshot {
    pub fn from_json(json: &str) -> Result<Self, RegistryError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    pub fn to_json(&self) -> Result<String, RegistryError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn history(&self) -> MemoryHistory {
        let history = MemoryHistory::new();
        for r in &self.event_arguments {
            history.push_event(r.clone());
        }
        for r in &self.constructor_inputs {
            history.push_constructor(r.clone());
        }
        history
    }

    pub fn view_calls(&self) -> MemoryViewCalls {
        let calls = MemoryViewCalls::new(self.head_block);
        for (hash, number) in &self.block_hashes {
            calls.register_block_hash(hash, *number);
        }
        for r in &self.view_calls {
            calls.push(r.clone());
        }
        calls
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use starkcodec_core::source::NamePattern;

    fn event_query(at_block: u64) -> EventArgumentQuery {
        EventArgumentQuery {
            contract_address: "0xabc".into(),
            event_name: "Upgraded".into(),
            argument_pattern: NamePattern::new("implement"),
            argument_type: "felt".into(),
            at_block,
        }
    }

    fn upgraded_history() -> MemoryHistory {
        let history = MemoryHistory::new();
        let proxy = Felt::from("0xabc");
        history.record_event_argument(&proxy, "Upgraded", "implementation", "felt", 200, "0x200");
        history.record_event_argument(&proxy, "Upgraded", "implementation", "felt", 100, "0x100");
        history.record_event_argument(&proxy, "Upgraded", "implementation", "felt", 300, "0x300");
        history
    }

    #[tokio::test]
    async fn latest_at_or_below_block() {
        let history = upgraded_history();
        assert_eq!(history.latest_event_argument(&event_query(250)).await.unwrap(), Some("0x200".into()));
        assert_eq!(history.latest_event_argument(&event_query(300)).await.unwrap(), Some("0x300".into()));
        assert_eq!(history.latest_event_argument(&event_query(99)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn event_filters_apply() {
        let history = upgraded_history();
        let proxy = Felt::from("0x0ABC");
        history.record_event_argument(&proxy, "Upgraded", "admin", "felt", 260, "0xad");
        history.record_event_argument(&proxy, "Upgraded", "new_Implementation", "Uint256", 260, "0xbad");
        history.record_event_argument(&proxy, "Other", "implementation", "felt", 260, "0xbad");
        history.record_event_argument(&"0xdef".into(), "Upgraded", "implementation", "felt", 260, "0xbad");
        assert_eq!(history.latest_event_argument(&event_query(270)).await.unwrap(), Some("0x200".into()));

        history.record_event_argument(&proxy, "Upgraded", "NEW_IMPLEMENTATION", "felt", 260, "0x260");
        assert_eq!(history.latest_event_argument(&event_query(270)).await.unwrap(), Some("0x260".into()));
    }

    #[tokio::test]
    async fn constructor_query_requires_transaction_type() {
        let history = MemoryHistory::new();
        let proxy = Felt::from("0xabc");
        history.record_constructor_input(&proxy, TransactionType::Invoke, "implementation_hash", "felt", 10, "0x1");
        let query = ConstructorInputQuery {
            contract_address: proxy.clone(),
            transaction_type: TransactionType::Deploy,
            input_pattern: NamePattern::new("implement"),
            input_type: "felt".into(),
            at_block: 100,
        };
        assert_eq!(history.latest_constructor_input(&query).await.unwrap(), None);

        history.record_constructor_input(&proxy, TransactionType::Deploy, "implementation_hash", "felt", 10, "0x2");
        assert_eq!(history.latest_constructor_input(&query).await.unwrap(), Some("0x2".into()));
    }

    #[tokio::test]
    async fn view_calls_follow_block_ranges() {
        let calls = MemoryViewCalls::new(500);
        let proxy = Felt::from("0xabc");
        calls.record(&proxy, "get_implementation", 100, vec!["0x1".into()]);
        calls.record(&proxy, "get_implementation", 300, vec!["0x3".into()]);

        let at = |n| BlockId::Number(n);
        assert_eq!(calls.call(&proxy, "get_implementation", &at(250)).await.unwrap(), vec![Felt::from("0x1")]);
        assert_eq!(calls.call(&proxy, "get_implementation", &at(300)).await.unwrap(), vec![Felt::from("0x3")]);

        let before = calls.call(&proxy, "get_implementation", &at(50)).await.unwrap_err();
        assert!(before.is_absent_resource());
        let unknown = calls.call(&proxy, "implementation", &at(250)).await.unwrap_err();
        assert!(matches!(unknown, CollaboratorError::EntrypointNotFound { .. }));
        let future = calls.call(&proxy, "get_implementation", &at(501)).await.unwrap_err();
        assert!(future.is_retryable());
    }

    #[tokio::test]
    async fn view_call_by_hash_and_revert() {
        let calls = MemoryViewCalls::new(500);
        let proxy = Felt::from("0xabc");
        calls.register_block_hash(&"0xb10c".into(), 120);
        calls.record(&proxy, "get_implementation", 100, vec!["0x1".into()]);
        calls.record_revert(&proxy, "get_implementation", 200, "paused");

        let by_hash = calls.call(&proxy, "get_implementation", &BlockId::Hash("0xB10C".into())).await.unwrap();
        assert_eq!(by_hash, vec![Felt::from("0x1")]);

        let reverted = calls.call(&proxy, "get_implementation", &BlockId::Number(250)).await.unwrap_err();
        assert!(matches!(reverted, CollaboratorError::Reverted { .. }));

        let unknown_hash = calls.call(&proxy, "get_implementation", &BlockId::Hash("0x1".into())).await.unwrap_err();
        assert!(matches!(unknown_hash, CollaboratorError::BlockNotFound { .. }));
    }

    #[tokio::test]
    async fn snapshot_round_trips_into_collaborators() {
        let json = r#"{
            "head_block": 1000,
            "block_hashes": { "0xb10c": 250 },
            "event_arguments": [
                { "contract_address": "0xabc", "event_name": "Upgraded", "argument_name": "implementation",
                  "argument_type": "felt", "block_number": 200, "value": "0x200" }
            ],
            "constructor_inputs": [
                { "contract_address": "0xabc", "transaction_type": "DEPLOY", "input_name": "implementation_hash",
                  "input_type": "felt", "block_number": 5, "value": "0x5" }
            ],
            "view_calls": [
                { "contract_address": "0xabc", "entrypoint": "get_implementation", "from_block": 0, "result": ["0x7"] }
            ]
        }"#;
        let snapshot = HistorySnapshot::from_json(json).unwrap();
        assert_eq!(snapshot.history().len(), 2);
        assert_eq!(
            snapshot.history().latest_event_argument(&event_query(250)).await.unwrap(),
            Some("0x200".into())
        );

        let calls = snapshot.view_calls();
        assert_eq!(calls.head(), 1000);
        let v = calls
            .call(&"0xabc".into(), "get_implementation", &BlockId::Hash("0xb10c".into()))
            .await
            .unwrap();
        assert_eq!(v, vec![Felt::from("0x7")]);

        let again = HistorySnapshot::from_json(&snapshot.to_json().unwrap()).unwrap();
        assert_eq!(again, snapshot);
    }
}
