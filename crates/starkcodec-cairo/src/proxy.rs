//! StarkNet proxy detection and point-in-time implementation resolution.
//!
//! A proxy is recognised from its ABI alone. Three kinds of evidence are
//! counted, and a count of exactly one is a usable signal:
//!
//! | Evidence | Matches | Resolution strategy |
//! |----------|---------|---------------------|
//! | Getter | allow-listed, view, no inputs | call it at the block |
//! | Upgrade event | event name contains `upgrade` | latest `%implement%` argument |
//! | Constructor input | input name contains `implement` | latest `DEPLOY` constructor input |
//!
//! Zero or several matches of one kind are ambiguous and ignored.
//!
//! Resolution tries the strategies in table order and stops at the first
//! value. Collaborator errors that mean "not there" (missing entrypoint,
//! revert) count as no value; retryable errors propagate to the caller.

use serde::{Deserialize, Serialize};
use starkcodec_core::{
    abi::{AbiField, EventAbi, FunctionAbi},
    classified::ClassifiedAbi,
    error::{CollaboratorError, ResolutionError},
    felt::Felt,
    source::{
        BlockId, ConstructorInputQuery, EventArgumentQuery, HistoricalQuery, NamePattern,
        TransactionType, ViewCallEvaluator,
    },
};
use std::{fmt, sync::Arc};
use tracing::{debug, info};

use crate::config::ResolverConfig;

/// Proxy signals found in one classified ABI.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyEvidence<'a> {
    pub getters: Vec<&'a FunctionAbi>,
    pub upgrade_events: Vec<&'a EventAbi>,
    pub constructor_inputs: Vec<&'a AbiField>,
}

impl<'a> ProxyEvidence<'a> {
    pub fn collect(abi: &'a ClassifiedAbi, config: &ResolverConfig) -> Self {
        let mut getters: Vec<&FunctionAbi> = abi
            .functions()
            .map(|(_, f)| f)
            .filter(|f| config.is_getter(&f.name) && f.is_view() && f.inputs.is_empty())
            .collect();
        getters.sort_by(|a, b| a.name.cmp(&b.name));

        let mut upgrade_events: Vec<&EventAbi> = abi
            .events()
            .map(|(_, e)| e)
            .filter(|e| config.mentions_upgrade(&e.name))
            .collect();
        upgrade_events.sort_by(|a, b| a.name.cmp(&b.name));

        let constructor_inputs: Vec<&AbiField> = abi
            .constructor()
            .map(|c| {
                c.inputs
                    .iter()
                    .filter(|i| config.mentions_implementation(&i.name))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            getters,
            upgrade_events,
            constructor_inputs,
        }
    }

    /// True iff any evidence kind has exactly one match.
    pub fn is_proxy(&self) -> bool {
        self.unique_getter().is_some()
            || self.unique_upgrade_event().is_some()
            || self.unique_constructor_input().is_some()
    }

    pub fn unique_getter(&self) -> Option<&'a FunctionAbi> {
        unique(&self.getters)
    }

    pub fn unique_upgrade_event(&self) -> Option<&'a EventAbi> {
        unique(&self.upgrade_events)
    }

    pub fn unique_constructor_input(&self) -> Option<&'a AbiField> {
        unique(&self.constructor_inputs)
    }
}

fn unique<'a, T>(items: &[&'a T]) -> Option<&'a T> {
    match items {
        [only] => Some(*only),
        _ => None,
    }
}

/// Proxy check with the default allow-lists.
pub fn is_proxy(abi: &ClassifiedAbi) -> bool {
    ProxyEvidence::collect(abi, &ResolverConfig::default()).is_proxy()
}

/// The strategy that produced an implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStrategy {
    Getter,
    UpgradeEvent,
    Constructor,
}

impl fmt::Display for ResolutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResolutionStrategy::Getter => "getter",
            ResolutionStrategy::UpgradeEvent => "upgrade_event",
            ResolutionStrategy::Constructor => "constructor",
        };
        f.write_str(s)
    }
}

/// A resolved implementation address or class hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub implementation: Felt,
    pub strategy: ResolutionStrategy,
}

/// Resolves a proxy's implementation as of a historical block.
///
/// Holds no mutable state; one instance can serve concurrent resolutions.
#[derive(Clone)]
pub struct ProxyResolver {
    view_calls: Arc<dyn ViewCallEvaluator>,
    history: Arc<dyn HistoricalQuery>,
    config: ResolverConfig,
}

impl fmt::Debug for ProxyResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyResolver").field("config", &self.config).finish_non_exhaustive()
    }
}

impl ProxyResolver {
    pub fn new(view_calls: Arc<dyn ViewCallEvaluator>, history: Arc<dyn HistoricalQuery>) -> Self {
        Self::with_config(view_calls, history, ResolverConfig::default())
    }

    pub fn with_config(
        view_calls: Arc<dyn ViewCallEvaluator>,
        history: Arc<dyn HistoricalQuery>,
        config: ResolverConfig,
    ) -> Self {
        Self {
            view_calls,
            history,
            config,
        }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn evidence<'a>(&self, abi: &'a ClassifiedAbi) -> ProxyEvidence<'a> {
        ProxyEvidence::collect(abi, &self.config)
    }

    pub fn is_proxy(&self, abi: &ClassifiedAbi) -> bool {
        self.evidence(abi).is_proxy()
    }

    /// Implementation address as of `at_block`, or `None` when no strategy finds one.
    pub async fn resolve_implementation(
        &self,
        contract_address: &Felt,
        abi: &ClassifiedAbi,
        at_block: u64,
        at_block_hash: Option<&Felt>,
    ) -> Result<Option<Felt>, ResolutionError> {
        Ok(self
            .resolve(contract_address, abi, at_block, at_block_hash)
            .await?
            .map(|r| r.implementation))
    }

    /// Like [`resolve_implementation`](Self::resolve_implementation), also
    /// reporting which strategy produced the value.
    pub async fn resolve(
        &self,
        contract_address: &Felt,
        abi: &ClassifiedAbi,
        at_block: u64,
        at_block_hash: Option<&Felt>,
    ) -> Result<Option<Resolution>, ResolutionError> {
        let evidence = self.evidence(abi);

        if let Some(getter) = evidence.unique_getter() {
            let block = match at_block_hash {
                Some(hash) => BlockId::Hash(hash.clone()),
                None => BlockId::Number(at_block),
            };
            if let Some(found) = self.via_getter(contract_address, getter, &block).await? {
                return Ok(Some(resolved(contract_address, found, ResolutionStrategy::Getter, at_block)));
            }
        }

        if let Some(event) = evidence.unique_upgrade_event() {
            let query = EventArgumentQuery {
                contract_address: contract_address.clone(),
                event_name: event.name.clone(),
                argument_pattern: NamePattern::new(&self.config.implementation_pattern),
                argument_type: self.config.argument_type.clone(),
                at_block,
            };
            let found = self.history.latest_event_argument(&query).await.or_else(absent_as_none)?;
            debug!(contract = %contract_address, event = %event.name, found = found.is_some(), "upgrade event strategy");
            if let Some(found) = found {
                return Ok(Some(resolved(contract_address, found, ResolutionStrategy::UpgradeEvent, at_block)));
            }
        }

        if let Some(input) = evidence.unique_constructor_input() {
            let query = ConstructorInputQuery {
                contract_address: contract_address.clone(),
                transaction_type: TransactionType::Deploy,
                input_pattern: NamePattern::new(&self.config.implementation_pattern),
                input_type: self.config.argument_type.clone(),
                at_block,
            };
            let found = self.history.latest_constructor_input(&query).await.or_else(absent_as_none)?;
            debug!(contract = %contract_address, input = %input.name, found = found.is_some(), "constructor strategy");
            if let Some(found) = found {
                return Ok(Some(resolved(contract_address, found, ResolutionStrategy::Constructor, at_block)));
            }
        }

        debug!(contract = %contract_address, at_block, "no implementation found");
        Ok(None)
    }

    async fn via_getter(
        &self,
        contract_address: &Felt,
        getter: &FunctionAbi,
        block: &BlockId,
    ) -> Result<Option<Felt>, CollaboratorError> {
        let values = match self.view_calls.call(contract_address, &getter.name, block).await {
            Ok(values) => values,
            Err(e) if e.is_absent_resource() => {
                debug!(contract = %contract_address, getter = %getter.name, error = %e, "getter unavailable");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        match <[Felt; 1]>::try_from(values) {
            Ok([value]) => Ok(Some(value)),
            Err(values) => {
                debug!(
                    contract = %contract_address,
                    getter = %getter.name,
                    returned = values.len(),
                    "getter must return exactly one value"
                );
                Ok(None)
            }
        }
    }
}

fn absent_as_none(e: CollaboratorError) -> Result<Option<Felt>, CollaboratorError> {
    if e.is_absent_resource() {
        Ok(None)
    } else {
        Err(e)
    }
}

fn resolved(contract: &Felt, implementation: Felt, strategy: ResolutionStrategy, at_block: u64) -> Resolution {
    info!(contract = %contract, implementation = %implementation, %strategy, at_block, "resolved proxy implementation");
    Resolution {
        implementation,
        strategy,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use starkcodec_core::abi::{AbiEntry, FunctionKind};
    use std::sync::Mutex;

    fn getter(name: &str) -> AbiEntry {
        AbiEntry::Function(FunctionAbi::new(FunctionKind::Function, name, vec![]).view())
    }

    fn upgrade_event() -> AbiEntry {
        AbiEntry::Event(EventAbi::new("Upgraded", vec![AbiField::new("implementation", "felt")]))
    }

    fn constructor() -> AbiEntry {
        AbiEntry::Function(FunctionAbi::new(
            FunctionKind::Constructor,
            "constructor",
            vec![AbiField::new("implementation_hash", "felt"), AbiField::new("owner", "felt")],
        ))
    }

    #[derive(Default)]
    struct Stub {
        call_result: Option<Result<Vec<Felt>, CollaboratorError>>,
        event_result: Option<Felt>,
        ctor_result: Option<Felt>,
        blocks_seen: Mutex<Vec<BlockId>>,
        event_queries: Mutex<Vec<EventArgumentQuery>>,
        ctor_queries: Mutex<Vec<ConstructorInputQuery>>,
    }

    #[async_trait]
    impl ViewCallEvaluator for Stub {
        async fn call(&self, _: &Felt, entrypoint: &str, block: &BlockId) -> Result<Vec<Felt>, CollaboratorError> {
            self.blocks_seen.lock().unwrap().push(block.clone());
            match &self.call_result {
                Some(Ok(v)) => Ok(v.clone()),
                Some(Err(CollaboratorError::Timeout { ms })) => Err(CollaboratorError::Timeout { ms: *ms }),
                _ => Err(CollaboratorError::EntrypointNotFound {
                    contract: "0x1".into(),
                    entrypoint: entrypoint.into(),
                }),
            }
        }
    }

    #[async_trait]
    impl HistoricalQuery for Stub {
        async fn latest_event_argument(&self, q: &EventArgumentQuery) -> Result<Option<Felt>, CollaboratorError> {
            self.event_queries.lock().unwrap().push(q.clone());
            Ok(self.event_result.clone())
        }

        async fn latest_constructor_input(&self, q: &ConstructorInputQuery) -> Result<Option<Felt>, CollaboratorError> {
            assert_eq!(q.transaction_type, TransactionType::Deploy);
            self.ctor_queries.lock().unwrap().push(q.clone());
            Ok(self.ctor_result.clone())
        }
    }

    fn resolver(stub: Arc<Stub>) -> ProxyResolver {
        ProxyResolver::new(stub.clone(), stub)
    }

    #[test]
    fn two_getters_alone_are_not_a_proxy() {
        let abi = ClassifiedAbi::classify(&[getter("get_implementation"), getter("implementation")]);
        assert!(!is_proxy(&abi));
    }

    #[test]
    fn any_single_signal_is_a_proxy() {
        assert!(is_proxy(&ClassifiedAbi::classify(&[getter("get_implementation")])));
        assert!(is_proxy(&ClassifiedAbi::classify(&[upgrade_event()])));
        assert!(is_proxy(&ClassifiedAbi::classify(&[constructor()])));
        assert!(is_proxy(&ClassifiedAbi::classify(&[
            getter("get_implementation"),
            getter("implementation"),
            upgrade_event(),
        ])));
    }

    #[test]
    fn getter_must_be_view_without_inputs() {
        let not_view = AbiEntry::Function(FunctionAbi::new(FunctionKind::Function, "implementation", vec![]));
        let with_input = AbiEntry::Function(
            FunctionAbi::new(FunctionKind::Function, "implementation", vec![AbiField::new("x", "felt")]).view(),
        );
        assert!(!is_proxy(&ClassifiedAbi::classify(&[not_view])));
        assert!(!is_proxy(&ClassifiedAbi::classify(&[with_input])));
        assert!(!is_proxy(&ClassifiedAbi::classify(&[getter("owner")])));
    }

    #[tokio::test]
    async fn getter_strategy_wins_first() {
        let stub = Arc::new(Stub {
            call_result: Some(Ok(vec!["0xbeef".into()])),
            event_result: Some("0xdead".into()),
            ..Default::default()
        });
        let abi = ClassifiedAbi::classify(&[getter("get_implementation"), upgrade_event()]);
        let res = resolver(stub.clone()).resolve(&"0x1".into(), &abi, 250, None).await.unwrap().unwrap();
        assert_eq!(res.implementation, Felt::from("0xbeef"));
        assert_eq!(res.strategy, ResolutionStrategy::Getter);
        assert_eq!(stub.blocks_seen.lock().unwrap()[0], BlockId::Number(250));
        assert!(stub.event_queries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn getter_uses_block_hash_when_given() {
        let stub = Arc::new(Stub {
            call_result: Some(Ok(vec!["0xbeef".into()])),
            ..Default::default()
        });
        let abi = ClassifiedAbi::classify(&[getter("get_implementation")]);
        let hash = Felt::from("0xb10c");
        resolver(stub.clone()).resolve_implementation(&"0x1".into(), &abi, 250, Some(&hash)).await.unwrap();
        assert_eq!(stub.blocks_seen.lock().unwrap()[0], BlockId::Hash(hash));
    }

    #[tokio::test]
    async fn getter_with_two_values_falls_through_to_event() {
        let stub = Arc::new(Stub {
            call_result: Some(Ok(vec!["0x1".into(), "0x2".into()])),
            event_result: Some("0xdead".into()),
            ..Default::default()
        });
        let abi = ClassifiedAbi::classify(&[getter("get_implementation"), upgrade_event()]);
        let res = resolver(stub.clone()).resolve(&"0x1".into(), &abi, 250, None).await.unwrap().unwrap();
        assert_eq!(res.strategy, ResolutionStrategy::UpgradeEvent);

        let q = &stub.event_queries.lock().unwrap()[0];
        assert_eq!(q.event_name, "Upgraded");
        assert_eq!(q.argument_pattern.needle(), "implement");
        assert_eq!(q.argument_type, "felt");
        assert_eq!(q.at_block, 250);
    }

    #[tokio::test]
    async fn missing_entrypoint_is_no_result() {
        let stub = Arc::new(Stub::default());
        let abi = ClassifiedAbi::classify(&[getter("get_implementation")]);
        let res = resolver(stub).resolve_implementation(&"0x1".into(), &abi, 10, None).await.unwrap();
        assert!(res.is_none());
    }

    #[tokio::test]
    async fn retryable_error_propagates() {
        let stub = Arc::new(Stub {
            call_result: Some(Err(CollaboratorError::Timeout { ms: 500 })),
            event_result: Some("0xdead".into()),
            ..Default::default()
        });
        let abi = ClassifiedAbi::classify(&[getter("get_implementation"), upgrade_event()]);
        let err = resolver(stub).resolve(&"0x1".into(), &abi, 10, None).await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn constructor_strategy_is_last() {
        let stub = Arc::new(Stub {
            ctor_result: Some("0xc0de".into()),
            ..Default::default()
        });
        let abi = ClassifiedAbi::classify(&[upgrade_event(), constructor()]);
        let res = resolver(stub).resolve(&"0x1".into(), &abi, 10, None).await.unwrap().unwrap();
        assert_eq!(res.implementation, Felt::from("0xc0de"));
        assert_eq!(res.strategy, ResolutionStrategy::Constructor);
    }

    #[tokio::test]
    async fn constructor_query_filters_on_configured_type() {
        let stub = Arc::new(Stub {
            ctor_result: Some("0xc0de".into()),
            ..Default::default()
        });
        let typed_ctor = AbiEntry::Function(FunctionAbi::new(
            FunctionKind::Constructor,
            "constructor",
            vec![AbiField::new("implementation_hash", "ClassHash")],
        ));
        let abi = ClassifiedAbi::classify(&[typed_ctor]);
        resolver(stub.clone()).resolve(&"0x1".into(), &abi, 10, None).await.unwrap();

        let q = &stub.ctor_queries.lock().unwrap()[0];
        assert_eq!(q.input_type, "felt");
        assert_eq!(q.input_pattern.needle(), "implement");
    }

    #[tokio::test]
    async fn no_eligible_strategy_is_none() {
        let stub = Arc::new(Stub::default());
        let abi = ClassifiedAbi::classify(&[getter("get_implementation"), getter("implementation")]);
        let res = resolver(stub.clone()).resolve(&"0x1".into(), &abi, 10, None).await.unwrap();
        assert!(res.is_none());
        assert!(stub.blocks_seen.lock().unwrap().is_empty());
    }
}
