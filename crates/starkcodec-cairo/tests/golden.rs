//! Golden fixture integration tests.
//!
//! Each test loads a realistic StarkNet ABI from `fixtures/cairo/`, decodes a
//! recorded invocation or event against it, and checks the values recorded in
//! the fixture JSON.

use starkcodec_cairo::{is_proxy, CairoCallDecoder, CairoEventDecoder, ProxyResolver, ResolutionStrategy};
use starkcodec_core::{
    abi::parse_abi,
    classified::ClassifiedAbi,
    event::RawEvent,
    felt::Felt,
    selector::Selector,
    value::FeltValue,
};
use starkcodec_registry::{ClassifiedAbiCache, MemoryAbiSource, MemoryHistory, MemoryViewCalls};
use std::sync::Arc;

// ─── Helpers ──────────────────────────────────────────────────────────────────

/// The fixtures live two levels above the crate root.
fn fixture_path(name: &str) -> std::path::PathBuf {
    let mut p = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    p.push("../../fixtures/cairo");
    p.push(name);
    p
}

fn read_fixture(name: &str) -> String {
    std::fs::read_to_string(fixture_path(name)).unwrap_or_else(|e| panic!("fixture {name}: {e}"))
}

fn classified(name: &str) -> ClassifiedAbi {
    ClassifiedAbi::classify(&parse_abi(&read_fixture(name)).unwrap())
}

fn felt_list(v: &serde_json::Value) -> Vec<Felt> {
    v.as_array()
        .unwrap()
        .iter()
        .map(|f| Felt::from(f.as_str().unwrap()))
        .collect()
}

// ─── Account __execute__ ──────────────────────────────────────────────────────

#[test]
fn account_execute_golden() {
    let fixture: serde_json::Value = serde_json::from_str(&read_fixture("execute-call.json")).unwrap();
    let decoder = CairoCallDecoder::new(Arc::new(classified("account.abi.json")));

    let selector = Felt::from(fixture["entryPointSelector"].as_str().unwrap());
    let calldata = felt_list(&fixture["calldata"]);
    let out = decoder.decode_invocation(&selector, &calldata).unwrap();
    let expected = &fixture["expected"];

    assert_eq!(out.name, expected["name"].as_str().unwrap());
    assert!(out.is_clean());

    let calls = out.input("call_array").unwrap().value.as_struct_array().unwrap();
    assert_eq!(calls.len() as u64, expected["callCount"].as_u64().unwrap());
    assert_eq!(
        calls[0]["to"],
        FeltValue::Felt(expected["firstCallTo"].as_str().unwrap().into())
    );
    assert_eq!(
        calls[1]["data_offset"],
        FeltValue::Felt(expected["secondCallDataOffset"].as_str().unwrap().into())
    );
    assert_eq!(calls[0]["selector"], FeltValue::Felt(Selector::from_name("transfer").to_felt()));

    let inner = out.input("calldata").unwrap();
    assert_eq!(inner.ty, expected["calldataType"].as_str().unwrap());
    assert_eq!(
        inner.value.as_felt_array().unwrap()[1],
        Felt::from(expected["transferAmount"].as_str().unwrap())
    );
}

#[test]
fn account_entries_are_classified() {
    let abi = classified("account.abi.json");
    assert!(abi.function(&Selector::from_name("__validate__")).is_some());
    assert!(abi.function_by_name("getSigner").unwrap().is_view());
    assert_eq!(abi.struct_def("CallArray").unwrap().size, 4);
    assert_eq!(abi.constructor().unwrap().inputs.len(), 2);
    assert!(!is_proxy(&abi));
}

// ─── ERC-20 ───────────────────────────────────────────────────────────────────

#[test]
fn erc20_transfer_event_golden() {
    let fixture: serde_json::Value = serde_json::from_str(&read_fixture("erc20-transfer-event.json")).unwrap();
    let raw: RawEvent = serde_json::from_value(fixture.clone()).unwrap();
    assert_eq!(raw.block_number, Some(61234));

    let ev = CairoEventDecoder::new().decode_event(&raw, &classified("erc20.abi.json")).unwrap();
    let expected = &fixture["expected"];

    assert_eq!(ev.name, expected["name"].as_str().unwrap());
    assert_eq!(ev.transmitter_contract, raw.transmitter);
    assert_eq!(
        ev.argument("to").unwrap().value,
        FeltValue::Felt(expected["to"].as_str().unwrap().into())
    );
    let value = ev.argument("value").unwrap();
    assert_eq!(value.ty, "Uint256");
    assert_eq!(value.decimal.as_deref(), expected["valueDecimal"].as_str());
}

#[test]
fn erc20_constructor_and_l1_handler() {
    let abi = Arc::new(classified("erc20.abi.json"));
    let decoder = CairoCallDecoder::new(abi.clone());

    let deploy = ["0x4574686572", "0x455448", "0x12", "0x3e8", "0x0", "0xabc"].map(Felt::from);
    let ctor = decoder.decode_constructor(&deploy).unwrap();
    assert_eq!(ctor.input("decimals").unwrap().decimal.as_deref(), Some("18"));
    assert_eq!(ctor.input("initial_supply").unwrap().decimal.as_deref(), Some("1000"));
    assert_eq!(ctor.input("recipient").unwrap().value, FeltValue::Felt("0xabc".into()));

    let handler = abi.function(&Selector::from_name("handle_deposit")).unwrap();
    let out = decoder
        .decode_function(&["0x1", "0x2", "0x0"].map(Felt::from), Some(handler))
        .unwrap();
    assert_eq!(out.inputs.len(), 3);
}

#[test]
fn uint256_with_oversized_limb_has_no_decimal() {
    let decoder = CairoCallDecoder::new(Arc::new(classified("erc20.abi.json")));
    let transfer = decoder.abi().function_by_name("transfer").unwrap().clone();
    let oversized = "0x100000000000000000000000000000000";
    let out = decoder
        .decode_function(&["0x1", oversized, "0x0"].map(Felt::from), Some(&transfer))
        .unwrap();
    assert!(out.input("amount").unwrap().decimal.is_none());
}

// ─── Proxy ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn proxy_resolves_through_cache_and_history() {
    let proxy = Felt::from("0x0abc");
    let source = MemoryAbiSource::new();
    source.insert_json(proxy.clone(), &read_fixture("proxy.abi.json")).unwrap();

    let cache = ClassifiedAbiCache::new(8);
    let abi = cache.get_or_load(&source, &proxy).await.unwrap();
    // same value, different spelling
    let again = cache.get_or_load(&source, &"0xabc".into()).await.unwrap();
    assert!(Arc::ptr_eq(&abi, &again));
    assert_eq!(cache.hits(), 1);

    assert!(is_proxy(&abi));
    assert!(abi.functions().count() >= 3);

    // the getter is unknown to this evaluator, so the upgrade event decides
    let view_calls = Arc::new(MemoryViewCalls::new(1_000));
    let history = Arc::new(MemoryHistory::new());
    history.record_event_argument(&proxy, "Upgraded", "implementation", "felt", 100, "0x100");
    history.record_event_argument(&proxy, "Upgraded", "implementation", "felt", 200, "0x200");
    history.record_event_argument(&proxy, "Upgraded", "implementation", "felt", 300, "0x300");

    let resolver = ProxyResolver::new(view_calls.clone(), history.clone());
    let res = resolver.resolve(&proxy, &abi, 250, None).await.unwrap().unwrap();
    assert_eq!(res.implementation, Felt::from("0x200"));
    assert_eq!(res.strategy, ResolutionStrategy::UpgradeEvent);

    // nothing emitted at or before block 99 yet
    let before_first_upgrade = resolver.resolve_implementation(&proxy, &abi, 99, None).await.unwrap();
    assert_eq!(before_first_upgrade, None);

    history.record_constructor_input(
        &proxy,
        starkcodec_core::source::TransactionType::Deploy,
        "implementation_hash",
        "felt",
        50,
        "0x50",
    );
    let early = resolver.resolve(&proxy, &abi, 99, None).await.unwrap().unwrap();
    assert_eq!(early.implementation, Felt::from("0x50"));
    assert_eq!(early.strategy, ResolutionStrategy::Constructor);

    view_calls.record(&proxy, "get_implementation_hash", 0, vec!["0x999".into()]);
    let by_getter = resolver.resolve_implementation(&proxy, &abi, 250, None).await.unwrap();
    assert_eq!(by_getter, Some(Felt::from("0x999")));
}
