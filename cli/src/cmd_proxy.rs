//! `starkcodec detect-proxy` and `starkcodec resolve`.
//!
//! `resolve` replays a JSON history snapshot:
//! ```json
//! {
//!   "head_block": 1000,
//!   "block_hashes": { "0xb10c": 250 },
//!   "event_arguments": [
//!     { "contract_address": "0xabc", "event_name": "Upgraded", "argument_name": "implementation",
//!       "argument_type": "felt", "block_number": 200, "value": "0x200" }
//!   ],
//!   "constructor_inputs": [],
//!   "view_calls": [
//!     { "contract_address": "0xabc", "entrypoint": "get_implementation", "from_block": 0, "result": ["0x7"] }
//!   ]
//! }
//! ```

use anyhow::{Context, Result};
use serde_json::json;
use starkcodec_cairo::{ProxyEvidence, ProxyResolver};
use starkcodec_core::felt::Felt;
use starkcodec_observability::StarkCodecMetrics;
use starkcodec_registry::HistorySnapshot;
use std::{path::PathBuf, sync::Arc};

use crate::{config::CliConfig, load_abi};

pub struct ResolveRequest {
    pub address: String,
    pub abi: PathBuf,
    pub history: PathBuf,
    pub block: u64,
    pub block_hash: Option<String>,
}

pub fn detect(abi_path: &std::path::Path, config: &CliConfig, as_json: bool) -> Result<()> {
    let abi = load_abi(abi_path)?;
    let evidence = ProxyEvidence::collect(&abi, &config.resolver);

    let getters: Vec<&str> = evidence.getters.iter().map(|f| f.name.as_str()).collect();
    let events: Vec<&str> = evidence.upgrade_events.iter().map(|e| e.name.as_str()).collect();
    let inputs: Vec<&str> = evidence.constructor_inputs.iter().map(|i| i.name.as_str()).collect();

    if as_json {
        let out = json!({
            "is_proxy": evidence.is_proxy(),
            "getters": getters,
            "upgrade_events": events,
            "constructor_inputs": inputs,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("Proxy: {}", if evidence.is_proxy() { "yes" } else { "no" });
    println!("  getters            ({}): {}", getters.len(), getters.join(", "));
    println!("  upgrade events     ({}): {}", events.len(), events.join(", "));
    println!("  constructor inputs ({}): {}", inputs.len(), inputs.join(", "));
    println!("A kind of evidence counts only when exactly one entry matches.");
    Ok(())
}

pub async fn resolve(
    request: &ResolveRequest,
    config: &CliConfig,
    as_json: bool,
    metrics: &StarkCodecMetrics,
) -> Result<()> {
    let abi = load_abi(&request.abi)?;
    let snapshot = HistorySnapshot::load(&request.history)
        .with_context(|| format!("load history snapshot '{}'", request.history.display()))?;

    let resolver = ProxyResolver::with_config(
        Arc::new(snapshot.view_calls()),
        Arc::new(snapshot.history()),
        config.resolver.clone(),
    );

    let address = Felt::from(request.address.as_str());
    let block_hash = request.block_hash.as_deref().map(Felt::from);
    let resolution = resolver
        .resolve(&address, &abi, request.block, block_hash.as_ref())
        .await
        .map_err(|e| {
            let hint = if e.is_retryable() { "retryable" } else { "permanent" };
            anyhow::Error::new(e).context(format!("resolve {} at block {} ({hint})", address, request.block))
        })?;

    let strategy = resolution
        .as_ref()
        .map(|r| r.strategy.to_string())
        .unwrap_or_else(|| "none".to_string());
    metrics.record_resolution(&strategy);

    if as_json {
        let out = json!({
            "contract": address,
            "block": request.block,
            "implementation": resolution.as_ref().map(|r| &r.implementation),
            "strategy": resolution.as_ref().map(|r| r.strategy),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    match resolution {
        Some(r) => {
            println!("Contract:       {}", address);
            println!("Block:          {}", request.block);
            println!("Implementation: {}", r.implementation);
            println!("Strategy:       {}", r.strategy);
        }
        None => println!("No implementation found for {} at block {}", address, request.block),
    }
    Ok(())
}
