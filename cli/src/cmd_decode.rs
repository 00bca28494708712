//! `starkcodec decode-call`, `decode-event` and `decode-events`.

use anyhow::{anyhow, Context, Result};
use serde_json::json;
use starkcodec_cairo::{batch, CairoCallDecoder, CairoEventDecoder, ErrorMode};
use starkcodec_core::{
    call::{DecodedInput, OrganizedFunction},
    classified::ClassifiedAbi,
    error::DecodeError,
    event::{OrganizedEvent, RawEvent},
    felt::Felt,
};
use starkcodec_observability::StarkCodecMetrics;
use starkcodec_registry::{ClassifiedAbiCache, MemoryAbiSource};
use std::{collections::BTreeSet, path::Path, sync::Arc, time::Instant};

use crate::{config::CliConfig, load_abi, parse_felts};

/// Which ABI entry the calldata belongs to.
pub enum CallTarget {
    Selector(String),
    Function(String),
    Constructor,
    /// Decode anonymously
    Unknown,
}

pub fn decode_call(
    abi_path: Option<&Path>,
    calldata: &[String],
    target: CallTarget,
    as_json: bool,
    metrics: &StarkCodecMetrics,
) -> Result<()> {
    let abi = match abi_path {
        Some(p) => load_abi(p)?,
        None => ClassifiedAbi::default(),
    };
    let decoder = CairoCallDecoder::new(Arc::new(abi));
    let calldata = parse_felts(calldata);

    let started = Instant::now();
    let result = match &target {
        CallTarget::Selector(s) => decoder.decode_invocation(&Felt::from(s.as_str()), &calldata),
        CallTarget::Function(name) => {
            let function = decoder
                .abi()
                .function_by_name(name)
                .ok_or_else(|| anyhow!("function '{}' not found in ABI", name))?;
            decoder.decode_function(&calldata, Some(function))
        }
        CallTarget::Constructor => decoder.decode_constructor(&calldata),
        CallTarget::Unknown => decoder.decode_function(&calldata, None),
    };
    metrics.record_latency(started.elapsed().as_secs_f64() * 1_000.0, "decode_call");

    let decoded = result.map_err(|e| {
        metrics.record_error(error_kind(&e));
        e
    })?;
    if decoded.is_anonymous() {
        metrics.record_anonymous("call");
    } else {
        metrics.record_call(&decoded.name);
    }

    if as_json {
        println!("{}", serde_json::to_string_pretty(&decoded)?);
    } else {
        print_function(&decoded);
    }
    Ok(())
}

pub fn decode_event(
    abi_path: Option<&Path>,
    from_address: &str,
    keys: &[String],
    data: &[String],
    as_json: bool,
    metrics: &StarkCodecMetrics,
) -> Result<()> {
    let abi = match abi_path {
        Some(p) => load_abi(p)?,
        None => ClassifiedAbi::default(),
    };
    let raw = RawEvent::new(from_address, parse_felts(keys), parse_felts(data));

    let started = Instant::now();
    let result = CairoEventDecoder::new().decode_event(&raw, &abi);
    metrics.record_latency(started.elapsed().as_secs_f64() * 1_000.0, "decode_event");

    let decoded = result.map_err(|e| {
        metrics.record_error(error_kind(&e));
        e
    })?;
    record_event(metrics, &decoded);

    if as_json {
        println!("{}", serde_json::to_string_pretty(&decoded)?);
    } else {
        print_event(&decoded);
    }
    Ok(())
}

pub async fn decode_events(
    events_path: &Path,
    abi_dir: &Path,
    chunk_size: usize,
    config: &CliConfig,
    as_json: bool,
    metrics: &StarkCodecMetrics,
) -> Result<()> {
    let json = std::fs::read_to_string(events_path)
        .with_context(|| format!("read events file '{}'", events_path.display()))?;
    let events: Vec<RawEvent> = serde_json::from_str(&json).context("parse events JSON")?;

    let source = MemoryAbiSource::new();
    let loaded = source
        .load_directory(abi_dir)
        .with_context(|| format!("load ABIs from '{}'", abi_dir.display()))?;
    tracing::info!(abis = loaded, events = events.len(), "decoding event batch");

    // Warm the cache once per contract so the parallel lookup never awaits.
    let cache = ClassifiedAbiCache::from_config(&config.cache);
    let transmitters: BTreeSet<String> = events.iter().map(|e| e.transmitter.canonical()).collect();
    for address in &transmitters {
        cache.get_or_load(&source, &Felt::from(address.as_str())).await?;
    }

    metrics.record_batch(events.len());
    let started = Instant::now();
    let result = batch::decode_events_chunked(
        &CairoEventDecoder::new(),
        &events,
        |address| cache.get(address),
        chunk_size,
        ErrorMode::Collect,
    )?;
    let elapsed = started.elapsed();
    metrics.record_latency(elapsed.as_secs_f64() * 1_000.0, "decode_batch");
    metrics.record_cache_hits(cache.hits());

    for event in &result.events {
        record_event(metrics, event);
    }
    for (_, err) in &result.errors {
        metrics.record_error(error_kind(err));
    }

    if as_json {
        let out = json!({
            "events": result.events,
            "errors": result.errors.iter().map(|(index, e)| json!({
                "index": index,
                "error": e.to_string(),
            })).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        for event in &result.events {
            print_event(event);
        }
        for (index, e) in &result.errors {
            println!("✗ event #{}: {}", index, e);
        }
        println!();
        println!(
            "Decoded {} of {} events in {:.3}s ({} anonymous)",
            result.events.len(),
            events.len(),
            elapsed.as_secs_f64(),
            result.events.iter().filter(|e| e.is_anonymous()).count(),
        );
    }
    Ok(())
}

fn record_event(metrics: &StarkCodecMetrics, event: &OrganizedEvent) {
    if event.is_anonymous() {
        metrics.record_anonymous("event");
    } else {
        metrics.record_event(&event.name);
    }
}

fn error_kind(e: &DecodeError) -> &'static str {
    match e {
        DecodeError::UnsupportedShape { .. } => "unsupported_shape",
        DecodeError::CalldataExhausted { .. } => "calldata_exhausted",
        DecodeError::SchemaAbsent { .. } => "schema_absent",
        DecodeError::MalformedLength { .. } => "malformed_length",
        DecodeError::InvalidAbi { .. } => "invalid_abi",
        DecodeError::Serde(_) => "serde",
    }
}

fn print_function(f: &OrganizedFunction) {
    println!("Function:  {}", f.name);
    println!("Inputs:");
    print_inputs(&f.inputs);
    for w in &f.warnings {
        println!("  ⚠ {}", w);
    }
}

fn print_event(e: &OrganizedEvent) {
    println!("Event:     {}", e.name);
    println!("Emitter:   {}", e.transmitter_contract);
    println!("Arguments:");
    print_inputs(&e.arguments);
    for w in &e.warnings {
        println!("  ⚠ {}", w);
    }
}

fn print_inputs(inputs: &[DecodedInput]) {
    for input in inputs {
        match &input.decimal {
            Some(d) => println!("  {} ({}): {}  [{}]", input.name, input.ty, input.value, d),
            None => println!("  {} ({}): {}", input.name, input.ty, input.value),
        }
    }
}
