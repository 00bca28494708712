//! StarkCodec CLI: the command-line interface for StarkCodec.
//!
//! # Commands
//! ```text
//! starkcodec selector      <name>...
//! starkcodec classify      --abi <path.json>
//! starkcodec decode-call   --abi <path.json> --calldata <felt,...> [--selector <felt> | --function <name> | --constructor]
//! starkcodec decode-event  --abi <path.json> --from-address <felt> --keys <felt,...> --data <felt,...>
//! starkcodec decode-events --events <events.json> --abi-dir <dir>
//! starkcodec detect-proxy  --abi <path.json>
//! starkcodec resolve       --address <felt> --abi <path.json> --history <snapshot.json> --block <n>
//! starkcodec info
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use starkcodec_core::{classified::ClassifiedAbi, selector::Selector};
use starkcodec_observability::{init_tracing, StarkCodecMetrics};
use std::path::{Path, PathBuf};

mod cmd_decode;
mod cmd_proxy;
mod config;

use config::CliConfig;

#[derive(Parser)]
#[command(
    name = "starkcodec",
    about = "StarkNet ABI decoder and proxy resolver: StarkCodec CLI",
    long_about = "
StarkCodec CLI: decode StarkNet (Cairo 0) calldata, constructor arguments and
events against a contract ABI, and resolve proxy implementations at a block.

Felts are given as hex strings, separated by commas or spaces.

ENVIRONMENT VARIABLES:
  STARKCODEC_CONFIG    Path to a YAML config file (log / resolver / cache)
",
    version
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// YAML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute StarkNet selectors (starknet_keccak) for entry point or event names
    Selector {
        #[arg(required = true)]
        names: Vec<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Classify an ABI and list its functions, events and structs
    Classify {
        /// Path to the ABI JSON file
        #[arg(long)]
        abi: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Decode function calldata or constructor arguments
    #[command(name = "decode-call")]
    DecodeCall {
        /// Path to the ABI JSON file (omit to decode anonymously)
        #[arg(long)]
        abi: Option<PathBuf>,
        /// Calldata felts
        #[arg(long, num_args = 0.., value_delimiter = ',')]
        calldata: Vec<String>,
        /// On-chain entry point selector
        #[arg(long, conflicts_with_all = ["function", "constructor"])]
        selector: Option<String>,
        /// Function name
        #[arg(long, conflicts_with = "constructor")]
        function: Option<String>,
        /// Decode against the ABI constructor
        #[arg(long)]
        constructor: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Decode one emitted event
    #[command(name = "decode-event")]
    DecodeEvent {
        /// Path to the ABI JSON file (omit to decode anonymously)
        #[arg(long)]
        abi: Option<PathBuf>,
        /// Emitting contract
        #[arg(long, default_value = "0x0")]
        from_address: String,
        /// Event keys; the first one naming a known event is used
        #[arg(long, num_args = 1.., value_delimiter = ',')]
        keys: Vec<String>,
        /// Event data felts
        #[arg(long, num_args = 0.., value_delimiter = ',')]
        data: Vec<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Decode a JSON array of events from many contracts in parallel
    #[command(name = "decode-events")]
    DecodeEvents {
        /// JSON file holding an array of `{from_address, keys, data}` events
        #[arg(long)]
        events: PathBuf,
        /// Directory of `<address>.json` ABI files
        #[arg(long)]
        abi_dir: PathBuf,
        /// Events per parallel chunk
        #[arg(long, default_value_t = 1_024)]
        chunk_size: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Report the proxy evidence found in an ABI
    #[command(name = "detect-proxy")]
    DetectProxy {
        /// Path to the ABI JSON file
        #[arg(long)]
        abi: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Resolve a proxy's implementation at a block from a history snapshot
    Resolve {
        /// Proxy contract address
        #[arg(long)]
        address: String,
        /// Path to the proxy's ABI JSON file
        #[arg(long)]
        abi: PathBuf,
        /// JSON history snapshot (events, constructor inputs, view call results)
        #[arg(long)]
        history: PathBuf,
        /// Block height to resolve at
        #[arg(long)]
        block: u64,
        /// Block hash, used for the getter call instead of the height
        #[arg(long)]
        block_hash: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show StarkCodec build and capability info
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = CliConfig::load(cli.config.as_deref())?;
    if cli.verbose {
        config.log.level = "debug".into();
    }
    init_tracing(&config.log).context("initialise logging")?;

    let meter = opentelemetry::global::meter("starkcodec-cli");
    let metrics = StarkCodecMetrics::new(&meter);

    match cli.command {
        Commands::Selector { names, json } => cmd_selector(&names, json),

        Commands::Classify { abi, json } => cmd_classify(&abi, json),

        Commands::DecodeCall { abi, calldata, selector, function, constructor, json } => {
            let target = match (selector, function, constructor) {
                (Some(s), _, _) => cmd_decode::CallTarget::Selector(s),
                (_, Some(f), _) => cmd_decode::CallTarget::Function(f),
                (_, _, true) => cmd_decode::CallTarget::Constructor,
                _ => cmd_decode::CallTarget::Unknown,
            };
            cmd_decode::decode_call(abi.as_deref(), &calldata, target, json, &metrics)
        }

        Commands::DecodeEvent { abi, from_address, keys, data, json } => {
            cmd_decode::decode_event(abi.as_deref(), &from_address, &keys, &data, json, &metrics)
        }

        Commands::DecodeEvents { events, abi_dir, chunk_size, json } => {
            cmd_decode::decode_events(&events, &abi_dir, chunk_size, &config, json, &metrics).await
        }

        Commands::DetectProxy { abi, json } => cmd_proxy::detect(&abi, &config, json),

        Commands::Resolve { address, abi, history, block, block_hash, json } => {
            let request = cmd_proxy::ResolveRequest {
                address,
                abi,
                history,
                block,
                block_hash,
            };
            cmd_proxy::resolve(&request, &config, json, &metrics).await
        }

        Commands::Info => cmd_info(&config),
    }
}

// ─── Shared helpers ──────────────────────────────────────────────────────────

/// Read and classify an ABI file.
pub(crate) fn load_abi(path: &Path) -> Result<ClassifiedAbi> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("read ABI file '{}'", path.display()))?;
    ClassifiedAbi::from_json(&json).with_context(|| format!("parse ABI file '{}'", path.display()))
}

/// Accept felts separated by commas (clap) and/or whitespace.
pub(crate) fn parse_felts(raw: &[String]) -> Vec<starkcodec_core::felt::Felt> {
    raw.iter()
        .flat_map(|s| s.split_whitespace())
        .filter(|s| !s.is_empty())
        .map(starkcodec_core::felt::Felt::from)
        .collect()
}

// ─── Command implementations ─────────────────────────────────────────────────

fn cmd_selector(names: &[String], as_json: bool) -> Result<()> {
    if as_json {
        let out: Vec<_> = names
            .iter()
            .map(|n| {
                let s = Selector::from_name(n);
                json!({ "name": n, "selector": s.to_string(), "padded": s.to_padded_hex() })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        for n in names {
            println!("{:32} {}", n, Selector::from_name(n));
        }
    }
    Ok(())
}

fn cmd_classify(abi_path: &Path, as_json: bool) -> Result<()> {
    let abi = load_abi(abi_path)?;

    let mut functions: Vec<_> = abi.functions().collect();
    functions.sort_by(|a, b| a.1.name.cmp(&b.1.name));
    let mut events: Vec<_> = abi.events().collect();
    events.sort_by(|a, b| a.1.name.cmp(&b.1.name));
    let mut structs: Vec<_> = abi.structs().collect();
    structs.sort_by(|a, b| a.name.cmp(&b.name));

    if as_json {
        let out = json!({
            "functions": functions.iter().map(|(sel, f)| json!({
                "name": f.name,
                "selector": sel.to_string(),
                "kind": f.kind,
                "view": f.is_view(),
                "inputs": f.inputs,
            })).collect::<Vec<_>>(),
            "events": events.iter().map(|(sel, e)| json!({
                "name": e.name,
                "selector": sel.to_string(),
                "data": e.data,
            })).collect::<Vec<_>>(),
            "structs": structs.iter().map(|s| json!({
                "name": s.name,
                "size": s.size,
                "members": s.members,
            })).collect::<Vec<_>>(),
            "constructor": abi.constructor().map(|c| &c.inputs),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("Functions ({}):", functions.len());
    for (sel, f) in &functions {
        let view = if f.is_view() { " [view]" } else { "" };
        println!("  {:40} {}{}", f.name, sel, view);
    }
    println!("Events ({}):", events.len());
    for (sel, e) in &events {
        println!("  {:40} {}", e.name, sel);
    }
    println!("Structs ({}):", structs.len());
    for s in &structs {
        println!("  {:40} size {}", s.name, s.size);
    }
    match abi.constructor() {
        Some(c) => {
            let inputs: Vec<String> = c.inputs.iter().map(|i| format!("{}: {}", i.name, i.ty)).collect();
            println!("Constructor: ({})", inputs.join(", "));
        }
        None => println!("Constructor: none"),
    }
    Ok(())
}

fn cmd_info(config: &CliConfig) -> Result<()> {
    println!("StarkCodec v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Capabilities:");
    println!("  ✓ Selector computation      (starknet_keccak, low 250 bits of keccak256)");
    println!("  ✓ Calldata decoding         (length-prefixed arrays, structs, 2-tuples)");
    println!("  ✓ Constructor decoding");
    println!("  ✓ Event decoding            (first matching key wins)");
    println!("  ✓ Anonymous fallback        (no ABI or no matching definition)");
    println!("  ✓ Uint256 decimal rendering");
    println!("  ✓ Parallel batch decode     (Rayon)");
    println!("  ✓ Proxy resolution          (getter → upgrade event → constructor)");
    println!();
    println!("Resolver getters:             {}", config.resolver.getter_names.join(", "));
    println!("Implementation pattern:       %{}%", config.resolver.implementation_pattern);
    println!("Upgrade pattern:              %{}%", config.resolver.upgrade_pattern);
    println!("ABI cache capacity:           {}", config.cache.capacity);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn felts_split_on_whitespace() {
        let raw = vec!["0x1 0x2".to_string(), "0x3".to_string(), " ".to_string()];
        let felts = parse_felts(&raw);
        assert_eq!(felts.len(), 3);
        assert_eq!(felts[2].as_str(), "0x3");
    }

    #[test]
    fn cli_parses_comma_separated_calldata() {
        let cli = Cli::try_parse_from([
            "starkcodec",
            "decode-call",
            "--calldata",
            "0x1,0x2",
            "--function",
            "transfer",
        ])
        .unwrap();
        match cli.command {
            Commands::DecodeCall { calldata, function, .. } => {
                assert_eq!(calldata, vec!["0x1", "0x2"]);
                assert_eq!(function.as_deref(), Some("transfer"));
            }
            _ => panic!("expected decode-call"),
        }
    }

    #[test]
    fn selector_and_constructor_conflict() {
        let res = Cli::try_parse_from([
            "starkcodec",
            "decode-call",
            "--selector",
            "0x1",
            "--constructor",
        ]);
        assert!(res.is_err());
    }
}
