//! # starkcodec-observability
//!
//! OpenTelemetry-based observability for StarkCodec.
//!
//! ## Built-in metrics
//! - `starkcodec.calls_decoded`       counter, tagged with function
//! - `starkcodec.events_decoded`      counter, tagged with event
//! - `starkcodec.anonymous_fallbacks` counter, tagged with kind (call | event)
//! - `starkcodec.decode_errors`       counter, tagged with error_type
//! - `starkcodec.proxy_resolutions`   counter, tagged with strategy
//! - `starkcodec.abi_cache_hits`      counter
//! - `starkcodec.decode_latency_ms`   histogram
//! - `starkcodec.batch_size`          histogram
//!
//! ## Structured logging
//! JSON or human-readable logs, with levels configurable per component.

pub mod metrics;
pub mod tracing_setup;

pub use metrics::StarkCodecMetrics;
pub use tracing_setup::{init_tracing, LogConfig};
