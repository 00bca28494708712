//! StarkCodec metrics definitions.
//!
//! All metrics use OpenTelemetry conventions.
//! They can be exported through any OpenTelemetry SDK pipeline.

use opentelemetry::{
    metrics::{Counter, Histogram, Meter},
    KeyValue,
};

/// Central metrics handle for StarkCodec.
#[derive(Clone)]
pub struct StarkCodecMetrics {
    pub calls_decoded: Counter<u64>,
    pub events_decoded: Counter<u64>,
    pub anonymous_fallbacks: Counter<u64>,
    pub decode_errors: Counter<u64>,
    pub proxy_resolutions: Counter<u64>,
    pub abi_cache_hits: Counter<u64>,
    pub decode_latency_ms: Histogram<f64>,
    pub batch_size: Histogram<u64>,
}

impl StarkCodecMetrics {
    pub fn new(meter: &Meter) -> Self {
        Self {
            calls_decoded: meter
                .u64_counter("starkcodec.calls_decoded")
                .with_description("Function calls and constructor invocations decoded")
                .build(),
            events_decoded: meter
                .u64_counter("starkcodec.events_decoded")
                .with_description("Events decoded against an ABI definition")
                .build(),
            anonymous_fallbacks: meter
                .u64_counter("starkcodec.anonymous_fallbacks")
                .with_description("Calls or events decoded anonymously for lack of a schema")
                .build(),
            decode_errors: meter
                .u64_counter("starkcodec.decode_errors")
                .with_description("Decode calls that failed on a structural error")
                .build(),
            proxy_resolutions: meter
                .u64_counter("starkcodec.proxy_resolutions")
                .with_description("Proxy implementation lookups, by outcome")
                .build(),
            abi_cache_hits: meter
                .u64_counter("starkcodec.abi_cache_hits")
                .with_description("Classified ABI cache hits")
                .build(),
            decode_latency_ms: meter
                .f64_histogram("starkcodec.decode_latency_ms")
                .with_description("Time to decode a single call or event in milliseconds")
                .build(),
            batch_size: meter
                .u64_histogram("starkcodec.batch_size")
                .with_description("Number of events in a batch decode request")
                .build(),
        }
    }

    pub fn record_call(&self, function: &str) {
        self.calls_decoded
            .add(1, &[KeyValue::new("function", function.to_string())]);
    }

    pub fn record_event(&self, event: &str) {
        self.events_decoded
            .add(1, &[KeyValue::new("event", event.to_string())]);
    }

    /// `kind` is `"call"` or `"event"`.
    pub fn record_anonymous(&self, kind: &'static str) {
        self.anonymous_fallbacks.add(1, &[KeyValue::new("kind", kind)]);
    }

    pub fn record_error(&self, error_type: &str) {
        self.decode_errors
            .add(1, &[KeyValue::new("error_type", error_type.to_string())]);
    }

    /// `strategy` is the winning strategy name, or `"none"`.
    pub fn record_resolution(&self, strategy: &str) {
        self.proxy_resolutions
            .add(1, &[KeyValue::new("strategy", strategy.to_string())]);
    }

    pub fn record_cache_hits(&self, hits: u64) {
        self.abi_cache_hits.add(hits, &[]);
    }

    pub fn record_latency(&self, ms: f64, operation: &'static str) {
        self.decode_latency_ms
            .record(ms, &[KeyValue::new("operation", operation)]);
    }

    pub fn record_batch(&self, size: usize) {
        self.batch_size.record(size as u64, &[]);
    }
}

impl std::fmt::Debug for StarkCodecMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StarkCodecMetrics").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_against_noop_meter() {
        let meter = opentelemetry::global::meter("starkcodec-test");
        let metrics = StarkCodecMetrics::new(&meter);
        metrics.record_call("transfer");
        metrics.record_event("Transfer");
        metrics.record_anonymous("event");
        metrics.record_error("unsupported_shape");
        metrics.record_resolution("getter");
        metrics.record_cache_hits(3);
        metrics.record_latency(0.4, "decode_call");
        metrics.record_batch(128);
    }
}
