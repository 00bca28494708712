//! Rayon-powered batch decode over events from many contracts.
//!
//! Each event is decoded against its transmitter's classified ABI, supplied by
//! a lookup closure (usually backed by the ABI cache). Events whose
//! transmitter has no ABI come back anonymous rather than failing.

use serde::{Deserialize, Serialize};
use starkcodec_core::{
    classified::ClassifiedAbi,
    error::DecodeError,
    event::{OrganizedEvent, RawEvent},
    felt::Felt,
};
use rayon::prelude::*;
use std::sync::Arc;
use thiserror::Error;

use crate::decoder::CairoEventDecoder;

/// How a batch treats per-item decode errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorMode {
    /// Drop failed items silently.
    Skip,
    /// Keep failed items' indices and errors alongside the successes.
    #[default]
    Collect,
    /// Abort the batch on the first failure.
    Throw,
}

#[derive(Debug, Error)]
pub enum BatchDecodeError {
    #[error("Batch item {index} failed: {source}")]
    ItemFailed {
        index: usize,
        #[source]
        source: DecodeError,
    },
}

/// Successes in input order, plus `(index, error)` for failures.
#[derive(Debug, Default)]
pub struct BatchDecodeResult {
    pub events: Vec<OrganizedEvent>,
    pub errors: Vec<(usize, DecodeError)>,
}

/// Decode a slice of raw events in parallel using Rayon.
/// Returns `(successes, errors)`.
pub fn parallel_decode<F>(
    decoder: &CairoEventDecoder,
    events: &[RawEvent],
    lookup: F,
) -> (Vec<OrganizedEvent>, Vec<(usize, DecodeError)>)
where
    F: Fn(&Felt) -> Option<Arc<ClassifiedAbi>> + Sync,
{
    let results: Vec<(usize, Result<OrganizedEvent, DecodeError>)> = events
        .par_iter()
        .enumerate()
        .map(|(idx, raw)| match lookup(&raw.transmitter) {
            None => (idx, Ok(OrganizedEvent::anonymous(raw.clone()))),
            Some(abi) => (idx, decoder.decode_event(raw, &abi)),
        })
        .collect();

    let mut decoded = Vec::with_capacity(events.len());
    let mut errors = Vec::new();
    for (idx, r) in results {
        match r {
            Ok(e) => decoded.push(e),
            Err(e) => errors.push((idx, e)),
        }
    }
    (decoded, errors)
}

/// Chunk `events` into slices of at most `chunk_size` and decode each chunk
/// in parallel. Error indices refer to the whole input slice.
pub fn chunked_decode<F>(
    decoder: &CairoEventDecoder,
    events: &[RawEvent],
    lookup: F,
    chunk_size: usize,
) -> (Vec<OrganizedEvent>, Vec<(usize, DecodeError)>)
where
    F: Fn(&Felt) -> Option<Arc<ClassifiedAbi>> + Sync,
{
    let mut all_events = Vec::new();
    let mut all_errors = Vec::new();
    let mut offset = 0;

    for chunk in events.chunks(chunk_size.max(1)) {
        let (mut evts, errs) = parallel_decode(decoder, chunk, &lookup);
        all_events.append(&mut evts);
        for (idx, err) in errs {
            all_errors.push((offset + idx, err));
        }
        offset += chunk.len();
    }

    (all_events, all_errors)
}

/// Parallel decode with an explicit error policy.
pub fn decode_events_parallel<F>(
    decoder: &CairoEventDecoder,
    events: &[RawEvent],
    lookup: F,
    mode: ErrorMode,
) -> Result<BatchDecodeResult, BatchDecodeError>
where
    F: Fn(&Felt) -> Option<Arc<ClassifiedAbi>> + Sync,
{
    let (decoded, errors) = parallel_decode(decoder, events, lookup);
    apply_mode(decoded, errors, mode)
}

/// Chunked decode with an explicit error policy.
pub fn decode_events_chunked<F>(
    decoder: &CairoEventDecoder,
    events: &[RawEvent],
    lookup: F,
    chunk_size: usize,
    mode: ErrorMode,
) -> Result<BatchDecodeResult, BatchDecodeError>
where
    F: Fn(&Felt) -> Option<Arc<ClassifiedAbi>> + Sync,
{
    let (decoded, errors) = chunked_decode(decoder, events, lookup, chunk_size);
    apply_mode(decoded, errors, mode)
}

fn apply_mode(
    events: Vec<OrganizedEvent>,
    errors: Vec<(usize, DecodeError)>,
    mode: ErrorMode,
) -> Result<BatchDecodeResult, BatchDecodeError> {
    match mode {
        ErrorMode::Skip => Ok(BatchDecodeResult { events, errors: Vec::new() }),
        ErrorMode::Collect => Ok(BatchDecodeResult { events, errors }),
        ErrorMode::Throw => match errors.into_iter().min_by_key(|(idx, _)| *idx) {
            Some((index, source)) => Err(BatchDecodeError::ItemFailed { index, source }),
            None => Ok(BatchDecodeResult { events, errors: Vec::new() }),
        },
    }
}
