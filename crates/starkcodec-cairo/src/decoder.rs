//! `CairoEventDecoder`: turns emitted events into organized events.

use starkcodec_core::{
    abi::EventAbi,
    classified::ClassifiedAbi,
    error::DecodeError,
    event::{OrganizedEvent, RawEvent},
    felt::Felt,
    selector::Selector,
};
use tracing::debug;

use crate::call_decoder::FieldDecoder;

/// The Cairo event decoder.
/// Stateless and cheap to clone; one instance serves every contract.
#[derive(Debug, Default, Clone, Copy)]
pub struct CairoEventDecoder;

impl CairoEventDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Find the event definition for `keys`.
    ///
    /// Keys are tried in order and the first one naming a known event wins,
    /// even when a later key would also match. Returns the matching key's
    /// index alongside the definition.
    pub fn match_event<'a>(keys: &[Felt], abi: &'a ClassifiedAbi) -> Option<(usize, &'a EventAbi)> {
        keys.iter().enumerate().find_map(|(i, key)| {
            let selector = Selector::from_felt(key)?;
            abi.event(&selector).map(|event| (i, event))
        })
    }

    /// Decode one raw event against a classified ABI.
    ///
    /// An event with no matching key comes back in the anonymous form.
    pub fn decode_event(&self, raw: &RawEvent, abi: &ClassifiedAbi) -> Result<OrganizedEvent, DecodeError> {
        let Some((key_index, event)) = Self::match_event(&raw.keys, abi) else {
            debug!(transmitter = %raw.transmitter, keys = raw.keys.len(), "no event definition matched");
            return Ok(OrganizedEvent::anonymous(raw.clone()));
        };
        if key_index > 0 {
            debug!(event = %event.name, key_index, "event matched on a non-leading key");
        }

        let mut warnings = Vec::new();
        let (arguments, _) = FieldDecoder::new(abi, &raw.data).decode_fields(&event.data, 0, &mut warnings)?;

        Ok(OrganizedEvent {
            name: event.name.clone(),
            transmitter_contract: raw.transmitter.clone(),
            arguments,
            warnings,
        })
    }
}
