//! Raw and organized event types.

use crate::call::{EventArgument, ANONYMOUS};
use crate::error::DecodeWarning;
use crate::felt::Felt;
use crate::value::FeltValue;
use serde::{Deserialize, Serialize};

/// An emitted event as received from a transaction receipt.
/// This is the input to the event decoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    /// Contract that emitted the event
    #[serde(alias = "from_address")]
    pub transmitter: Felt,
    /// `keys[0]` is normally the event selector
    pub keys: Vec<Felt>,
    pub data: Vec<Felt>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<Felt>,
}

impl RawEvent {
    pub fn new(transmitter: impl Into<Felt>, keys: Vec<Felt>, data: Vec<Felt>) -> Self {
        Self {
            transmitter: transmitter.into(),
            keys,
            data,
            block_number: None,
            transaction_hash: None,
        }
    }
}

/// A decoded event, or its anonymous wrapper when no ABI definition matched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganizedEvent {
    pub name: String,
    pub transmitter_contract: Felt,
    pub arguments: Vec<EventArgument>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<DecodeWarning>,
}

impl OrganizedEvent {
    /// Wrap the whole raw event as a single `anonymous` argument.
    pub fn anonymous(raw: RawEvent) -> Self {
        let transmitter_contract = raw.transmitter.clone();
        Self {
            name: ANONYMOUS.into(),
            transmitter_contract,
            arguments: vec![EventArgument {
                name: ANONYMOUS.into(),
                ty: "event".into(),
                value: FeltValue::RawEvent(Box::new(raw)),
                decimal: None,
            }],
            warnings: Vec::new(),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.name == ANONYMOUS
    }

    /// Get an argument by name.
    pub fn argument(&self, name: &str) -> Option<&EventArgument> {
        self.arguments.iter().find(|a| a.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_wraps_raw_event() {
        let raw = RawEvent::new("0xabc", vec!["0x1".into()], vec!["0x2".into()]);
        let ev = OrganizedEvent::anonymous(raw.clone());
        assert!(ev.is_anonymous());
        assert_eq!(ev.transmitter_contract, Felt::from("0xabc"));
        assert_eq!(ev.arguments.len(), 1);
        assert_eq!(ev.arguments[0].value, FeltValue::RawEvent(Box::new(raw)));
    }

    #[test]
    fn raw_event_accepts_from_address_alias() {
        let raw: RawEvent = serde_json::from_str(
            r#"{"from_address": "0x1", "keys": ["0x2"], "data": []}"#,
        )
        .unwrap();
        assert_eq!(raw.transmitter, Felt::from("0x1"));
        assert!(raw.block_number.is_none());
    }
}
