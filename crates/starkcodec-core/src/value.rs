//! Decoded felt values.
//!
//! Every decoded input or event argument carries one of these shapes. Raw
//! felts are reproduced verbatim; structure comes purely from the ABI.

use crate::event::RawEvent;
use crate::felt::Felt;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Struct instance: member name → value, in schema member order.
pub type StructValue = IndexMap<String, FeltValue>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FeltValue {
    Felt(Felt),
    FeltArray(Vec<Felt>),
    Struct(StructValue),
    StructArray(Vec<StructValue>),
    Tuple(Vec<Felt>),
    /// The undecoded event, used by the anonymous event form.
    RawEvent(Box<RawEvent>),
}

impl FeltValue {
    pub fn as_felt(&self) -> Option<&Felt> {
        match self {
            FeltValue::Felt(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&StructValue> {
        match self {
            FeltValue::Struct(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_felt_array(&self) -> Option<&[Felt]> {
        match self {
            FeltValue::FeltArray(v) | FeltValue::Tuple(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_struct_array(&self) -> Option<&[StructValue]> {
        match self {
            FeltValue::StructArray(v) => Some(v),
            _ => None,
        }
    }
}

fn fmt_struct(f: &mut fmt::Formatter<'_>, s: &StructValue) -> fmt::Result {
    let parts: Vec<_> = s.iter().map(|(k, v)| format!("{k}: {v}")).collect();
    write!(f, "{{{}}}", parts.join(", "))
}

fn join_felts(v: &[Felt]) -> String {
    v.iter().map(|x| x.to_string()).collect::<Vec<_>>().join(", ")
}

impl fmt::Display for FeltValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeltValue::Felt(v) => write!(f, "{v}"),
            FeltValue::FeltArray(v) => write!(f, "[{}]", join_felts(v)),
            FeltValue::Tuple(v) => write!(f, "({})", join_felts(v)),
            FeltValue::Struct(s) => fmt_struct(f, s),
            FeltValue::StructArray(items) => {
                write!(f, "[")?;
                for (i, s) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    fmt_struct(f, s)?;
                }
                write!(f, "]")
            }
            FeltValue::RawEvent(raw) => write!(
                f,
                "<event from {} keys=[{}] data=[{}]>",
                raw.transmitter,
                join_felts(&raw.keys),
                join_felts(&raw.data)
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn struct_display_keeps_member_order() {
        let mut s = StructValue::new();
        s.insert("low".into(), FeltValue::Felt("0x1".into()));
        s.insert("high".into(), FeltValue::Felt("0x0".into()));
        assert_eq!(FeltValue::Struct(s).to_string(), "{low: 0x1, high: 0x0}");
    }

    #[test]
    fn tagged_serde_roundtrip() {
        let v = FeltValue::Tuple(vec!["0x1".into(), "0x2".into()]);
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["kind"], "tuple");
        let back: FeltValue = serde_json::from_value(json).unwrap();
        assert_eq!(v, back);
    }
}
