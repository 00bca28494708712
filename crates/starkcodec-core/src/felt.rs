//! Field elements as exchanged at every StarkCodec boundary.
//!
//! A felt travels as a hexadecimal string. The string is kept verbatim so
//! decoded output reproduces exactly what the ledger returned; numeric views
//! are computed on demand.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A hex-string encoded unsigned field element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Felt(String);

impl Felt {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn from_u256(value: U256) -> Self {
        Self(format!("0x{value:x}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse the hex string (with or without `0x`) into a `U256`.
    /// Returns `None` for empty or non-hex input.
    pub fn to_u256(&self) -> Option<U256> {
        let digits = self
            .0
            .strip_prefix("0x")
            .or_else(|| self.0.strip_prefix("0X"))
            .unwrap_or(&self.0);
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        U256::from_str_radix(digits, 16).ok()
    }

    /// Unsigned decimal rendering, if the felt parses as hex.
    pub fn to_decimal(&self) -> Option<String> {
        self.to_u256().map(|v| v.to_string())
    }

    /// Interpret the felt as a length or index.
    pub fn to_usize(&self) -> Option<usize> {
        let value = self.to_u256()?;
        let small = u64::try_from(value).ok()?;
        usize::try_from(small).ok()
    }

    /// Canonical `0x`-prefixed lowercase hex without leading zeros.
    /// Non-hex input is returned unchanged.
    pub fn canonical(&self) -> String {
        match self.to_u256() {
            Some(v) => format!("0x{v:x}"),
            None => self.0.clone(),
        }
    }

    /// Numeric equality: `0x00ab` and `0xAB` are the same value.
    pub fn same_value(&self, other: &Felt) -> bool {
        match (self.to_u256(), other.to_u256()) {
            (Some(a), Some(b)) => a == b,
            _ => self.0 == other.0,
        }
    }
}

impl fmt::Display for Felt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Felt {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Felt {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<U256> for Felt {
    fn from(v: U256) -> Self {
        Self::from_u256(v)
    }
}

/// Convenience: build a felt vector from string literals.
pub fn felts<S: AsRef<str>>(raw: &[S]) -> Vec<Felt> {
    raw.iter().map(|s| Felt::new(s.as_ref())).collect()
}
