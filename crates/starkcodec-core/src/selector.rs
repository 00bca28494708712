//! StarkNet selector computation.
//!
//! The ledger routes calls and events by `starknet_keccak(name)`: the
//! keccak256 digest of the ASCII name with everything above the low 250 bits
//! cleared. For emitted events, `keys[0]` IS the selector, so lookups by
//! on-chain key and lookups by source name land on the same map entry.

use crate::felt::Felt;
use alloy_primitives::U256;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use tiny_keccak::{Hasher, Keccak};

/// A 250-bit entrypoint or event selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Selector(U256);

impl Selector {
    /// Compute the selector for a function, event, or entrypoint name.
    pub fn from_name(name: &str) -> Self {
        let mut hasher = Keccak::v256();
        let mut output = [0u8; 32];
        hasher.update(name.as_bytes());
        hasher.finalize(&mut output);
        // keep the low 250 bits: the top byte retains only its 2 lowest bits
        output[0] &= 0x03;
        Self(U256::from_be_bytes(output))
    }

    /// Interpret an on-chain value (event key, entry point selector) as a selector.
    pub fn from_felt(felt: &Felt) -> Option<Self> {
        felt.to_u256().map(Self)
    }

    pub fn as_u256(&self) -> U256 {
        self.0
    }

    pub fn to_felt(&self) -> Felt {
        Felt::from_u256(self.0)
    }

    /// Raw 32-byte big-endian hex, zero-padded (`0x` + 64 digits).
    pub fn to_padded_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0.to_be_bytes::<32>()))
    }
}

/// Shorthand for [`Selector::from_name`].
pub fn selector_of(name: &str) -> Selector {
    Selector::from_name(name)
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

impl Serialize for Selector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Selector {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Selector::from_felt(&Felt::new(raw.as_str()))
            .ok_or_else(|| de::Error::custom(format!("invalid selector hex: {raw}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_decimal(s: &str) -> Selector {
        Selector(U256::from_str_radix(s, 10).unwrap())
    }

    #[test]
    fn constructor_selector() {
        assert_eq!(
            selector_of("constructor"),
            from_decimal(
                "1159040026212278395030414237414753050475174923702621880048416706425641521556"
            )
        );
    }

    #[test]
    fn validate_selector() {
        assert_eq!(
            selector_of("__validate__"),
            from_decimal(
                "626969833899987279399947180575486623810258720106406659648356883742278317941"
            )
        );
    }

    #[test]
    fn execute_selector_hex() {
        assert_eq!(
            selector_of("__execute__").to_string(),
            "0x15d40a3d6ca2ac30f4031e42be28da9b056fef9bb7357ac5e85627ee876e5ad"
        );
    }

    #[test]
    fn transfer_event_key() {
        assert_eq!(
            selector_of("Transfer").to_string(),
            "0x99cd8bde557814842a3121e8ddfd433a539b8c9f14bf31ebf108d12e6196e9"
        );
    }

    #[test]
    fn selector_fits_250_bits() {
        for name in ["transfer", "balanceOf", "Upgraded", "get_implementation"] {
            assert!(selector_of(name).as_u256().bit_len() <= 250);
        }
    }

    #[test]
    fn padded_key_matches_unpadded() {
        let sel = selector_of("Transfer");
        let padded = Felt::new(sel.to_padded_hex());
        assert_eq!(Selector::from_felt(&padded), Some(sel));
    }

    #[test]
    fn serde_roundtrip_as_hex_string() {
        let sel = selector_of("transfer");
        let json = serde_json::to_string(&sel).unwrap();
        let back: Selector = serde_json::from_str(&json).unwrap();
        assert_eq!(sel, back);
    }
}
