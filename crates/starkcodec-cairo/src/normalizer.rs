//! Decimal side-channel for decoded values.
//!
//! Felts stay hex strings; consumers that want numbers get an unsigned
//! decimal string next to the value, computed only where the meaning is
//! unambiguous: plain felts that parse as hex, and two-limb `Uint256`s.

use alloy_primitives::U256;
use starkcodec_core::{felt::Felt, value::StructValue};

/// Name of the two-limb 256-bit integer struct.
pub const UINT256: &str = "Uint256";

const LIMB_BITS: usize = 128;

/// Decimal rendering of a scalar felt, if it parses as hex.
pub fn felt_decimal(felt: &Felt) -> Option<String> {
    felt.to_decimal()
}

/// `low + high·2^128` for a struct named `Uint256` with exactly the members
/// `low` and `high`, both 128-bit felts. Any other struct gets no decimal.
pub fn uint256_decimal(type_name: &str, value: &StructValue) -> Option<String> {
    if type_name != UINT256 || value.len() != 2 {
        return None;
    }
    let low = limb(value, "low")?;
    let high = limb(value, "high")?;
    let combined = (high << LIMB_BITS).checked_add(low)?;
    Some(combined.to_string())
}

fn limb(value: &StructValue, name: &str) -> Option<U256> {
    let v = value.get(name)?.as_felt()?.to_u256()?;
    (v.bit_len() <= LIMB_BITS).then_some(v)
}
