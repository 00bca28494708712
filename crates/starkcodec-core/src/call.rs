//! Types for organized function calls and constructor invocations.
//!
//! These are the output types when decoding transaction calldata
//! (as opposed to emitted events, which produce `OrganizedEvent`).

use crate::error::DecodeWarning;
use crate::felt::Felt;
use crate::value::FeltValue;
use serde::{Deserialize, Serialize};

/// Name used for every schema-less representation.
pub const ANONYMOUS: &str = "anonymous";

/// One decoded, named value: a function input or an event argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedInput {
    pub name: String,
    /// ABI type, with arrays rendered as `elem[len]`
    #[serde(rename = "type")]
    pub ty: String,
    pub value: FeltValue,
    /// Unsigned decimal rendering, for hex felts and `Uint256` structs only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimal: Option<String>,
}

pub type FunctionInput = DecodedInput;
pub type EventArgument = DecodedInput;

/// Result of organizing a call's calldata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganizedFunction {
    /// Function name, or `anonymous` when no ABI entry was available
    pub name: String,
    /// Decoded inputs in declaration order
    pub inputs: Vec<FunctionInput>,
    /// Recoverable problems met while decoding
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<DecodeWarning>,
}

impl OrganizedFunction {
    /// Positional `input_N` representation used when no schema is known.
    pub fn anonymous(calldata: &[Felt]) -> Self {
        let inputs = calldata
            .iter()
            .enumerate()
            .map(|(i, felt)| DecodedInput {
                name: format!("input_{i}"),
                ty: "felt".into(),
                value: FeltValue::Felt(felt.clone()),
                decimal: felt.to_decimal(),
            })
            .collect();
        Self {
            name: ANONYMOUS.into(),
            inputs,
            warnings: Vec::new(),
        }
    }

    /// Look up a decoded input by name.
    pub fn input(&self, name: &str) -> Option<&FunctionInput> {
        self.inputs.iter().find(|i| i.name == name)
    }

    pub fn is_anonymous(&self) -> bool {
        self.name == ANONYMOUS
    }

    /// Returns true if decoding met no recoverable problems.
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}
