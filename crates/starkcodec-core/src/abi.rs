//! StarkNet (Cairo 0) ABI model.
//!
//! An ABI is a flat JSON array of entries discriminated by `type`:
//! `function`, `l1_handler`, `constructor`, `struct`, and `event`. Entries of
//! any other kind (Cairo 1 `interface`, `impl`, `enum`, ...) are kept as
//! [`AbiEntry::Other`] and ignored by classification.

use crate::error::DecodeError;
use serde::{Deserialize, Serialize};

/// A named, typed slot in a function signature or event payload.
///
/// `ty` is one of `felt`, `felt*`, `StructName`, `StructName*`, or a tuple
/// literal such as `(felt, felt)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiField {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

impl AbiField {
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
        }
    }

    /// `true` for pointer types (`felt*`, `Struct*`).
    pub fn is_array(&self) -> bool {
        self.ty.ends_with('*')
    }

    pub fn shape(&self) -> TypeShape<'_> {
        TypeShape::parse(&self.ty)
    }
}

/// A struct member, located by its slot offset within the struct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructMember {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    pub offset: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionKind {
    #[default]
    Function,
    Constructor,
    L1Handler,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionAbi {
    #[serde(rename = "type")]
    pub kind: FunctionKind,
    pub name: String,
    #[serde(default)]
    pub inputs: Vec<AbiField>,
    #[serde(default)]
    pub outputs: Vec<AbiField>,
    #[serde(rename = "stateMutability", default, skip_serializing_if = "Option::is_none")]
    pub state_mutability: Option<String>,
}

impl FunctionAbi {
    pub fn new(kind: FunctionKind, name: impl Into<String>, inputs: Vec<AbiField>) -> Self {
        Self {
            kind,
            name: name.into(),
            inputs,
            outputs: Vec::new(),
            state_mutability: None,
        }
    }

    /// Mark the function as a read-only view.
    pub fn view(mut self) -> Self {
        self.state_mutability = Some("view".into());
        self
    }

    pub fn is_view(&self) -> bool {
        self.state_mutability.as_deref() == Some("view")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructKind {
    #[default]
    Struct,
}

/// A struct definition. `size` is the number of felt slots an instance
/// occupies wherever it appears; decoding trusts it rather than deriving it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructAbi {
    #[serde(rename = "type")]
    pub kind: StructKind,
    pub name: String,
    pub size: u32,
    pub members: Vec<StructMember>,
}

impl StructAbi {
    pub fn new(name: impl Into<String>, size: u32, members: Vec<StructMember>) -> Self {
        Self {
            kind: StructKind::Struct,
            name: name.into(),
            size,
            members,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    #[default]
    Event,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventAbi {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub name: String,
    #[serde(default)]
    pub keys: Vec<AbiField>,
    #[serde(default)]
    pub data: Vec<AbiField>,
}

impl EventAbi {
    pub fn new(name: impl Into<String>, data: Vec<AbiField>) -> Self {
        Self {
            kind: EventKind::Event,
            name: name.into(),
            keys: Vec::new(),
            data,
        }
    }
}

/// One entry of a raw ABI array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AbiEntry {
    Function(FunctionAbi),
    Struct(StructAbi),
    Event(EventAbi),
    Other(serde_json::Value),
}

/// Parse ABI JSON. A JSON `null` means "no published ABI" and yields an
/// empty entry list.
pub fn parse_abi(json: &str) -> Result<Vec<AbiEntry>, DecodeError> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    parse_abi_value(value)
}

pub fn parse_abi_value(value: serde_json::Value) -> Result<Vec<AbiEntry>, DecodeError> {
    match value {
        serde_json::Value::Null => Ok(Vec::new()),
        serde_json::Value::Array(_) => Ok(serde_json::from_value(value)?),
        other => Err(DecodeError::InvalidAbi {
            reason: format!("expected a JSON array, got {}", json_kind(&other)),
        }),
    }
}

fn json_kind(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Structural reading of an ABI type string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeShape<'a> {
    Felt,
    /// `T*`, carrying the element type `T`.
    Array(&'a str),
    /// `(T1, T2, ...)`, carrying the raw element strings.
    Tuple(Vec<&'a str>),
    Struct(&'a str),
}

impl<'a> TypeShape<'a> {
    pub fn parse(ty: &'a str) -> Self {
        let ty = ty.trim();
        if let Some(elem) = ty.strip_suffix('*') {
            return TypeShape::Array(elem.trim());
        }
        if ty == "felt" {
            return TypeShape::Felt;
        }
        if let Some(inner) = ty.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
            return TypeShape::Tuple(split_top_level(inner));
        }
        TypeShape::Struct(ty)
    }
}

/// Split a tuple body on commas that are not nested inside parentheses.
fn split_top_level(inner: &str) -> Vec<&str> {
    if inner.trim().is_empty() {
        return Vec::new();
    }
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in inner.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(inner[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(inner[start..].trim());
    parts
}
