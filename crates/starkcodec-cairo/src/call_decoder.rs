//! Cairo calldata and constructor decoder.
//!
//! Decodes a flat felt array into named inputs using a classified ABI.
//!
//! # How it works
//! Calldata carries no type or length tags. The decoder walks the declared
//! inputs left to right with a slot cursor:
//! - an input followed by a `T*` input holds that array's length; the pair
//!   produces one output named after the array, typed `T[len]`
//! - `felt` takes one slot, a 2-tuple takes two
//! - a struct takes its schema-declared `size`, members read at `offset`

use starkcodec_core::{
    abi::{AbiField, FunctionAbi, TypeShape},
    call::{DecodedInput, OrganizedFunction, ANONYMOUS},
    classified::ClassifiedAbi,
    error::{DecodeError, DecodeWarning},
    felt::Felt,
    selector::Selector,
    value::{FeltValue, StructValue},
};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::normalizer;

/// Guard against self-referential struct definitions.
const MAX_STRUCT_DEPTH: usize = 32;

/// Cairo function-call decoder bound to one contract's classified ABI.
#[derive(Debug, Clone)]
pub struct CairoCallDecoder {
    abi: Arc<ClassifiedAbi>,
}

impl CairoCallDecoder {
    pub fn new(abi: Arc<ClassifiedAbi>) -> Self {
        Self { abi }
    }

    /// Create a decoder from StarkNet ABI JSON.
    ///
    /// # Errors
    /// Returns `DecodeError` if the JSON is not a valid ABI array.
    pub fn from_abi_json(abi_json: &str) -> Result<Self, DecodeError> {
        Ok(Self::new(Arc::new(ClassifiedAbi::from_json(abi_json)?)))
    }

    pub fn abi(&self) -> &ClassifiedAbi {
        &self.abi
    }

    /// Decode calldata against a function entry, or positionally when there is none.
    pub fn decode_function(
        &self,
        calldata: &[Felt],
        function: Option<&FunctionAbi>,
    ) -> Result<OrganizedFunction, DecodeError> {
        let Some(function) = function else {
            return Ok(OrganizedFunction::anonymous(calldata));
        };

        let mut warnings = Vec::new();
        let (inputs, consumed) =
            FieldDecoder::new(&self.abi, calldata).decode_fields(&function.inputs, 0, &mut warnings)?;
        if consumed < calldata.len() {
            debug!(
                function = %function.name,
                consumed,
                total = calldata.len(),
                "calldata has trailing slots beyond the declared inputs"
            );
        }

        Ok(OrganizedFunction {
            name: function.name.clone(),
            inputs,
            warnings,
        })
    }

    /// Decode an invocation by its on-chain entry point selector.
    /// Unknown selectors fall back to the anonymous representation.
    pub fn decode_invocation(
        &self,
        entry_point_selector: &Felt,
        calldata: &[Felt],
    ) -> Result<OrganizedFunction, DecodeError> {
        let function = Selector::from_felt(entry_point_selector).and_then(|s| self.abi.function(&s));
        if function.is_none() {
            debug!(selector = %entry_point_selector, "no ABI entry for selector, decoding anonymously");
        }
        self.decode_function(calldata, function)
    }

    /// Decode deploy calldata against the ABI's constructor.
    pub fn decode_constructor(&self, calldata: &[Felt]) -> Result<OrganizedFunction, DecodeError> {
        self.decode_function(calldata, self.abi.constructor())
    }

    /// Decode one struct instance starting at `start_index`.
    /// Returns the value and the number of slots the struct occupies.
    pub fn decode_struct(
        &self,
        calldata: &[Felt],
        start_index: usize,
        struct_type: &str,
    ) -> Result<(StructValue, usize), DecodeError> {
        let mut warnings = Vec::new();
        FieldDecoder::new(&self.abi, calldata).decode_struct(start_index, struct_type, 0, &mut warnings)
    }

    /// Returns all function names in this ABI.
    pub fn function_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.abi.functions().map(|(_, f)| f.name.as_str()).collect();
        names.sort_unstable();
        names
    }
}

/// Recursive positional decoder over one felt array.
///
/// Shared by calldata and event-data decoding; the cursor is local to each
/// `decode_fields` call so instances are freely shareable.
pub(crate) struct FieldDecoder<'a> {
    abi: &'a ClassifiedAbi,
    felts: &'a [Felt],
}

impl<'a> FieldDecoder<'a> {
    pub(crate) fn new(abi: &'a ClassifiedAbi, felts: &'a [Felt]) -> Self {
        Self { abi, felts }
    }

    fn slot(&self, field: &str, index: usize) -> Result<&'a Felt, DecodeError> {
        self.felts.get(index).ok_or_else(|| DecodeError::CalldataExhausted {
            field: field.to_string(),
            index,
            len: self.felts.len(),
        })
    }

    fn ensure_slots(&self, field: &str, start: usize, count: usize) -> Result<(), DecodeError> {
        match start.checked_add(count) {
            Some(end) if end <= self.felts.len() => Ok(()),
            _ => Err(DecodeError::CalldataExhausted {
                field: field.to_string(),
                index: start.saturating_add(count).saturating_sub(1),
                len: self.felts.len(),
            }),
        }
    }

    /// Decode `fields` starting at slot `start`.
    /// Returns the decoded inputs and the number of slots consumed.
    pub(crate) fn decode_fields(
        &self,
        fields: &[AbiField],
        start: usize,
        warnings: &mut Vec<DecodeWarning>,
    ) -> Result<(Vec<DecodedInput>, usize), DecodeError> {
        let mut out = Vec::with_capacity(fields.len());
        let mut cursor = start;
        let mut i = 0;

        while i < fields.len() {
            let field = &fields[i];

            // `x_len: felt, x: T*`: the current entry is the length of the next
            let next_array = fields.get(i + 1).and_then(|next| match next.shape() {
                TypeShape::Array(elem) => Some((next, elem)),
                _ => None,
            });
            if let Some((array, elem)) = next_array {
                let raw_len = self.slot(&field.name, cursor)?;
                cursor += 1;
                let len = match raw_len.to_usize() {
                    Some(n) => n,
                    None => {
                        warn!(field = %field.name, raw = %raw_len, "malformed array length, using 0");
                        warnings.push(DecodeWarning::MalformedLength {
                            field: field.name.clone(),
                            raw: raw_len.to_string(),
                        });
                        0
                    }
                };
                let (value, consumed) = self.decode_array(array, elem, len, cursor, warnings)?;
                cursor += consumed;
                out.push(DecodedInput {
                    name: array.name.clone(),
                    ty: format!("{elem}[{len}]"),
                    value,
                    decimal: None,
                });
                i += 2;
                continue;
            }

            match field.shape() {
                TypeShape::Array(_) => {
                    debug!(field = %field.name, ty = %field.ty, "array input without a length entry, skipping");
                }
                TypeShape::Felt => {
                    let felt = self.slot(&field.name, cursor)?.clone();
                    cursor += 1;
                    out.push(DecodedInput {
                        name: field.name.clone(),
                        ty: field.ty.clone(),
                        decimal: normalizer::felt_decimal(&felt),
                        value: FeltValue::Felt(felt),
                    });
                }
                TypeShape::Tuple(parts) => {
                    let tuple = self.decode_tuple(&field.name, &field.ty, &parts, cursor)?;
                    cursor += tuple.len();
                    out.push(DecodedInput {
                        name: field.name.clone(),
                        ty: field.ty.clone(),
                        value: FeltValue::Tuple(tuple),
                        decimal: None,
                    });
                }
                TypeShape::Struct(name) => {
                    let (value, size) = self.decode_struct(cursor, name, 0, warnings)?;
                    cursor += size;
                    out.push(DecodedInput {
                        name: field.name.clone(),
                        ty: field.ty.clone(),
                        decimal: normalizer::uint256_decimal(name, &value),
                        value: FeltValue::Struct(value),
                    });
                }
            }
            i += 1;
        }

        Ok((out, cursor - start))
    }

    fn decode_array(
        &self,
        array: &AbiField,
        elem: &str,
        len: usize,
        start: usize,
        warnings: &mut Vec<DecodeWarning>,
    ) -> Result<(FeltValue, usize), DecodeError> {
        match TypeShape::parse(elem) {
            TypeShape::Felt => {
                self.ensure_slots(&array.name, start, len)?;
                Ok((FeltValue::FeltArray(self.felts[start..start + len].to_vec()), len))
            }
            TypeShape::Struct(name) => {
                if len == 0 {
                    return Ok((FeltValue::StructArray(Vec::new()), 0));
                }
                // every element takes at least one slot
                self.ensure_slots(&array.name, start, len)?;

                let (first, size) = self.decode_struct(start, name, 0, warnings)?;
                let total = size.checked_mul(len).ok_or_else(|| DecodeError::CalldataExhausted {
                    field: array.name.clone(),
                    index: usize::MAX,
                    len: self.felts.len(),
                })?;
                self.ensure_slots(&array.name, start, total)?;

                let mut items = Vec::with_capacity(len);
                items.push(first);
                for k in 1..len {
                    let (item, _) = self.decode_struct(start + k * size, name, 0, warnings)?;
                    items.push(item);
                }
                Ok((FeltValue::StructArray(items), total))
            }
            TypeShape::Tuple(_) | TypeShape::Array(_) => Err(DecodeError::unsupported(
                &array.name,
                &array.ty,
                "arrays may only hold felts or structs",
            )),
        }
    }

    fn decode_tuple(
        &self,
        field: &str,
        ty: &str,
        parts: &[&str],
        start: usize,
    ) -> Result<Vec<Felt>, DecodeError> {
        if parts.len() != 2 {
            return Err(DecodeError::unsupported(
                field,
                ty,
                format!("tuple arity {} (only 2-tuples are supported)", parts.len()),
            ));
        }
        if let Some(part) = parts.iter().find(|p| TypeShape::parse(tuple_element_type(p)) != TypeShape::Felt) {
            return Err(DecodeError::unsupported(
                field,
                ty,
                format!("tuple element '{}' is not a felt", part),
            ));
        }
        self.ensure_slots(field, start, 2)?;
        Ok(self.felts[start..start + 2].to_vec())
    }

    /// Decode one struct instance at `start`; returns its value and declared size.
    pub(crate) fn decode_struct(
        &self,
        start: usize,
        struct_type: &str,
        depth: usize,
        warnings: &mut Vec<DecodeWarning>,
    ) -> Result<(StructValue, usize), DecodeError> {
        if depth > MAX_STRUCT_DEPTH {
            return Err(DecodeError::unsupported(
                struct_type,
                struct_type,
                format!("struct nesting deeper than {MAX_STRUCT_DEPTH}"),
            ));
        }

        let Some(def) = self.abi.struct_def(struct_type) else {
            warn!(ty = %struct_type, slot = start, "struct schema missing, reading one slot as anonymous");
            warnings.push(DecodeWarning::StructSchemaAbsent {
                ty: struct_type.to_string(),
                slot: start,
            });
            let mut value = StructValue::with_capacity(1);
            value.insert(ANONYMOUS.into(), FeltValue::Felt(self.slot(struct_type, start)?.clone()));
            return Ok((value, 1));
        };

        let mut value = StructValue::with_capacity(def.members.len());
        for member in &def.members {
            let at = start + member.offset as usize;
            let decoded = match TypeShape::parse(&member.ty) {
                TypeShape::Felt => FeltValue::Felt(self.slot(&member.name, at)?.clone()),
                TypeShape::Array(_) => {
                    return Err(DecodeError::unsupported(
                        &member.name,
                        &member.ty,
                        "pointer members inside a struct carry no per-instance length",
                    ))
                }
                TypeShape::Tuple(parts) => {
                    FeltValue::Tuple(self.decode_tuple(&member.name, &member.ty, &parts, at)?)
                }
                TypeShape::Struct(inner) => {
                    let (nested, _) = self.decode_struct(at, inner, depth + 1, warnings)?;
                    FeltValue::Struct(nested)
                }
            };
            value.insert(member.name.clone(), decoded);
        }

        Ok((value, def.size as usize))
    }
}

/// Drop a `name:` label from a tuple element, e.g. `x: felt` -> `felt`.
fn tuple_element_type(part: &str) -> &str {
    match part.split_once(':') {
        Some((label, ty)) if !label.contains('(') => ty.trim(),
        _ => part.trim(),
    }
}
