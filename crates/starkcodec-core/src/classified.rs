//! One-pass ABI classification into selector/name lookup tables.

use crate::abi::{parse_abi, AbiEntry, EventAbi, FunctionAbi, FunctionKind, StructAbi};
use crate::error::DecodeError;
use crate::selector::Selector;
use std::collections::HashMap;

/// Lookup structures derived from a raw ABI.
///
/// Immutable once built; share it behind an `Arc` across threads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassifiedAbi {
    functions: HashMap<Selector, FunctionAbi>,
    structs: HashMap<String, StructAbi>,
    events: HashMap<Selector, EventAbi>,
    constructor: Option<FunctionAbi>,
}

impl ClassifiedAbi {
    /// Classify raw entries in a single linear pass.
    ///
    /// Later entries overwrite earlier ones with the same key: the last
    /// `constructor` wins, as does the last struct of a given name.
    pub fn classify(entries: &[AbiEntry]) -> Self {
        let mut out = Self::default();
        for entry in entries {
            match entry {
                AbiEntry::Function(f) => match f.kind {
                    FunctionKind::Function | FunctionKind::L1Handler => {
                        out.functions.insert(Selector::from_name(&f.name), f.clone());
                    }
                    FunctionKind::Constructor => {
                        if out.constructor.is_some() {
                            tracing::debug!(name = %f.name, "duplicate constructor in ABI, keeping the last one");
                        }
                        out.constructor = Some(f.clone());
                    }
                },
                AbiEntry::Struct(s) => {
                    if let Some(prev) = out.structs.insert(s.name.clone(), s.clone()) {
                        if prev.size != s.size {
                            tracing::debug!(
                                name = %s.name,
                                previous = prev.size,
                                current = s.size,
                                "struct redefined with a different size, keeping the last one"
                            );
                        }
                    }
                }
                AbiEntry::Event(e) => {
                    out.events.insert(Selector::from_name(&e.name), e.clone());
                }
                AbiEntry::Other(_) => {}
            }
        }
        out
    }

    /// Classify an ABI that may be absent. `None` yields an empty classification.
    pub fn classify_optional(entries: Option<&[AbiEntry]>) -> Self {
        entries.map(Self::classify).unwrap_or_default()
    }

    /// Parse and classify ABI JSON in one step.
    pub fn from_json(json: &str) -> Result<Self, DecodeError> {
        Ok(Self::classify(&parse_abi(json)?))
    }

    pub fn function(&self, selector: &Selector) -> Option<&FunctionAbi> {
        self.functions.get(selector)
    }

    pub fn function_by_name(&self, name: &str) -> Option<&FunctionAbi> {
        self.functions.get(&Selector::from_name(name))
    }

    pub fn event(&self, selector: &Selector) -> Option<&EventAbi> {
        self.events.get(selector)
    }

    pub fn struct_def(&self, name: &str) -> Option<&StructAbi> {
        self.structs.get(name)
    }

    pub fn constructor(&self) -> Option<&FunctionAbi> {
        self.constructor.as_ref()
    }

    pub fn functions(&self) -> impl Iterator<Item = (&Selector, &FunctionAbi)> {
        self.functions.iter()
    }

    pub fn events(&self) -> impl Iterator<Item = (&Selector, &EventAbi)> {
        self.events.iter()
    }

    pub fn structs(&self) -> impl Iterator<Item = &StructAbi> {
        self.structs.values()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
            && self.structs.is_empty()
            && self.events.is_empty()
            && self.constructor.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::{AbiField, EventAbi, StructMember};

    fn felt(name: &str) -> AbiField {
        AbiField::new(name, "felt")
    }

    #[test]
    fn empty_abi_classifies_to_empty() {
        assert!(ClassifiedAbi::classify(&[]).is_empty());
        assert!(ClassifiedAbi::classify_optional(None).is_empty());
        assert!(ClassifiedAbi::from_json("null").unwrap().is_empty());
    }

    #[test]
    fn functions_and_l1_handlers_keyed_by_selector() {
        let abi = ClassifiedAbi::classify(&[
            AbiEntry::Function(FunctionAbi::new(FunctionKind::Function, "transfer", vec![felt("to")])),
            AbiEntry::Function(FunctionAbi::new(FunctionKind::L1Handler, "deposit", vec![])),
        ]);
        assert_eq!(abi.function(&Selector::from_name("transfer")).unwrap().name, "transfer");
        assert!(abi.function_by_name("deposit").is_some());
        assert!(abi.function_by_name("Transfer").is_none());
        assert!(abi.constructor().is_none());
    }

    #[test]
    fn last_constructor_wins() {
        let abi = ClassifiedAbi::classify(&[
            AbiEntry::Function(FunctionAbi::new(FunctionKind::Constructor, "constructor", vec![felt("a")])),
            AbiEntry::Function(FunctionAbi::new(FunctionKind::Constructor, "constructor", vec![felt("b")])),
        ]);
        assert_eq!(abi.constructor().unwrap().inputs[0].name, "b");
        assert!(abi.function_by_name("constructor").is_none());
    }

    #[test]
    fn struct_names_are_case_sensitive() {
        let abi = ClassifiedAbi::classify(&[AbiEntry::Struct(StructAbi::new(
            "Uint256",
            2,
            vec![
                StructMember { name: "low".into(), ty: "felt".into(), offset: 0 },
                StructMember { name: "high".into(), ty: "felt".into(), offset: 1 },
            ],
        ))]);
        assert!(abi.struct_def("Uint256").is_some());
        assert!(abi.struct_def("uint256").is_none());
    }

    #[test]
    fn events_keyed_by_selector() {
        let abi = ClassifiedAbi::classify(&[AbiEntry::Event(EventAbi::new("Upgraded", vec![felt("implementation")]))]);
        assert_eq!(abi.event(&Selector::from_name("Upgraded")).unwrap().name, "Upgraded");
        assert_eq!(abi.events().count(), 1);
    }
}
