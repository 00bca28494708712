//! # starkcodec-core
//!
//! Core primitives shared across all StarkCodec crates: felts and selectors,
//! the StarkNet ABI model and its classification, the organized output types,
//! the error taxonomy, and the collaborator traits the decoder and proxy
//! resolver are built against.

pub mod abi;
pub mod call;
pub mod classified;
pub mod error;
pub mod event;
pub mod felt;
pub mod selector;
pub mod source;
pub mod value;

pub use abi::{parse_abi, AbiEntry, AbiField, EventAbi, FunctionAbi, FunctionKind, StructAbi, StructMember, TypeShape};
pub use call::{DecodedInput, EventArgument, FunctionInput, OrganizedFunction, ANONYMOUS};
pub use classified::ClassifiedAbi;
pub use error::{CollaboratorError, DecodeError, DecodeWarning, ResolutionError};
pub use event::{OrganizedEvent, RawEvent};
pub use felt::{felts, Felt};
pub use selector::{selector_of, Selector};
pub use source::{
    AbiSource, BlockId, ConstructorInputQuery, EventArgumentQuery, HistoricalQuery, NamePattern,
    TransactionType, ViewCallEvaluator,
};
pub use value::{FeltValue, StructValue};
