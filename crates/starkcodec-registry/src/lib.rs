//! # starkcodec-registry
//!
//! Storage-side helpers for StarkCodec.
//!
//! ## Contents
//! 1. **ABI cache**: bounded, injected memo of classified ABIs
//! 2. **In-memory ABI source**: ABIs registered directly or loaded from `<address>.json` files
//! 3. **In-memory history**: the resolver's historical queries and view calls,
//!    optionally loaded from a JSON snapshot
//!
//! The collaborator traits implemented here live in `starkcodec-core::source`.

pub mod cache;
pub mod error;
pub mod history;
pub mod memory;

pub use cache::{CacheConfig, ClassifiedAbiCache};
pub use error::RegistryError;
pub use history::{
    ConstructorInputRecord, EventArgumentRecord, HistorySnapshot, MemoryHistory, MemoryViewCalls,
    ViewCallRecord,
};
pub use memory::MemoryAbiSource;
