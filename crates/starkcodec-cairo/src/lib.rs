//! # starkcodec-cairo
//!
//! ABI-directed decoding for StarkNet (Cairo 0) contracts, plus point-in-time
//! proxy resolution.
//!
//! ## Implementation notes
//! - Calldata and event data are flat felt arrays; types come only from the ABI
//! - `x_len: felt` followed by `x: T*` is one length-prefixed array
//! - Structs occupy their schema-declared `size`; members sit at `offset`
//! - `keys[0..]` are tried in order to find the event selector
//! - Missing schemas degrade to the `anonymous` representation

pub mod batch;
pub mod call_decoder;
pub mod config;
pub mod decoder;
pub mod normalizer;
pub mod proxy;

pub use batch::{BatchDecodeError, BatchDecodeResult, ErrorMode};
pub use call_decoder::CairoCallDecoder;
pub use config::ResolverConfig;
pub use decoder::CairoEventDecoder;
pub use proxy::{is_proxy, ProxyEvidence, ProxyResolver, Resolution, ResolutionStrategy};
