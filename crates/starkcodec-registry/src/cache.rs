//! Memoized ABI classification, keyed by contract address or class hash.
//!
//! The cache is an explicit object: the caller decides its capacity and
//! shares it (it is cheap to clone) with whatever decodes or resolves.
//! Thread-safe via `Arc<RwLock<Inner>>`.

use serde::{Deserialize, Serialize};
use starkcodec_core::{
    classified::ClassifiedAbi,
    error::CollaboratorError,
    felt::Felt,
    source::AbiSource,
};
use std::{
    collections::{HashMap, VecDeque},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, PoisonError, RwLock,
    },
};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of classified ABIs kept; the oldest entry is evicted first
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

fn default_capacity() -> usize { 1_024 }

impl Default for CacheConfig {
    fn default() -> Self {
        Self { capacity: default_capacity() }
    }
}

#[derive(Default)]
struct Inner {
    entries: HashMap<String, Arc<ClassifiedAbi>>,
    /// Insertion order, oldest first
    order: VecDeque<String>,
}

/// Bounded FIFO cache of classified ABIs.
///
/// Keys compare by felt value, so `0x0abc` and `0xABC` share one entry.
#[derive(Clone)]
pub struct ClassifiedAbiCache {
    inner: Arc<RwLock<Inner>>,
    capacity: usize,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
}

impl ClassifiedAbiCache {
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner::default())),
            capacity: capacity.max(1),
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.capacity)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get(&self, key: &Felt) -> Option<Arc<ClassifiedAbi>> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let found = inner.entries.get(&key.canonical()).cloned();
        let counter = if found.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    /// Store a classified ABI. If another caller stored one for the same key
    /// first, that one is kept and returned.
    pub fn insert(&self, key: &Felt, abi: ClassifiedAbi) -> Arc<ClassifiedAbi> {
        let canonical = key.canonical();
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = inner.entries.get(&canonical) {
            return existing.clone();
        }

        while inner.entries.len() >= self.capacity {
            let Some(oldest) = inner.order.pop_front() else { break };
            inner.entries.remove(&oldest);
            debug!(key = %oldest, "evicted classified ABI");
        }

        let abi = Arc::new(abi);
        inner.entries.insert(canonical.clone(), abi.clone());
        inner.order.push_back(canonical);
        abi
    }

    /// Return the cached ABI, or fetch it from `source`, classify and store it.
    ///
    /// A contract with no published ABI is memoized as an empty `ClassifiedAbi`.
    /// Source errors are returned unchanged and nothing is stored.
    pub async fn get_or_load(
        &self,
        source: &dyn AbiSource,
        key: &Felt,
    ) -> Result<Arc<ClassifiedAbi>, CollaboratorError> {
        if let Some(abi) = self.get(key) {
            return Ok(abi);
        }
        let entries = source.get_abi(key).await?;
        if entries.is_none() {
            debug!(key = %key, "no ABI published, caching empty classification");
        }
        Ok(self.insert(key, ClassifiedAbi::classify_optional(entries.as_deref())))
    }

    pub fn remove(&self, key: &Felt) -> Option<Arc<ClassifiedAbi>> {
        let canonical = key.canonical();
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.order.retain(|k| k != &canonical);
        inner.entries.remove(&canonical)
    }

    pub fn clear(&self) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.entries.clear();
        inner.order.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}

impl Default for ClassifiedAbiCache {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}

impl std::fmt::Debug for ClassifiedAbiCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassifiedAbiCache")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .field("hits", &self.hits())
            .field("misses", &self.misses())
            .finish()
    }
}
