//! In-memory `AbiSource` implementation.
//!
//! Suitable for testing, CLI use, and embedded deployments.
//! Thread-safe via `Arc<RwLock<HashMap>>`.

use async_trait::async_trait;
use starkcodec_core::{
    abi::{parse_abi, AbiEntry},
    error::{CollaboratorError, DecodeError},
    felt::Felt,
    source::AbiSource,
};
use std::{
    collections::HashMap,
    path::Path,
    sync::{Arc, PoisonError, RwLock},
};
use tracing::debug;

use crate::error::RegistryError;

/// Thread-safe map from contract address or class hash to raw ABI.
#[derive(Clone, Default)]
pub struct MemoryAbiSource {
    inner: Arc<RwLock<HashMap<String, Vec<AbiEntry>>>>,
}

impl MemoryAbiSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the ABI for an address.
    pub fn insert(&self, address: impl Into<Felt>, entries: Vec<AbiEntry>) {
        let key = address.into().canonical();
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, entries);
    }

    /// Parse and register an ABI JSON document.
    pub fn insert_json(&self, address: impl Into<Felt>, json: &str) -> Result<(), DecodeError> {
        let entries = parse_abi(json)?;
        self.insert(address, entries);
        Ok(())
    }

    /// Load one ABI file named `<address>.json`.
    pub fn load_file(&self, path: &Path) -> Result<Felt, RegistryError> {
        let address = path
            .file_stem()
            .and_then(|s| s.to_str())
            .map(Felt::from)
            .filter(|f| f.to_u256().is_some())
            .ok_or_else(|| RegistryError::BadFileName {
                path: path.display().to_string(),
            })?;
        let content = std::fs::read_to_string(path)?;
        self.insert_json(address.clone(), &content)
            .map_err(|source| RegistryError::Abi {
                path: path.display().to_string(),
                source,
            })?;
        Ok(address)
    }

    /// Load every `<address>.json` file directly under `dir`.
    /// Returns the number of ABIs loaded.
    pub fn load_directory(&self, dir: &Path) -> Result<usize, RegistryError> {
        if !dir.is_dir() {
            return Err(RegistryError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} is not a directory", dir.display()),
            )));
        }
        let mut count = 0;
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().map(|e| e == "json").unwrap_or(false) {
                let address = self.load_file(&path)?;
                debug!(%address, file = %path.display(), "loaded ABI");
                count += 1;
            }
        }
        Ok(count)
    }

    pub fn contains(&self, address: &Felt) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&address.canonical())
    }

    /// Returns all registered addresses (canonical form, sorted).
    pub fn addresses(&self) -> Vec<Felt> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let mut keys: Vec<Felt> = inner.keys().map(|k| Felt::from(k.as_str())).collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AbiSource for MemoryAbiSource {
    async fn get_abi(&self, address_or_class_hash: &Felt) -> Result<Option<Vec<AbiEntry>>, CollaboratorError> {
        Ok(self
            .inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&address_or_class_hash.canonical())
            .cloned())
    }
}

impl std::fmt::Debug for MemoryAbiSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryAbiSource").field("len", &self.len()).finish()
    }
}
