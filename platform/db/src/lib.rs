//! Key-value persistence primitives: byte stores keyed by string, and a
//! blob adapter that keeps one serialized document at one key.

mod blob;
mod file;
mod memory;

use std::{io, path::PathBuf};

use serde::Deserialize;
use thiserror::Error;

pub use blob::BlobStore;
pub use file::FileStore;
pub use memory::MemoryStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("i/o failure on {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid storage key {0:?}")]
    InvalidKey(String),
    #[error("store lock poisoned")]
    Poisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Byte-oriented key-value medium.
pub trait KeyValueStore: Send + Sync + std::fmt::Debug {
    /// Returns `None` when the key has never been written or was removed.
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;
    fn set(&self, key: &str, value: &[u8]) -> StoreResult<()>;
    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> StoreResult<()>;
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    File(PathBuf),
    Memory,
}

/// Where the blob lives and under which key.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct StoreSettings {
    pub backend: StorageBackend,
    #[serde(default = "default_key")]
    pub key: String,
}

pub const DEFAULT_KEY: &str = "crm-data";
pub const DEFAULT_DATA_DIR: &str = ".crm-data";

fn default_key() -> String {
    DEFAULT_KEY.to_string()
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self::file(DEFAULT_DATA_DIR)
    }
}

impl StoreSettings {
    pub fn file(dir: impl Into<PathBuf>) -> Self {
        Self {
            backend: StorageBackend::File(dir.into()),
            key: default_key(),
        }
    }

    pub fn memory() -> Self {
        Self {
            backend: StorageBackend::Memory,
            key: default_key(),
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }
}
