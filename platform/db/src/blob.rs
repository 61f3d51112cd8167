use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

use crate::{FileStore, KeyValueStore, MemoryStore, StorageBackend, StoreSettings};

/// One serialized document at one key.
///
/// Nothing here returns an error. Missing or unparseable data loads as
/// `None`; a backend that cannot be read is replaced by a [`MemoryStore`];
/// failed writes are logged and dropped.
#[derive(Debug)]
pub struct BlobStore {
    backend: Box<dyn KeyValueStore>,
    key: String,
    fallback: bool,
}

impl BlobStore {
    pub fn new(backend: impl KeyValueStore + 'static, key: impl Into<String>) -> Self {
        Self {
            backend: Box::new(backend),
            key: key.into(),
            fallback: false,
        }
    }

    /// Builds the configured backend, falling back to memory when the file
    /// store cannot be opened.
    pub fn from_settings(settings: &StoreSettings) -> Self {
        match &settings.backend {
            StorageBackend::Memory => Self::new(MemoryStore::new(), settings.key.clone()),
            StorageBackend::File(dir) => match FileStore::open(dir) {
                Ok(store) => {
                    debug!(dir = %store.root().display(), "file storage opened");
                    Self::new(store, settings.key.clone())
                }
                Err(err) => {
                    warn!(
                        dir = %dir.display(),
                        error = %err,
                        "file storage unavailable, using in-memory fallback"
                    );
                    let mut blob = Self::new(MemoryStore::new(), settings.key.clone());
                    blob.fallback = true;
                    blob
                }
            },
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// True once the adapter has given up on its configured backend.
    pub fn is_fallback(&self) -> bool {
        self.fallback
    }

    pub fn load<T: DeserializeOwned>(&mut self) -> Option<T> {
        let bytes = match self.backend.get(&self.key) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                debug!(key = %self.key, "no persisted data");
                return None;
            }
            Err(err) => {
                warn!(key = %self.key, error = %err, "unable to read storage, using in-memory fallback");
                self.backend = Box::new(MemoryStore::new());
                self.fallback = true;
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(key = %self.key, error = %err, "failed to parse persisted data");
                None
            }
        }
    }

    pub fn save<T: Serialize>(&self, value: &T) {
        let bytes = match serde_json::to_vec(value) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(key = %self.key, error = %err, "failed to serialize data");
                return;
            }
        };
        if let Err(err) = self.backend.set(&self.key, &bytes) {
            warn!(key = %self.key, error = %err, "failed to persist data");
        }
    }

    pub fn clear(&self) {
        if let Err(err) = self.backend.remove(&self.key) {
            warn!(key = %self.key, error = %err, "failed to clear persisted data");
        }
    }
}
