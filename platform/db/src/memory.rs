use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use crate::{KeyValueStore, StoreError, StoreResult};

/// In-process store. Clones share the same entries, so a test can keep a
/// handle and inspect what the owner wrote.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .read()
            .map(|entries| entries.contains_key(key))
            .unwrap_or(false)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let entries = self.entries.read().map_err(|_| StoreError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        let mut entries = self.entries.write().map_err(|_| StoreError::Poisoned)?;
        entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        let mut entries = self.entries.write().map_err(|_| StoreError::Poisoned)?;
        entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_entries() {
        let store = MemoryStore::new();
        let handle = store.clone();
        store.set("crm-data", b"{}").unwrap();
        assert_eq!(handle.get("crm-data").unwrap().as_deref(), Some(&b"{}"[..]));
        handle.remove("crm-data").unwrap();
        assert!(!store.contains("crm-data"));
        assert!(store.get("crm-data").unwrap().is_none());
    }
}
