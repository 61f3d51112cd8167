use std::{
    fs, io,
    path::{Path, PathBuf},
};

use crate::{KeyValueStore, StoreError, StoreResult};

/// Directory-backed store: one `<key>.json` file per key. Writes go to a
/// sibling temp file first and are renamed into place.
#[derive(Clone, Debug)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Opens (creating if needed) the directory at `root`.
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| StoreError::Io {
            path: root.clone(),
            source,
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> StoreResult<PathBuf> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(format!("{key}.json")))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }

    fn set(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        let path = self.path_for(key)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value).map_err(|source| StoreError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &path).map_err(|source| StoreError::Io { path, source })
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store.set("crm-data", br#"{"accounts":[]}"#).unwrap();

        let reopened = FileStore::open(dir.path()).unwrap();
        let bytes = reopened.get("crm-data").unwrap().unwrap();
        assert_eq!(bytes, br#"{"accounts":[]}"#);
        assert!(dir.path().join("crm-data.json").exists());
        assert!(!dir.path().join("crm-data.json.tmp").exists());
    }

    #[test]
    fn missing_key_reads_as_none_and_removes_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("nested")).unwrap();
        assert!(store.get("absent").unwrap().is_none());
        store.remove("absent").unwrap();
    }

    #[test]
    fn rejects_keys_that_escape_the_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        assert!(matches!(
            store.set("../outside", b"x"),
            Err(StoreError::InvalidKey(_))
        ));
        assert!(matches!(store.get(""), Err(StoreError::InvalidKey(_))));
    }
}
