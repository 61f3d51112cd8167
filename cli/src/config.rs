use std::path::PathBuf;

use anyhow::{Result, anyhow};
use platform_db::{DEFAULT_DATA_DIR, DEFAULT_KEY, StorageBackend, StoreSettings};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub store: StoreSettings,
    pub log_filter: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let key = lookup("CRM_STORAGE_KEY")
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_KEY.into());

        let backend = match lookup("CRM_STORAGE")
            .map(|value| value.trim().to_lowercase())
            .as_deref()
        {
            None | Some("") | Some("file") => {
                let dir = lookup("CRM_DATA_DIR")
                    .filter(|value| !value.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_DATA_DIR.into());
                StorageBackend::File(PathBuf::from(dir))
            }
            Some("memory") => StorageBackend::Memory,
            Some(other) => {
                return Err(anyhow!(
                    "CRM_STORAGE must be `file` or `memory`, got `{}`",
                    other
                ));
            }
        };

        Ok(Self {
            store: StoreSettings { backend, key },
            log_filter: lookup("RUST_LOG"),
        })
    }

    /// Command-line flags win over the environment.
    pub fn with_overrides(
        mut self,
        data_dir: Option<PathBuf>,
        storage_key: Option<String>,
        memory: bool,
    ) -> Self {
        if let Some(dir) = data_dir {
            self.store.backend = StorageBackend::File(dir);
        }
        if memory {
            self.store.backend = StorageBackend::Memory;
        }
        if let Some(key) = storage_key {
            self.store.key = key;
        }
        self
    }
}
