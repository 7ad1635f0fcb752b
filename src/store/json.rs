use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockWriteGuard};

use anyhow::{Context, Result};
use log::warn;

use super::KeyValueStore;

/// Key-value store kept as one pretty-printed JSON object on disk. The whole
/// file is rewritten on every mutation; entries are few and small.
pub struct JsonFileStore {
    path: PathBuf,
    data: RwLock<BTreeMap<String, String>>,
}

impl JsonFileStore {
    pub fn open(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create store directory {}", parent.display()))?;
        }

        let data = if path.exists() {
            match fs::read_to_string(&path) {
                Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|err| {
                    warn!("Discarding unreadable store {}: {err}", path.display());
                    BTreeMap::new()
                }),
                Err(err) => {
                    warn!("Failed to read store {}: {err}", path.display());
                    BTreeMap::new()
                }
            }
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_guard(&self) -> RwLockWriteGuard<'_, BTreeMap<String, String>> {
        match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn persist(&self, data: &BTreeMap<String, String>) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write store to {}", self.path.display()))
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let guard = match self.data.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        Ok(guard.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut guard = self.write_guard();
        guard.insert(key.to_string(), value.to_string());
        self.persist(&guard)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut guard = self.write_guard();
        if guard.remove(key).is_some() {
            self.persist(&guard)?;
        }
        Ok(())
    }
}
