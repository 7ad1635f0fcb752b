//! Durable key-value storage behind the verification session.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use crate::config::StorageBackend;

mod json;
mod memory;
mod sqlite;

pub use json::JsonFileStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

pub const JSON_STORE_FILE: &str = "idcapture.json";
pub const SQLITE_STORE_FILE: &str = "idcapture.sqlite3";

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// Opens the configured backend inside `dir`.
pub fn open_store(backend: StorageBackend, dir: &Path) -> Result<Arc<dyn KeyValueStore>> {
    let store: Arc<dyn KeyValueStore> = match backend {
        StorageBackend::Json => Arc::new(JsonFileStore::open(dir.join(JSON_STORE_FILE))?),
        StorageBackend::Sqlite => Arc::new(SqliteStore::open(dir.join(SQLITE_STORE_FILE))?),
    };
    Ok(store)
}
