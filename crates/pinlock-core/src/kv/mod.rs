//! Platform key-value storage the lock is built on.
//!
//! Each backend is a flat string-to-string map. Calls are independent: no
//! batching, no transactions. Every call is fallible with a [`StorageFault`].

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{LockConfig, StoreBackend};
use crate::error::StorageFault;

mod file;
mod memory;
mod os_keyring;

pub use self::file::FileStore;
pub use self::memory::MemoryStore;
pub use self::os_keyring::{KeyringStore, DEFAULT_SERVICE_NAME as DEFAULT_KEYRING_SERVICE};

pub const STORE_FILE_NAME: &str = "pinlock-store.json";

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageFault>;

    /// Replaces any existing value for `key`.
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageFault>;

    /// Removing an absent key succeeds.
    async fn delete(&self, key: &str) -> Result<(), StorageFault>;
}

/// Builds the backend named by `config`, rooted at `data_dir` where relevant.
pub fn open_store(config: &LockConfig, data_dir: &Path) -> Arc<dyn KeyValueStore> {
    match config.backend {
        StoreBackend::File => Arc::new(FileStore::new(data_dir.join(STORE_FILE_NAME))),
        StoreBackend::Keyring => Arc::new(KeyringStore::new(&config.keyring_service)),
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
    }
}
