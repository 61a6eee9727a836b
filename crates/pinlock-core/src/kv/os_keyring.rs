use async_trait::async_trait;
use keyring::Entry;
use zeroize::Zeroizing;

use super::KeyValueStore;
use crate::error::{StorageFault, StorageOp};

pub const DEFAULT_SERVICE_NAME: &str = "PinLock";

/// OS credential store (Keychain, Secret Service, Windows Credential Manager).
///
/// One credential per key, all under the same service name. Every keyring
/// call runs on tokio's blocking pool.
#[derive(Debug, Clone)]
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn new(service: &str) -> Self {
        Self {
            service: service.to_string(),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    /// Runs one keyring call on the blocking pool. Keychain and Secret
    /// Service calls are IPC round trips and must stay off runtime workers.
    async fn blocking<T, F>(&self, key: &str, op: StorageOp, call: F) -> Result<T, StorageFault>
    where
        T: Send + 'static,
        F: FnOnce(Entry) -> Result<T, StorageFault> + Send + 'static,
    {
        let service = self.service.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || {
            let entry = Entry::new(&service, &key)
                .map_err(|e| StorageFault::new(op, format!("keyring init: {e}")))?;
            call(entry)
        })
        .await
        .map_err(|e| StorageFault::new(op, format!("keyring task: {e}")))?
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICE_NAME)
    }
}

#[async_trait]
impl KeyValueStore for KeyringStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageFault> {
        let name = key.to_string();
        self.blocking(key, StorageOp::Get, move |entry| match entry.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(StorageFault::get(format!("load {name}: {e}"))),
        })
        .await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageFault> {
        let name = key.to_string();
        let value = Zeroizing::new(value.to_string());
        self.blocking(key, StorageOp::Set, move |entry| {
            entry
                .set_password(&value)
                .map_err(|e| StorageFault::set(format!("store {name}: {e}")))
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<(), StorageFault> {
        let name = key.to_string();
        self.blocking(key, StorageOp::Delete, move |entry| {
            match entry.delete_password() {
                Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
                Err(e) => Err(StorageFault::delete(format!("delete {name}: {e}"))),
            }
        })
        .await
    }
}
