//! The single PIN record, kept under one well-known key.
//!
//! Read paths (`has_secret`, `verify_secret`) never surface a storage fault:
//! they log it and answer `false`. Write paths (`set_secret`,
//! `remove_secret`) return the fault so the caller can tell the user the
//! change did not stick.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::config::DEFAULT_SECRET_KEY;
use crate::error::StorageFault;
use crate::kv::KeyValueStore;

#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
struct SecretRecord {
    secret: String,
    #[zeroize(skip)]
    updated_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct SecretStore {
    kv: Arc<dyn KeyValueStore>,
    key: String,
}

impl fmt::Debug for SecretStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretStore").field("key", &self.key).finish()
    }
}

impl SecretStore {
    pub fn new(kv: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            kv,
            key: key.into(),
        }
    }

    pub fn with_default_key(kv: Arc<dyn KeyValueStore>) -> Self {
        Self::new(kv, DEFAULT_SECRET_KEY)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// True iff a record exists. A read fault answers `false`.
    pub async fn has_secret(&self) -> bool {
        match self.kv.get(&self.key).await {
            Ok(value) => value.is_some(),
            Err(err) => {
                warn!(key = %self.key, error = %err, "secret presence check failed; treating as absent");
                false
            }
        }
    }

    /// Overwrites any existing record. Format rules are the caller's concern.
    pub async fn set_secret(&self, value: &str) -> Result<(), StorageFault> {
        let record = SecretRecord {
            secret: value.to_string(),
            updated_at: Utc::now(),
        };
        let encoded = Zeroizing::new(
            serde_json::to_string(&record)
                .map_err(|e| StorageFault::set(format!("encode secret record: {e}")))?,
        );
        if let Err(err) = self.kv.set(&self.key, &encoded).await {
            warn!(key = %self.key, error = %err, "failed to store secret");
            return Err(err);
        }
        debug!(key = %self.key, "secret stored");
        Ok(())
    }

    /// Exact string comparison against the stored value.
    ///
    /// Absent record, unreadable storage and an unparseable record all
    /// answer `false`.
    pub async fn verify_secret(&self, candidate: &str) -> bool {
        match self.load_record().await {
            Some(record) => record.secret == candidate,
            None => false,
        }
    }

    /// Deletes the record. Removing when nothing is stored succeeds.
    pub async fn remove_secret(&self) -> Result<(), StorageFault> {
        if let Err(err) = self.kv.delete(&self.key).await {
            warn!(key = %self.key, error = %err, "failed to remove secret");
            return Err(err);
        }
        debug!(key = %self.key, "secret removed");
        Ok(())
    }

    /// When the current record was written, if one exists and is readable.
    pub async fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.load_record().await.map(|record| record.updated_at)
    }

    async fn load_record(&self) -> Option<SecretRecord> {
        let raw = match self.kv.get(&self.key).await {
            Ok(Some(raw)) => Zeroizing::new(raw),
            Ok(None) => return None,
            Err(err) => {
                warn!(key = %self.key, error = %err, "secret read failed; denying");
                return None;
            }
        };
        match serde_json::from_str::<SecretRecord>(&raw) {
            Ok(record) => Some(record),
            Err(err) => {
                warn!(key = %self.key, error = %err, "secret record unreadable; denying");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryStore;
    use async_trait::async_trait;

    struct BrokenStore;

    #[async_trait]
    impl KeyValueStore for BrokenStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, StorageFault> {
            Err(StorageFault::get("unavailable"))
        }
        async fn set(&self, _key: &str, _value: &str) -> Result<(), StorageFault> {
            Err(StorageFault::set("unavailable"))
        }
        async fn delete(&self, _key: &str) -> Result<(), StorageFault> {
            Err(StorageFault::delete("unavailable"))
        }
    }

    fn memory_store() -> (Arc<MemoryStore>, SecretStore) {
        let kv = Arc::new(MemoryStore::new());
        let store = SecretStore::with_default_key(kv.clone());
        (kv, store)
    }

    #[tokio::test]
    async fn empty_store_has_nothing_and_verifies_nothing() {
        let (_, store) = memory_store();
        assert!(!store.has_secret().await);
        assert!(!store.verify_secret("").await);
        assert!(!store.verify_secret("1234").await);
        assert_eq!(store.last_updated().await, None);
    }

    #[tokio::test]
    async fn exact_match_only() {
        let (_, store) = memory_store();
        store.set_secret("1234").await.unwrap();
        assert!(store.has_secret().await);
        assert!(store.verify_secret("1234").await);
        assert!(!store.verify_secret("1235").await);
        assert!(!store.verify_secret("01234").await);
        assert!(!store.verify_secret("1234 ").await);
        assert!(!store.verify_secret("123").await);
        assert!(store.last_updated().await.is_some());
    }

    #[tokio::test]
    async fn record_lives_under_configured_key_only() {
        let kv = Arc::new(MemoryStore::new());
        let store = SecretStore::new(kv.clone(), "finance.lock");
        store.set_secret("2468").await.unwrap();
        assert_eq!(kv.len(), 1);
        assert!(kv.get("finance.lock").await.unwrap().is_some());
        assert!(!SecretStore::with_default_key(kv).has_secret().await);
    }

    #[tokio::test]
    async fn garbage_record_denies_but_counts_as_present() {
        let (kv, store) = memory_store();
        kv.set(DEFAULT_SECRET_KEY, "1234").await.unwrap();
        assert!(store.has_secret().await);
        assert!(!store.verify_secret("1234").await);
        store.remove_secret().await.unwrap();
        assert!(!store.has_secret().await);
    }

    #[tokio::test]
    async fn faults_split_by_direction() {
        let store = SecretStore::with_default_key(Arc::new(BrokenStore));
        assert!(!store.has_secret().await);
        assert!(!store.verify_secret("1234").await);
        assert!(store.set_secret("1234").await.is_err());
        assert!(store.remove_secret().await.is_err());
    }
}
