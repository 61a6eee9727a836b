//! End-to-end behaviour of the PIN lock over real backends.
//!
//! Covers:
//!  1. Empty store: nothing configured, nothing verifies
//!  2. Set / verify / overwrite / remove semantics
//!  3. Restart: a new controller over the same store starts locked
//!  4. Read faults answer `false`; write faults surface

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use pinlock_core::kv::{FileStore, KeyValueStore, MemoryStore};
use pinlock_core::{LockController, LockError, LockState, SecretStore, StorageFault, StorageOp};
use tempfile::tempdir;

/// Wraps a real store and fails reads and/or writes on demand.
struct FlakyStore {
    inner: MemoryStore,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl FlakyStore {
    fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
        }
    }

    fn fail_reads(&self, on: bool) {
        self.fail_reads.store(on, Ordering::SeqCst);
    }

    fn fail_writes(&self, on: bool) {
        self.fail_writes.store(on, Ordering::SeqCst);
    }
}

#[async_trait]
impl KeyValueStore for FlakyStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageFault> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageFault::get("injected read fault"));
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageFault> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageFault::set("injected write fault"));
        }
        self.inner.set(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<(), StorageFault> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageFault::delete("injected delete fault"));
        }
        self.inner.delete(key).await
    }
}

fn memory_lock() -> LockController {
    LockController::new(SecretStore::with_default_key(Arc::new(MemoryStore::new())))
}

// ─── Empty store ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_no_secret_initially() {
    let lock = memory_lock();
    assert!(!lock.has_secret().await);
    assert!(!lock.verify_secret("").await);
    assert!(!lock.verify_secret("0000").await);
    assert_eq!(lock.state().await, LockState::NoSecretConfigured);
}

// ─── Set / verify / overwrite / remove ──────────────────────────────────────

#[tokio::test]
async fn test_set_then_has() {
    let lock = memory_lock();
    lock.set_secret("1234").await.unwrap();
    assert!(lock.has_secret().await);
}

#[tokio::test]
async fn test_verify_is_exact() {
    let lock = memory_lock();
    lock.set_secret("1234").await.unwrap();
    assert!(!lock.verify_secret("1235").await);
    assert!(!lock.verify_secret("01234").await);
    assert!(lock.verify_secret("1234").await);
}

#[tokio::test]
async fn test_overwrite_keeps_no_history() {
    let lock = memory_lock();
    lock.set_secret("1111").await.unwrap();
    lock.set_secret("2222").await.unwrap();
    assert!(!lock.verify_secret("1111").await);
    assert!(lock.verify_secret("2222").await);
}

#[tokio::test]
async fn test_remove_then_absent() {
    let lock = memory_lock();
    lock.set_secret("9999").await.unwrap();
    lock.remove_secret().await.unwrap();
    assert!(!lock.has_secret().await);
    assert!(!lock.verify_secret("9999").await);
}

#[tokio::test]
async fn test_remove_when_absent_succeeds() {
    let lock = memory_lock();
    lock.remove_secret().await.unwrap();
    lock.remove_secret().await.unwrap();
    assert_eq!(lock.state().await, LockState::NoSecretConfigured);
}

// ─── Restart ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_new_controller_starts_locked() {
    let kv: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let first = LockController::start(SecretStore::with_default_key(kv.clone())).await;
    first.set_secret("1234").await.unwrap();
    assert!(first.verify_secret("1234").await);
    assert!(first.is_unlocked());

    let second = LockController::start(SecretStore::with_default_key(kv)).await;
    assert!(!second.is_unlocked());
    assert!(second.has_secret().await);
    assert_eq!(second.state().await, LockState::LockedAwaitingVerification);
}

#[tokio::test]
async fn test_full_scenario_across_restart_on_disk() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("pinlock-store.json");
    let open = || SecretStore::with_default_key(Arc::new(FileStore::new(&path)));

    let lock = LockController::start(open()).await;
    lock.set_secret("0000").await.unwrap();
    assert!(lock.verify_secret("0000").await);
    assert_eq!(lock.state().await, LockState::Unlocked);
    drop(lock);

    let lock = LockController::start(open()).await;
    assert_eq!(lock.state().await, LockState::LockedAwaitingVerification);
    assert!(lock.has_secret().await);
    assert!(lock.verify_secret("0000").await);
    assert_eq!(lock.state().await, LockState::Unlocked);

    lock.remove_secret().await.unwrap();
    assert_eq!(lock.state().await, LockState::NoSecretConfigured);
    assert!(!lock.verify_secret("0000").await);

    let lock = LockController::start(open()).await;
    assert_eq!(lock.state().await, LockState::NoSecretConfigured);
}

// ─── Faults ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_read_fault_answers_false() {
    let kv = Arc::new(FlakyStore::new());
    let lock = LockController::new(SecretStore::with_default_key(kv.clone()));
    lock.set_secret("1234").await.unwrap();

    kv.fail_reads(true);
    assert!(!lock.has_secret().await);
    assert!(!lock.verify_secret("1234").await);
    assert!(!lock.is_unlocked());
    assert_eq!(lock.state().await, LockState::NoSecretConfigured);

    kv.fail_reads(false);
    assert!(lock.verify_secret("1234").await);
}

#[tokio::test]
async fn test_write_faults_surface() {
    let kv = Arc::new(FlakyStore::new());
    let lock = LockController::new(SecretStore::with_default_key(kv.clone()));
    lock.set_secret("1234").await.unwrap();
    assert!(lock.verify_secret("1234").await);

    kv.fail_writes(true);
    let err = lock.set_secret("5678").await.unwrap_err();
    assert!(matches!(
        err,
        LockError::Storage(StorageFault {
            op: StorageOp::Set,
            ..
        })
    ));
    let err = lock.remove_secret().await.unwrap_err();
    assert!(matches!(
        err,
        LockError::Storage(StorageFault {
            op: StorageOp::Delete,
            ..
        })
    ));
    // Failed remove leaves both the record and the session untouched.
    assert!(lock.is_unlocked());

    kv.fail_writes(false);
    assert!(lock.verify_secret("1234").await);
    assert!(!lock.verify_secret("5678").await);
}

#[tokio::test]
async fn test_reset_stops_at_first_failure() {
    let kv = Arc::new(FlakyStore::new());
    let lock = LockController::new(SecretStore::with_default_key(kv.clone()));
    lock.set_secret("1234").await.unwrap();

    kv.fail_writes(true);
    assert!(lock.reset_secret("4321").await.is_err());
    kv.fail_writes(false);
    assert!(lock.verify_secret("1234").await);
}
