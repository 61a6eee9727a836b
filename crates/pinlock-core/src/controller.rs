//! Lock/unlock decision for the running process.
//!
//! ```text
//!  NoSecretConfigured --set--> LockedAwaitingVerification --verify ok--> Unlocked
//!          ^                                                               |  ^
//!          +----------------------------remove-----------------------------+  | set
//!                                                                             +--+
//! ```
//!
//! Every new process starts in `NoSecretConfigured` or
//! `LockedAwaitingVerification`; the unlocked flag is never carried over.
//! Failed verification has no counter, backoff or lockout.

use serde::Serialize;
use tracing::{info, warn};

use crate::error::LockResult;
use crate::policy::PinPolicy;
use crate::secret_store::SecretStore;
use crate::session::SessionFlag;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LockState {
    NoSecretConfigured,
    LockedAwaitingVerification,
    Unlocked,
}

/// Owns the secret store and this process's session flag.
///
/// Create one per process and hand it (or an `Arc` of it) to whatever needs
/// the lock decision.
#[derive(Debug)]
pub struct LockController {
    store: SecretStore,
    session: SessionFlag,
}

impl LockController {
    pub fn new(store: SecretStore) -> Self {
        Self {
            store,
            session: SessionFlag::new(),
        }
    }

    /// Builds a controller and logs the state it starts in.
    pub async fn start(store: SecretStore) -> Self {
        let controller = Self::new(store);
        let state = controller.state().await;
        info!(?state, key = %controller.store.key(), "lock controller started");
        controller
    }

    pub fn store(&self) -> &SecretStore {
        &self.store
    }

    pub async fn state(&self) -> LockState {
        if !self.store.has_secret().await {
            LockState::NoSecretConfigured
        } else if self.session.is_set() {
            LockState::Unlocked
        } else {
            LockState::LockedAwaitingVerification
        }
    }

    /// Whether the app shell has to show the lock screen before protected
    /// content.
    pub async fn requires_lock_screen(&self) -> bool {
        self.state().await == LockState::LockedAwaitingVerification
    }

    pub async fn has_secret(&self) -> bool {
        self.store.has_secret().await
    }

    pub async fn set_secret(&self, value: &str) -> LockResult<()> {
        self.store.set_secret(value).await?;
        info!("secret set");
        Ok(())
    }

    /// Settings flow entry point: rejects `value` under `policy` before it
    /// reaches storage.
    pub async fn provision_secret(&self, value: &str, policy: &PinPolicy) -> LockResult<()> {
        policy.validate(value)?;
        self.set_secret(value).await
    }

    /// Checks `candidate` and marks the session unlocked on a match.
    pub async fn verify_secret(&self, candidate: &str) -> bool {
        if !self.store.has_secret().await {
            return false;
        }
        if self.store.verify_secret(candidate).await {
            self.session.set();
            info!("session unlocked");
            true
        } else {
            warn!("secret verification failed");
            false
        }
    }

    /// Deletes the secret and drops the session back to unconfigured.
    pub async fn remove_secret(&self) -> LockResult<()> {
        self.store.remove_secret().await?;
        self.session.clear();
        info!("secret removed");
        Ok(())
    }

    /// Settings flow: proves knowledge of `current`, then stores `new`.
    ///
    /// Returns `Ok(false)` without writing when `current` does not match.
    pub async fn change_secret(&self, current: &str, new: &str) -> LockResult<bool> {
        if !self.verify_secret(current).await {
            return Ok(false);
        }
        self.set_secret(new).await?;
        Ok(true)
    }

    /// Reset flow, to be called only after the external identity/OTP check
    /// has passed. Removes the old record, then stores `new`.
    pub async fn reset_secret(&self, new: &str) -> LockResult<()> {
        self.remove_secret().await?;
        self.set_secret(new).await.map_err(|err| {
            warn!(error = %err, "reset removed the old secret but could not store the new one");
            err
        })
    }

    pub fn is_unlocked(&self) -> bool {
        self.session.is_set()
    }

    pub fn mark_unlocked(&self) {
        self.session.set();
    }
}

impl From<SecretStore> for LockController {
    fn from(store: SecretStore) -> Self {
        Self::new(store)
    }
}
