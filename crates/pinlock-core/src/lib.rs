//! pinlock-core: local PIN lock for a single device installation
//!
//! # Layout
//! - [`kv`] is the platform key-value storage the lock sits on (file,
//!   OS keyring or memory).
//! - [`secret_store::SecretStore`] keeps the one PIN record under a fixed key.
//!   Reads never fail outward; writes do.
//! - [`controller::LockController`] combines the store with the per-process
//!   [`session::SessionFlag`] into the lock/unlock decision.
//!
//! Nothing here persists the unlocked flag. A fresh process is always locked
//! when a PIN exists.

pub mod config;
pub mod controller;
pub mod error;
pub mod kv;
pub mod paths;
pub mod policy;
pub mod secret_store;
pub mod session;

pub use controller::{LockController, LockState};
pub use error::{LockError, StorageFault, StorageOp};
pub use kv::KeyValueStore;
pub use policy::{PinPolicy, PinPolicyError};
pub use secret_store::SecretStore;
pub use session::SessionFlag;
