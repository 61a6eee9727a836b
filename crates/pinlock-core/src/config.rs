use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::kv::DEFAULT_KEYRING_SERVICE;
use crate::policy::PinPolicy;

pub const DEFAULT_SECRET_KEY: &str = "pinlock.secret";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    File,
    Keyring,
    /// Lives only as long as the process. For tests and embedders that keep
    /// one controller alive; a short-lived CLI loses every write.
    Memory,
}

impl StoreBackend {
    pub fn is_persistent(self) -> bool {
        !matches!(self, StoreBackend::Memory)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockConfig {
    #[serde(default = "default_backend")]
    pub backend: StoreBackend,
    /// Key the PIN record lives under. Must not be shared with any other
    /// application data kept in the same backend.
    #[serde(default = "default_secret_key")]
    pub secret_key: String,
    #[serde(default = "default_keyring_service")]
    pub keyring_service: String,
    #[serde(default)]
    pub policy: PinPolicy,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            secret_key: default_secret_key(),
            keyring_service: default_keyring_service(),
            policy: PinPolicy::default(),
        }
    }
}

impl LockConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.secret_key.trim().is_empty() {
            return Err(anyhow!("secret_key must not be empty"));
        }
        if self.backend == StoreBackend::Keyring && self.keyring_service.trim().is_empty() {
            return Err(anyhow!("keyring_service must not be empty"));
        }
        if self.policy.min_length == 0 || self.policy.min_length > self.policy.max_length {
            return Err(anyhow!(
                "invalid PIN length bounds {}..={}",
                self.policy.min_length,
                self.policy.max_length
            ));
        }
        Ok(())
    }
}

/// Reads the config at `path`, falling back to defaults when the file is absent.
pub fn load_config(path: &Path) -> anyhow::Result<LockConfig> {
    let config = match std::fs::read(path) {
        Ok(bytes) => serde_json::from_slice(&bytes)
            .with_context(|| format!("parse config {}", path.display()))?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => LockConfig::default(),
        Err(e) => return Err(anyhow!("read config {}: {e}", path.display())),
    };
    config.validate()?;
    Ok(config)
}

pub fn save_config(path: &Path, config: &LockConfig) -> anyhow::Result<()> {
    config.validate()?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let data = serde_json::to_vec_pretty(config)?;
    std::fs::write(path, data).with_context(|| format!("write config {}", path.display()))?;
    Ok(())
}

fn default_backend() -> StoreBackend {
    StoreBackend::File
}

fn default_secret_key() -> String {
    DEFAULT_SECRET_KEY.to_string()
}

fn default_keyring_service() -> String {
    DEFAULT_KEYRING_SERVICE.to_string()
}
