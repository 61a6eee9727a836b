use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_MIN_LENGTH: usize = 4;
pub const DEFAULT_MAX_LENGTH: usize = 8;

/// Format rules the settings and reset flows apply before storing a PIN.
///
/// The secret store accepts any string; this policy belongs to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinPolicy {
    #[serde(default = "default_min_length")]
    pub min_length: usize,
    #[serde(default = "default_max_length")]
    pub max_length: usize,
    #[serde(default = "default_digits_only")]
    pub digits_only: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PinPolicyError {
    #[error("PIN must not be empty")]
    Empty,
    #[error("PIN must be at least {min} digits")]
    TooShort { min: usize },
    #[error("PIN must be at most {max} digits")]
    TooLong { max: usize },
    #[error("PIN may contain digits only")]
    NonDigit,
}

impl Default for PinPolicy {
    fn default() -> Self {
        Self {
            min_length: default_min_length(),
            max_length: default_max_length(),
            digits_only: default_digits_only(),
        }
    }
}

impl PinPolicy {
    pub fn validate(&self, pin: &str) -> Result<(), PinPolicyError> {
        if pin.is_empty() {
            return Err(PinPolicyError::Empty);
        }
        if self.digits_only && !pin.chars().all(|c| c.is_ascii_digit()) {
            return Err(PinPolicyError::NonDigit);
        }
        let len = pin.chars().count();
        if len < self.min_length {
            return Err(PinPolicyError::TooShort {
                min: self.min_length,
            });
        }
        if len > self.max_length {
            return Err(PinPolicyError::TooLong {
                max: self.max_length,
            });
        }
        Ok(())
    }
}

fn default_min_length() -> usize {
    DEFAULT_MIN_LENGTH
}

fn default_max_length() -> usize {
    DEFAULT_MAX_LENGTH
}

fn default_digits_only() -> bool {
    true
}
