use std::fmt;

use thiserror::Error;

use crate::policy::PinPolicyError;

/// Which storage primitive failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageOp {
    Get,
    Set,
    Delete,
}

impl fmt::Display for StorageOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StorageOp::Get => "get",
            StorageOp::Set => "set",
            StorageOp::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// The underlying key-value storage failed a read, write or delete.
#[derive(Debug, Clone, Error)]
#[error("storage {op} failed: {message}")]
pub struct StorageFault {
    pub op: StorageOp,
    pub message: String,
}

impl StorageFault {
    pub fn new(op: StorageOp, message: impl Into<String>) -> Self {
        Self {
            op,
            message: message.into(),
        }
    }

    pub fn get(message: impl Into<String>) -> Self {
        Self::new(StorageOp::Get, message)
    }

    pub fn set(message: impl Into<String>) -> Self {
        Self::new(StorageOp::Set, message)
    }

    pub fn delete(message: impl Into<String>) -> Self {
        Self::new(StorageOp::Delete, message)
    }
}

#[derive(Debug, Error)]
pub enum LockError {
    #[error(transparent)]
    Storage(#[from] StorageFault),

    #[error("PIN rejected: {0}")]
    Policy(#[from] PinPolicyError),
}

pub type LockResult<T> = Result<T, LockError>;
