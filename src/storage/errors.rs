//! Storage error types

use thiserror::Error;

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// Table does not exist in the backend
    #[error("Unknown table: {0}")]
    UnknownTable(String),

    /// Backend failed to run a statement
    #[error("Execution failed: {0}")]
    Execution(String),
}

impl StorageError {
    pub fn execution(message: impl Into<String>) -> Self {
        StorageError::Execution(message.into())
    }

    pub fn code(&self) -> &'static str {
        match self {
            StorageError::UnknownTable(_) => "UNKNOWN_TABLE",
            StorageError::Execution(_) => "EXECUTION_FAILED",
        }
    }
}
