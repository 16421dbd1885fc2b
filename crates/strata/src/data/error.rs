use thiserror::Error;

use strata_core::storage::{CursorError, GatewayError};

/// Failure categories callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataErrorKind {
    AlreadyExists,
    ConditionFailed,
    InvalidCursor,
    Serialization,
    Fatal,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DataError {
    #[error("Item already exists: {0}")]
    AlreadyExists(String),
    #[error("Condition failed for item: {0}")]
    ConditionFailed(String),
    #[error("Invalid cursor: {0}")]
    InvalidCursor(#[from] CursorError),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl DataError {
    pub fn kind(&self) -> DataErrorKind {
        match self {
            DataError::AlreadyExists(_) => DataErrorKind::AlreadyExists,
            DataError::ConditionFailed(_) => DataErrorKind::ConditionFailed,
            DataError::InvalidCursor(_) => DataErrorKind::InvalidCursor,
            DataError::Serialization(_) => DataErrorKind::Serialization,
            DataError::Gateway(_) => DataErrorKind::Fatal,
        }
    }

    pub fn is_condition_failed(&self) -> bool {
        self.kind() == DataErrorKind::ConditionFailed
    }
}

impl From<serde_json::Error> for DataError {
    fn from(err: serde_json::Error) -> Self {
        DataError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DataError>;
