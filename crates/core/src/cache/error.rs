use thiserror::Error;

/// Failures of a query cache backend.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("Query cache unavailable: {0}")]
    OperationFailed(String),
    #[error("Query key could not be serialized: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, CacheError>;

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Serialization(err.to_string())
    }
}
