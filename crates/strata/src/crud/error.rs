use thiserror::Error;

use strata_core::record::StatusError;
use strata_core::storage::GatewayError;
use strata_core::validation::SchemaViolation;

use crate::data::{DataError, DataErrorKind};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CrudError {
    #[error("Id already exists: {0}")]
    IdExists(String),
    #[error("User is not allowed to access this record")]
    Forbidden,
    #[error("Record must be enabled")]
    EnabledRequired,
    #[error("Invalid status: {0}")]
    StatusInvalid(#[from] StatusError),
    #[error("Data is empty")]
    DataEmpty,
    #[error("Schema error at {field}: {message}")]
    Schema { field: String, message: String },
    #[error(transparent)]
    Data(#[from] DataError),
}

impl CrudError {
    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            CrudError::IdExists(_) => "ID_EXISTS",
            CrudError::Forbidden => "USER_FORBIDDEN",
            CrudError::EnabledRequired => "ENABLED_REQUIRED",
            CrudError::StatusInvalid(_) => "STATUS_INVALID",
            CrudError::DataEmpty => "DATA_EMPTY",
            CrudError::Schema { .. } => "SCHEMA_ERROR",
            CrudError::Data(_) => "DATA",
        }
    }
}

impl From<SchemaViolation> for CrudError {
    fn from(violation: SchemaViolation) -> Self {
        CrudError::Schema {
            field: violation.field,
            message: violation.message,
        }
    }
}

pub type Result<T> = std::result::Result<T, CrudError>;

/// Maps a [`CrudError`] to an HTTP status code.
///
/// - `IdExists` -> 409 (Conflict)
/// - `Forbidden` -> 403 (Forbidden)
/// - `EnabledRequired` -> 412 (Precondition Failed)
/// - `StatusInvalid`, `DataEmpty` -> 400 (Bad Request)
/// - `Schema` -> 422 (Unprocessable Entity)
/// - `Data` -> by kind; unreachable or throttled backends give 503
pub fn crud_error_to_status_code(error: &CrudError) -> u16 {
    match error {
        CrudError::IdExists(_) => 409,
        CrudError::Forbidden => 403,
        CrudError::EnabledRequired => 412,
        CrudError::StatusInvalid(_) => 400,
        CrudError::DataEmpty => 400,
        CrudError::Schema { .. } => 422,
        CrudError::Data(DataError::Gateway(
            GatewayError::ConnectionFailed(_) | GatewayError::Throttled(_),
        )) => 503,
        CrudError::Data(err) => match err.kind() {
            DataErrorKind::AlreadyExists | DataErrorKind::ConditionFailed => 409,
            DataErrorKind::InvalidCursor => 400,
            DataErrorKind::Serialization | DataErrorKind::Fatal => 500,
        },
    }
}
