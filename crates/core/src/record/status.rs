use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle timestamp attributes, one per keyed status.
pub const LIFECYCLE_FIELDS: [&str; 5] = ["draft", "enable", "disable", "delete", "block"];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StatusError {
    #[error("Unknown status code: {0}")]
    UnknownCode(u64),
    #[error("Status {0:?} has no lifecycle key")]
    NoLifecycleKey(Status),
}

/// Record lifecycle status, stored as its integer code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Status {
    #[default]
    None,
    Draft,
    Enabled,
    Disabled,
    Deleted,
    Blocked,
    Error,
}

impl Status {
    pub fn code(self) -> u8 {
        match self {
            Status::None => 0,
            Status::Draft => 1,
            Status::Enabled => 2,
            Status::Disabled => 3,
            Status::Deleted => 4,
            Status::Blocked => 5,
            Status::Error => 99,
        }
    }

    /// Name of the lifecycle timestamp attribute (and index) of this status.
    pub fn key(self) -> Result<&'static str, StatusError> {
        match self {
            Status::Draft => Ok("draft"),
            Status::Enabled => Ok("enable"),
            Status::Disabled => Ok("disable"),
            Status::Deleted => Ok("delete"),
            Status::Blocked => Ok("block"),
            Status::None | Status::Error => Err(StatusError::NoLifecycleKey(self)),
        }
    }
}

impl From<Status> for u8 {
    fn from(status: Status) -> Self {
        status.code()
    }
}

impl From<Status> for serde_json::Value {
    fn from(status: Status) -> Self {
        serde_json::Value::from(status.code())
    }
}

impl TryFrom<u8> for Status {
    type Error = StatusError;

    fn try_from(code: u8) -> Result<Self, StatusError> {
        match code {
            0 => Ok(Status::None),
            1 => Ok(Status::Draft),
            2 => Ok(Status::Enabled),
            3 => Ok(Status::Disabled),
            4 => Ok(Status::Deleted),
            5 => Ok(Status::Blocked),
            99 => Ok(Status::Error),
            other => Err(StatusError::UnknownCode(u64::from(other))),
        }
    }
}
