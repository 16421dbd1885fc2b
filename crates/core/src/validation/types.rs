use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Category of a schema violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ViolationKind {
    Required,
    Type,
    ExpectedNumber,
    MinLength,
    MaxLength,
    Minimum,
    Maximum,
    Enum,
    Format,
    Pattern,
    Other,
}

/// One schema violation, tagged with the offending field path.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{field}: {message}")]
pub struct SchemaViolation {
    pub field: String,
    pub kind: ViolationKind,
    pub message: String,
}

impl SchemaViolation {
    pub fn new(field: impl Into<String>, kind: ViolationKind, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            kind,
            message: message.into(),
        }
    }
}
