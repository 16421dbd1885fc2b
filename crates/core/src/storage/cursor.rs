use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::Item;

/// Errors raised when a cursor cannot be turned back into a key.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CursorError {
    #[error("Cursor is not valid base64: {0}")]
    Encoding(String),
    #[error("Cursor does not hold a key object: {0}")]
    Format(String),
}

/// Opaque pagination position: base64 of the JSON-serialized
/// last-evaluated key.
///
/// A cursor is only meaningful when replayed with the same index, key,
/// sort filter and fields that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    pub fn encode(key: &Item) -> Self {
        let json = Value::Object(key.clone()).to_string();
        Self(STANDARD.encode(json))
    }

    pub fn decode(&self) -> Result<Item, CursorError> {
        let bytes = STANDARD
            .decode(&self.0)
            .map_err(|e| CursorError::Encoding(e.to_string()))?;
        match serde_json::from_slice::<Value>(&bytes) {
            Ok(Value::Object(key)) => Ok(key),
            Ok(other) => Err(CursorError::Format(format!("expected object, got {other}"))),
            Err(e) => Err(CursorError::Format(e.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Cursor {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Cursor {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
