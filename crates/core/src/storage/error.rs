use thiserror::Error;

/// Per-item reason code for a transaction item that did not fail.
pub const REASON_NONE: &str = "None";
/// Per-item reason code for a transaction item whose condition did not hold.
pub const REASON_CONDITIONAL_CHECK_FAILED: &str = "ConditionalCheckFailed";
/// Per-item reason code for a transaction item that raced another transaction.
pub const REASON_TRANSACTION_CONFLICT: &str = "TransactionConflict";

/// Errors surfaced by a storage gateway.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Conditional check failed")]
    ConditionalCheckFailed,
    #[error("Transaction canceled, reasons [{}]", .reasons.join(", "))]
    TransactionCanceled { reasons: Vec<String> },
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),
    #[error("Throttled: {0}")]
    Throttled(String),
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Backend error: {0}")]
    Backend(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl GatewayError {
    /// Per-item reason codes when a transaction was canceled by item-level
    /// outcomes only (condition failures or conflicts).
    pub fn item_level_reasons(&self) -> Option<&[String]> {
        match self {
            GatewayError::TransactionCanceled { reasons }
                if reasons.iter().any(|reason| {
                    reason == REASON_CONDITIONAL_CHECK_FAILED || reason == REASON_TRANSACTION_CONFLICT
                }) =>
            {
                Some(reasons)
            }
            _ => None,
        }
    }

    pub fn is_item_level_cancellation(&self) -> bool {
        self.item_level_reasons().is_some()
    }
}

/// Result type for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Extracts the bracketed per-item reason list from a cancellation message,
/// e.g. `"... reasons [None, ConditionalCheckFailed]"`.
pub fn parse_cancellation_reasons(message: &str) -> Vec<String> {
    let Some(start) = message.rfind('[') else {
        return Vec::new();
    };
    let Some(len) = message[start..].find(']') else {
        return Vec::new();
    };
    message[start + 1..start + len]
        .split(',')
        .map(str::trim)
        .filter(|reason| !reason.is_empty())
        .map(str::to_string)
        .collect()
}
