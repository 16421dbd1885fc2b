use thiserror::Error;

/// Errors raised while rendering an expression.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExpressionError {
    #[error("Key condition requires at least one key attribute")]
    EmptyKeyCondition,
    #[error("Attribute path is empty")]
    EmptyPath,
}
