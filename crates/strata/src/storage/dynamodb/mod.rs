//! DynamoDB storage backend.
//!
//! Renders the expression AST with `ExpressionBuilder` and issues the calls
//! through `aws-sdk-dynamodb`.

mod conversions;
mod error;
mod gateway;

pub use gateway::DynamoDbGateway;
