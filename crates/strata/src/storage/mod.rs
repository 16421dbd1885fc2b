//! Storage gateway implementations.
//!
//! Both backends implement `strata_core::storage::StorageGateway`.
//!
//! # Feature Flags
//!
//! - `inmemory` (default): in-process tables, used by the test suite
//! - `dynamodb`: AWS DynamoDB using `aws-sdk-dynamodb`

#[cfg(feature = "inmemory")]
pub mod inmemory;

#[cfg(feature = "dynamodb")]
pub mod dynamodb;

#[cfg(feature = "inmemory")]
pub use inmemory::InMemoryGateway;

#[cfg(feature = "dynamodb")]
pub use dynamodb::DynamoDbGateway;
