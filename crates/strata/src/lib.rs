//! Data-access and CRUD lifecycle services over a keyed wide-column store.
//!
//! `DataAccessService` is a thin layer of paged queries, conditional writes
//! and chunked transactions over a [`strata_core::storage::StorageGateway`].
//! `CrudService` composes it into owner-scoped records with a status
//! lifecycle. Gateways: `InMemoryGateway` (feature `inmemory`, default) and
//! `DynamoDbGateway` (feature `dynamodb`).

pub mod cache;
pub mod config;
pub mod crud;
pub mod data;
pub mod events;
pub mod storage;

pub use config::{ConfigError, StrataConfig};
pub use crud::{CrudError, CrudService, StatusQuery, Transition};
pub use data::{DataAccess, DataAccessService, DataError, IndexQuery, PageResult, ScanQuery};
