//! Generic data access over one table.
//!
//! `DataAccessService` turns paged queries, point reads, conditional writes
//! and chunked transactions into `StorageGateway` calls, handling cursors
//! and per-item transaction outcomes.

mod error;
mod service;
mod transact;
mod types;

pub use error::{DataError, DataErrorKind, Result};
pub use service::{DataAccess, DataAccessService};
pub use transact::{chunk_outcomes, chunked};
pub use types::{IndexQuery, PageResult, ScanQuery};
