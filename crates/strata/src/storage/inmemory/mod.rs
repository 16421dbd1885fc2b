//! In-memory storage backend for testing.
//!
//! Tables live in `Arc<RwLock<_>>`-wrapped maps keyed by `id`. Conditions,
//! update plans and projections are evaluated the way the managed store
//! evaluates them, so services can be exercised without a network.
//!
//! # Example
//!
//! ```rust,ignore
//! use strata::storage::inmemory::InMemoryGateway;
//!
//! let gateway = InMemoryGateway::new();
//! // Hand it to a DataAccessService...
//! ```

mod gateway;

pub use gateway::InMemoryGateway;
