//! Backend-neutral core of the strata data-access layer.
//!
//! Everything in this crate is pure: the record model, the expression AST
//! and its DynamoDB renderer, pagination cursors, storage request types and
//! the capability traits (`StorageGateway`, `QueryCache`, `EventSink`,
//! `Validator`) that the imperative shell in the `strata` crate implements.

pub mod cache;
pub mod events;
pub mod expression;
pub mod record;
pub mod storage;
pub mod validation;
