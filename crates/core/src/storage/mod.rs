//! Storage gateway contract: request types, pagination cursor and errors.

mod cursor;
mod error;
mod traits;
mod types;

pub use cursor::{Cursor, CursorError};
pub use error::{
    parse_cancellation_reasons, GatewayError, Result, REASON_CONDITIONAL_CHECK_FAILED,
    REASON_NONE, REASON_TRANSACTION_CONFLICT,
};
pub use traits::StorageGateway;
pub use types::{
    id_key, BatchGetRequest, DeleteRequest, GetRequest, Item, Page, PutRequest, QueryRequest,
    ScanRequest, Select, UpdateRequest, WriteOp, BATCH_GET_LIMIT, TRANSACT_GET_LIMIT,
    TRANSACT_WRITE_LIMIT,
};
