use async_trait::async_trait;

use super::{
    BatchGetRequest, DeleteRequest, GetRequest, Item, Page, PutRequest, QueryRequest, Result,
    ScanRequest, UpdateRequest, WriteOp,
};

/// Adapter issuing calls against a keyed storage backend.
///
/// Conditional writes fail with `GatewayError::ConditionalCheckFailed`;
/// canceled transactions carry one reason code per submitted operation.
#[async_trait]
pub trait StorageGateway: Send + Sync {
    /// Reads one item by primary key.
    async fn get(&self, request: GetRequest) -> Result<Option<Item>>;

    /// Writes a whole item, subject to an optional condition.
    async fn put(&self, request: PutRequest) -> Result<()>;

    /// Applies an update plan and returns the item as stored afterwards.
    async fn update(&self, request: UpdateRequest) -> Result<Item>;

    /// Deletes one item, subject to an optional condition.
    async fn delete(&self, request: DeleteRequest) -> Result<()>;

    /// Reads one page of an index or the table by key condition.
    async fn query(&self, request: QueryRequest) -> Result<Page>;

    /// Reads one page of a full table or index scan.
    async fn scan(&self, request: ScanRequest) -> Result<Page>;

    /// Reads many items by key; missing keys are omitted.
    async fn batch_get(&self, request: BatchGetRequest) -> Result<Vec<Item>>;

    /// Applies all operations atomically, or none of them.
    async fn transact_write(&self, operations: Vec<WriteOp>) -> Result<()>;

    /// Reads many items in one consistent snapshot, preserving order.
    async fn transact_get(&self, requests: Vec<GetRequest>) -> Result<Vec<Option<Item>>>;
}
