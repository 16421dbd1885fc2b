use serde::Serialize;
use serde_json::{Map, Value};

use crate::expression::{Condition, KeyCondition, Projection, UpdatePlan};

/// A backend-neutral stored item.
pub type Item = Map<String, Value>;

/// Maximum number of operations in one transactional write.
pub const TRANSACT_WRITE_LIMIT: usize = 25;
/// Maximum number of operations in one transactional read.
pub const TRANSACT_GET_LIMIT: usize = 25;
/// Maximum number of keys in one batch read.
pub const BATCH_GET_LIMIT: usize = 100;

/// Builds the primary key of an item.
pub fn id_key(id: &str) -> Item {
    let mut key = Item::new();
    key.insert("id".to_string(), Value::String(id.to_string()));
    key
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GetRequest {
    pub table: String,
    pub key: Item,
    pub projection: Projection,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PutRequest {
    pub table: String,
    pub item: Item,
    pub condition: Option<Condition>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateRequest {
    pub table: String,
    pub key: Item,
    pub update: UpdatePlan,
    pub condition: Option<Condition>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeleteRequest {
    pub table: String,
    pub key: Item,
    pub condition: Option<Condition>,
}

/// What a query returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum Select {
    #[default]
    Items,
    Count,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryRequest {
    pub table: String,
    pub index: Option<String>,
    pub key_condition: KeyCondition,
    pub projection: Projection,
    /// `true` scans the index forward (ascending sort key).
    pub ascending: bool,
    pub limit: Option<u32>,
    pub start_key: Option<Item>,
    pub select: Select,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanRequest {
    pub table: String,
    pub index: Option<String>,
    pub projection: Projection,
    pub limit: Option<u32>,
    pub start_key: Option<Item>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchGetRequest {
    pub table: String,
    pub keys: Vec<Item>,
    pub projection: Projection,
}

/// One operation of a transactional write.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum WriteOp {
    Put(PutRequest),
    Update(UpdateRequest),
    Delete(DeleteRequest),
}

impl WriteOp {
    pub fn table(&self) -> &str {
        match self {
            WriteOp::Put(req) => &req.table,
            WriteOp::Update(req) => &req.table,
            WriteOp::Delete(req) => &req.table,
        }
    }

    /// The `id` the operation targets, if it carries one.
    pub fn id(&self) -> Option<&str> {
        let key = match self {
            WriteOp::Put(req) => &req.item,
            WriteOp::Update(req) => &req.key,
            WriteOp::Delete(req) => &req.key,
        };
        key.get("id").and_then(Value::as_str)
    }

    pub fn condition(&self) -> Option<&Condition> {
        match self {
            WriteOp::Put(req) => req.condition.as_ref(),
            WriteOp::Update(req) => req.condition.as_ref(),
            WriteOp::Delete(req) => req.condition.as_ref(),
        }
    }
}

/// One page of raw query or scan results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub items: Vec<Item>,
    /// Number of matched items; equals `items.len()` unless only counting.
    pub count: usize,
    pub last_evaluated_key: Option<Item>,
}
