use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};

use strata_core::expression::{compare_values, Condition, KeyCondition, Projection};
use strata_core::storage::{
    BatchGetRequest, DeleteRequest, GatewayError, GetRequest, Item, Page, PutRequest,
    QueryRequest, Result, ScanRequest, Select, StorageGateway, UpdateRequest, WriteOp,
    BATCH_GET_LIMIT, REASON_CONDITIONAL_CHECK_FAILED, REASON_NONE, TRANSACT_GET_LIMIT,
    TRANSACT_WRITE_LIMIT,
};

type Table = BTreeMap<String, Item>;

/// A failure injected into a future gateway call.
#[derive(Debug)]
struct Fault {
    skip: usize,
    error: GatewayError,
}

/// In-memory storage gateway for testing.
///
/// Tables are created on first write. Query results are ordered by the sort
/// attribute of the key condition, then by `id`; an index only contains the
/// items carrying all of its key attributes.
#[derive(Debug, Clone, Default)]
pub struct InMemoryGateway {
    tables: Arc<RwLock<HashMap<String, Table>>>,
    faults: Arc<Mutex<Vec<Fault>>>,
    calls: Arc<AtomicUsize>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails the next gateway call with `error`.
    pub async fn fail_next(&self, error: GatewayError) {
        self.fail_after(0, error).await;
    }

    /// Lets `skip` gateway calls succeed, then fails the following one.
    pub async fn fail_after(&self, skip: usize, error: GatewayError) {
        self.faults.lock().await.push(Fault { skip, error });
    }

    /// Number of gateway calls served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(AtomicOrdering::SeqCst)
    }

    /// Stores an item as is, bypassing conditions.
    pub async fn insert(&self, table: &str, item: Item) -> Result<()> {
        let id = item_id(&item)?;
        let mut tables = self.tables.write().await;
        tables.entry(table.to_string()).or_default().insert(id, item);
        Ok(())
    }

    /// Returns a stored item as is.
    pub async fn item(&self, table: &str, id: &str) -> Option<Item> {
        let tables = self.tables.read().await;
        tables.get(table).and_then(|t| t.get(id)).cloned()
    }

    /// Number of items stored in a table.
    pub async fn len(&self, table: &str) -> usize {
        let tables = self.tables.read().await;
        tables.get(table).map(BTreeMap::len).unwrap_or(0)
    }

    async fn begin_call(&self) -> Result<()> {
        self.calls.fetch_add(1, AtomicOrdering::SeqCst);

        let mut faults = self.faults.lock().await;
        let mut fired = None;
        for (i, fault) in faults.iter_mut().enumerate() {
            if fault.skip == 0 {
                fired = Some(i);
                break;
            }
            fault.skip -= 1;
        }
        match fired {
            Some(i) => Err(faults.remove(i).error),
            None => Ok(()),
        }
    }
}

fn item_id(item: &Item) -> Result<String> {
    item.get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| GatewayError::InvalidRequest("item key is missing a string id".to_string()))
}

fn check(condition: Option<&Condition>, current: Option<&Item>) -> bool {
    let empty = Item::new();
    condition.is_none_or(|c| c.matches(current.unwrap_or(&empty)))
}

fn project(item: &Item, projection: &Projection) -> Item {
    if projection.is_all() {
        item.clone()
    } else {
        projection.apply(item)
    }
}

/// Orders items by the sort attribute (when present), then by `id`.
fn order(a: &Item, b: &Item, sort: Option<&str>) -> Ordering {
    let by_sort = sort
        .and_then(|name| compare_values(a.get(name)?, b.get(name)?))
        .unwrap_or(Ordering::Equal);
    let id = |item: &Item| item.get("id").and_then(Value::as_str).map(str::to_string);
    by_sort.then_with(|| id(a).cmp(&id(b)))
}

/// Every attribute an index named `a-b` requires: `a` and `b`.
fn in_index(item: &Item, index: Option<&str>) -> bool {
    index.is_none_or(|name| name.split('-').all(|attr| item.contains_key(attr)))
}

/// The last-evaluated key of a query: `id` plus the index key attributes.
fn evaluated_key(item: &Item, condition: &KeyCondition) -> Item {
    let mut key = Item::new();
    let names = condition
        .keys
        .iter()
        .map(|(name, _)| name.as_str())
        .chain(condition.sort_name())
        .chain(std::iter::once("id"));
    for name in names {
        if let Some(value) = item.get(name) {
            key.insert(name.to_string(), value.clone());
        }
    }
    key
}

/// Resolves a write against the current table state, without applying it.
fn resolve(table: Option<&Table>, op: &WriteOp) -> Result<(String, Option<Item>, bool)> {
    let (id, condition) = match op {
        WriteOp::Put(req) => (item_id(&req.item)?, req.condition.as_ref()),
        WriteOp::Update(req) => (item_id(&req.key)?, req.condition.as_ref()),
        WriteOp::Delete(req) => (item_id(&req.key)?, req.condition.as_ref()),
    };
    let current = table.and_then(|t| t.get(&id));
    if !check(condition, current) {
        return Ok((id, None, false));
    }
    let next = match op {
        WriteOp::Put(req) => Some(req.item.clone()),
        WriteOp::Update(req) => {
            let mut item = current.cloned().unwrap_or_else(|| req.key.clone());
            req.update.apply(&mut item);
            Some(item)
        }
        WriteOp::Delete(_) => None,
    };
    Ok((id, next, true))
}

fn store(tables: &mut HashMap<String, Table>, table: &str, id: String, next: Option<Item>) {
    let table = tables.entry(table.to_string()).or_default();
    match next {
        Some(item) => {
            table.insert(id, item);
        }
        None => {
            table.remove(&id);
        }
    }
}

#[async_trait]
impl StorageGateway for InMemoryGateway {
    async fn get(&self, request: GetRequest) -> Result<Option<Item>> {
        self.begin_call().await?;
        let id = item_id(&request.key)?;
        let tables = self.tables.read().await;
        Ok(tables
            .get(&request.table)
            .and_then(|t| t.get(&id))
            .map(|item| project(item, &request.projection)))
    }

    async fn put(&self, request: PutRequest) -> Result<()> {
        self.begin_call().await?;
        let op = WriteOp::Put(request);
        let mut tables = self.tables.write().await;
        let (id, next, ok) = resolve(tables.get(op.table()), &op)?;
        if !ok {
            return Err(GatewayError::ConditionalCheckFailed);
        }
        store(&mut tables, op.table(), id, next);
        Ok(())
    }

    async fn update(&self, request: UpdateRequest) -> Result<Item> {
        self.begin_call().await?;
        let op = WriteOp::Update(request);
        let mut tables = self.tables.write().await;
        let (id, next, ok) = resolve(tables.get(op.table()), &op)?;
        if !ok {
            return Err(GatewayError::ConditionalCheckFailed);
        }
        let updated = next.clone().unwrap_or_default();
        store(&mut tables, op.table(), id, next);
        Ok(updated)
    }

    async fn delete(&self, request: DeleteRequest) -> Result<()> {
        self.begin_call().await?;
        let op = WriteOp::Delete(request);
        let mut tables = self.tables.write().await;
        let (id, next, ok) = resolve(tables.get(op.table()), &op)?;
        if !ok {
            return Err(GatewayError::ConditionalCheckFailed);
        }
        store(&mut tables, op.table(), id, next);
        Ok(())
    }

    async fn query(&self, request: QueryRequest) -> Result<Page> {
        self.begin_call().await?;
        if request.key_condition.keys.is_empty() {
            return Err(GatewayError::InvalidRequest(
                "key condition requires at least one key".to_string(),
            ));
        }

        let tables = self.tables.read().await;
        let sort = request.key_condition.sort_name();
        let mut matched: Vec<&Item> = tables
            .get(&request.table)
            .map(|t| {
                t.values()
                    .filter(|item| in_index(item, request.index.as_deref()))
                    .filter(|item| request.key_condition.matches(item))
                    .collect()
            })
            .unwrap_or_default();

        matched.sort_by(|a, b| order(a, b, sort));
        if !request.ascending {
            matched.reverse();
        }

        if let Some(start) = &request.start_key {
            let after = if request.ascending {
                Ordering::Greater
            } else {
                Ordering::Less
            };
            matched.retain(|item| order(item, start, sort) == after);
        }

        let limit = request.limit.map(|l| l as usize).unwrap_or(usize::MAX);
        let more = matched.len() > limit;
        matched.truncate(limit);

        let last_evaluated_key = if more {
            matched
                .last()
                .map(|item| evaluated_key(item, &request.key_condition))
        } else {
            None
        };

        let count = matched.len();
        let items = match request.select {
            Select::Count => Vec::new(),
            Select::Items => matched
                .into_iter()
                .map(|item| project(item, &request.projection))
                .collect(),
        };

        Ok(Page {
            items,
            count,
            last_evaluated_key,
        })
    }

    async fn scan(&self, request: ScanRequest) -> Result<Page> {
        self.begin_call().await?;
        let tables = self.tables.read().await;
        let start = match &request.start_key {
            Some(key) => Some(item_id(key)?),
            None => None,
        };

        let mut matched: Vec<&Item> = tables
            .get(&request.table)
            .map(|t| {
                t.iter()
                    .filter(|(id, _)| start.as_ref().is_none_or(|s| *id > s))
                    .map(|(_, item)| item)
                    .filter(|item| in_index(item, request.index.as_deref()))
                    .collect()
            })
            .unwrap_or_default();

        let limit = request.limit.map(|l| l as usize).unwrap_or(usize::MAX);
        let more = matched.len() > limit;
        matched.truncate(limit);

        let last_evaluated_key = if more {
            matched
                .last()
                .and_then(|item| item.get("id"))
                .map(|id| {
                    let mut key = Item::new();
                    key.insert("id".to_string(), id.clone());
                    key
                })
        } else {
            None
        };

        let items: Vec<Item> = matched
            .into_iter()
            .map(|item| project(item, &request.projection))
            .collect();

        Ok(Page {
            count: items.len(),
            items,
            last_evaluated_key,
        })
    }

    async fn batch_get(&self, request: BatchGetRequest) -> Result<Vec<Item>> {
        self.begin_call().await?;
        if request.keys.len() > BATCH_GET_LIMIT {
            return Err(GatewayError::InvalidRequest(format!(
                "batch get accepts at most {} keys",
                BATCH_GET_LIMIT
            )));
        }

        let tables = self.tables.read().await;
        let Some(table) = tables.get(&request.table) else {
            return Ok(Vec::new());
        };

        let mut items = Vec::new();
        for key in &request.keys {
            if let Some(item) = table.get(&item_id(key)?) {
                items.push(project(item, &request.projection));
            }
        }
        Ok(items)
    }

    async fn transact_write(&self, operations: Vec<WriteOp>) -> Result<()> {
        self.begin_call().await?;
        if operations.len() > TRANSACT_WRITE_LIMIT {
            return Err(GatewayError::InvalidRequest(format!(
                "transactions accept at most {} operations",
                TRANSACT_WRITE_LIMIT
            )));
        }

        let mut seen = HashSet::new();
        for op in &operations {
            let target = (op.table().to_string(), op.id().map(str::to_string));
            if !seen.insert(target) {
                return Err(GatewayError::InvalidRequest(
                    "transaction cannot include multiple operations on one item".to_string(),
                ));
            }
        }

        let mut tables = self.tables.write().await;
        let mut resolved = Vec::with_capacity(operations.len());
        let mut reasons = Vec::with_capacity(operations.len());
        for op in &operations {
            let (id, next, ok) = resolve(tables.get(op.table()), op)?;
            reasons.push(if ok {
                REASON_NONE.to_string()
            } else {
                REASON_CONDITIONAL_CHECK_FAILED.to_string()
            });
            resolved.push((op.table(), id, next));
        }

        if reasons.iter().any(|r| r != REASON_NONE) {
            return Err(GatewayError::TransactionCanceled { reasons });
        }

        for (table, id, next) in resolved {
            store(&mut tables, table, id, next);
        }
        Ok(())
    }

    async fn transact_get(&self, requests: Vec<GetRequest>) -> Result<Vec<Option<Item>>> {
        self.begin_call().await?;
        if requests.len() > TRANSACT_GET_LIMIT {
            return Err(GatewayError::InvalidRequest(format!(
                "transactions accept at most {} operations",
                TRANSACT_GET_LIMIT
            )));
        }

        let tables = self.tables.read().await;
        requests
            .iter()
            .map(|request| {
                let id = item_id(&request.key)?;
                Ok(tables
                    .get(&request.table)
                    .and_then(|t| t.get(&id))
                    .map(|item| project(item, &request.projection)))
            })
            .collect()
    }
}
