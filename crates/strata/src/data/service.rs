use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::try_join_all;
use serde_json::Value;

use strata_core::cache::{query_key, NoopQueryCache, QueryCache};
use strata_core::expression::{Condition, KeyCondition, Projection, UpdatePlan};
use strata_core::record::strip_nulls;
use strata_core::storage::{
    id_key, BatchGetRequest, Cursor, DeleteRequest, GatewayError, GetRequest, Item, PutRequest,
    QueryRequest, ScanRequest, Select, StorageGateway, UpdateRequest, WriteOp, BATCH_GET_LIMIT,
    TRANSACT_GET_LIMIT, TRANSACT_WRITE_LIMIT,
};

use super::transact::{chunk_outcomes, chunked};
use super::{DataError, IndexQuery, PageResult, Result, ScanQuery};

/// Data-access operations on the table a service is bound to.
///
/// Conditional writes fail with `ConditionFailed` (or `AlreadyExists` for
/// creates); every other backend failure is `Fatal` and propagated.
#[async_trait]
pub trait DataAccess: Send + Sync {
    /// Name of the bound table.
    fn table(&self) -> &str;

    /// Reads one page of a query. A zero limit returns an empty page
    /// without calling the backend.
    async fn page_by_index(&self, query: IndexQuery) -> Result<PageResult<Item>>;

    /// Reads one page of a full scan.
    async fn scan_all(&self, query: ScanQuery) -> Result<PageResult<Item>>;

    /// Reads one page of the whole table.
    async fn page_all(&self, query: ScanQuery) -> Result<PageResult<Item>> {
        self.scan_all(ScanQuery { index: None, ..query }).await
    }

    /// Counts every match, following continuation keys to exhaustion.
    async fn count(&self, index: Option<&str>, key: KeyCondition) -> Result<usize>;

    /// `Ok(None)` when the item does not exist.
    async fn get_by_id(&self, id: &str, fields: &[String]) -> Result<Option<Item>>;

    /// First item of a query.
    async fn get_one(&self, query: IndexQuery) -> Result<Option<Item>>;

    /// Drains query pages until `limit` items are collected or matches run
    /// out. Results may come from the query cache.
    async fn list_by_key(&self, query: IndexQuery) -> Result<Vec<Item>>;

    /// Reads many items by id; duplicates are read once, missing ids skipped.
    async fn list_by_ids(&self, ids: &[String], fields: &[String]) -> Result<Vec<Item>>;

    /// Drains every scan page.
    async fn list_all(&self, index: Option<&str>, fields: &[String]) -> Result<Vec<Item>>;

    async fn exists_by_id(&self, id: &str) -> Result<bool>;

    async fn exists(&self, index: Option<&str>, key: KeyCondition) -> Result<bool>;

    /// Writes a new item; fails `AlreadyExists` when the id is taken or the
    /// extra condition does not hold.
    async fn create_item(&self, id: &str, model: Item, condition: Option<Condition>)
        -> Result<Item>;

    /// Overwrites an item unconditionally.
    async fn put_item(&self, id: &str, model: Item) -> Result<Item>;

    /// Updates an existing item from a partial model and returns it as
    /// stored. `extra` carries actions beyond the model, such as increments.
    async fn update_item(
        &self,
        id: &str,
        model: Item,
        condition: Option<Condition>,
        extra: UpdatePlan,
    ) -> Result<Item>;

    /// Deletes an existing item.
    async fn delete_item(&self, id: &str, condition: Option<Condition>) -> Result<()>;

    /// Deletes many existing items transactionally.
    async fn delete_by_ids(&self, ids: &[String]) -> Result<Vec<bool>>;

    /// Applies operations in sequential chunks and reports one outcome per
    /// operation, in input order.
    async fn transact_write(&self, operations: Vec<WriteOp>) -> Result<Vec<bool>>;

    /// Reads items in concurrent chunks; missing items are left out.
    async fn transact_read(&self, requests: Vec<GetRequest>) -> Result<Vec<Item>>;

    fn create_op(&self, id: &str, model: Item, condition: Option<Condition>) -> WriteOp;

    fn update_op(
        &self,
        id: &str,
        model: Item,
        condition: Option<Condition>,
        extra: UpdatePlan,
    ) -> WriteOp;

    fn delete_op(&self, id: &str, condition: Option<Condition>) -> WriteOp;

    fn get_op(&self, id: &str, fields: &[String]) -> GetRequest;
}

/// Data access bound to one table.
#[derive(Clone)]
pub struct DataAccessService {
    gateway: Arc<dyn StorageGateway>,
    cache: Arc<dyn QueryCache>,
    table: String,
}

impl std::fmt::Debug for DataAccessService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataAccessService")
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

impl DataAccessService {
    pub fn new(gateway: Arc<dyn StorageGateway>, table: impl Into<String>) -> Self {
        Self {
            gateway,
            cache: Arc::new(NoopQueryCache),
            table: table.into(),
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn QueryCache>) -> Self {
        self.cache = cache;
        self
    }

    fn query_request(&self, query: &IndexQuery, select: Select) -> Result<QueryRequest> {
        Ok(QueryRequest {
            table: self.table.clone(),
            index: query.index.clone(),
            key_condition: query.key.clone(),
            projection: query.projection(),
            ascending: query.ascending,
            limit: query.limit,
            start_key: query.cursor.as_ref().map(Cursor::decode).transpose()?,
            select,
        })
    }

    /// The model as written: `id` set from the key, `null`s dropped.
    fn with_id(id: &str, mut model: Item) -> Item {
        model.insert("id".to_string(), Value::from(id));
        strip_nulls(model)
    }

    fn update_request(
        &self,
        id: &str,
        mut model: Item,
        condition: Option<Condition>,
        extra: UpdatePlan,
    ) -> UpdateRequest {
        model.remove("id");
        UpdateRequest {
            table: self.table.clone(),
            key: id_key(id),
            update: UpdatePlan::from_model(&model).merge(extra),
            condition: Some(Condition::guarded(Condition::exists("id"), condition)),
        }
    }

    async fn cached(&self, key: &str) -> Option<Vec<Item>> {
        match self.cache.get(key).await {
            Ok(Some(bytes)) => match serde_json::from_slice(&bytes) {
                Ok(items) => {
                    tracing::trace!(table = %self.table, "Query cache hit");
                    Some(items)
                }
                Err(err) => {
                    tracing::warn!(table = %self.table, error = %err, "Discarding unreadable cache entry");
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                tracing::warn!(table = %self.table, error = %err, "Query cache read failed");
                None
            }
        }
    }

    async fn remember(&self, key: &str, items: &[Item]) {
        let stored = match serde_json::to_vec(items) {
            Ok(bytes) => self.cache.set(key, &bytes).await,
            Err(err) => {
                tracing::warn!(table = %self.table, error = %err, "Query result not cacheable");
                return;
            }
        };
        if let Err(err) = stored {
            tracing::warn!(table = %self.table, error = %err, "Query cache write failed");
        }
    }
}

#[async_trait]
impl DataAccess for DataAccessService {
    fn table(&self) -> &str {
        &self.table
    }

    async fn page_by_index(&self, query: IndexQuery) -> Result<PageResult<Item>> {
        if query.limit == Some(0) {
            return Ok(PageResult::empty());
        }

        let request = self.query_request(&query, Select::Items)?;
        let page = self.gateway.query(request).await?;

        Ok(PageResult {
            items: page.items,
            next_cursor: page.last_evaluated_key.as_ref().map(Cursor::encode),
        })
    }

    async fn scan_all(&self, query: ScanQuery) -> Result<PageResult<Item>> {
        if query.limit == Some(0) {
            return Ok(PageResult::empty());
        }

        let request = ScanRequest {
            table: self.table.clone(),
            index: query.index.clone(),
            projection: query.projection(),
            limit: query.limit,
            start_key: query.cursor.as_ref().map(Cursor::decode).transpose()?,
        };
        let page = self.gateway.scan(request).await?;

        Ok(PageResult {
            items: page.items,
            next_cursor: page.last_evaluated_key.as_ref().map(Cursor::encode),
        })
    }

    async fn count(&self, index: Option<&str>, key: KeyCondition) -> Result<usize> {
        let mut request = QueryRequest {
            table: self.table.clone(),
            index: index.map(str::to_string),
            key_condition: key,
            projection: Projection::all(),
            ascending: true,
            limit: None,
            start_key: None,
            select: Select::Count,
        };

        let mut count = 0;
        loop {
            let page = self.gateway.query(request.clone()).await?;
            count += page.count;
            match page.last_evaluated_key {
                Some(key) => request.start_key = Some(key),
                None => return Ok(count),
            }
        }
    }

    async fn get_by_id(&self, id: &str, fields: &[String]) -> Result<Option<Item>> {
        let item = self.gateway.get(self.get_op(id, fields)).await?;
        Ok(item)
    }

    async fn get_one(&self, query: IndexQuery) -> Result<Option<Item>> {
        let page = self.page_by_index(query.limit(1).cursor(None)).await?;
        Ok(page.items.into_iter().next())
    }

    async fn list_by_key(&self, query: IndexQuery) -> Result<Vec<Item>> {
        let limit = query.limit.map(|l| l as usize);
        if limit == Some(0) {
            return Ok(Vec::new());
        }

        let mut request = self.query_request(&query, Select::Items)?;
        let cache_key = query_key(&request).ok();
        if let Some(key) = &cache_key {
            if let Some(items) = self.cached(key).await {
                return Ok(items);
            }
        }

        let mut items = Vec::new();
        loop {
            if let Some(limit) = limit {
                request.limit = u32::try_from(limit - items.len()).ok();
            }
            let page = self.gateway.query(request.clone()).await?;
            items.extend(page.items);

            let full = limit.is_some_and(|l| items.len() >= l);
            match page.last_evaluated_key {
                Some(key) if !full => request.start_key = Some(key),
                _ => break,
            }
        }
        if let Some(limit) = limit {
            items.truncate(limit);
        }

        if let Some(key) = &cache_key {
            self.remember(key, &items).await;
        }
        Ok(items)
    }

    async fn list_by_ids(&self, ids: &[String], fields: &[String]) -> Result<Vec<Item>> {
        let mut seen = HashSet::new();
        let unique: Vec<&String> = ids.iter().filter(|id| seen.insert(*id)).collect();
        let projection = Projection::new(fields.iter().cloned());

        let mut items = Vec::with_capacity(unique.len());
        for chunk in unique.chunks(BATCH_GET_LIMIT) {
            let request = BatchGetRequest {
                table: self.table.clone(),
                keys: chunk.iter().map(|id| id_key(id)).collect(),
                projection: projection.clone(),
            };
            items.extend(self.gateway.batch_get(request).await?);
        }
        Ok(items)
    }

    async fn list_all(&self, index: Option<&str>, fields: &[String]) -> Result<Vec<Item>> {
        let mut request = ScanRequest {
            table: self.table.clone(),
            index: index.map(str::to_string),
            projection: Projection::new(fields.iter().cloned()),
            limit: None,
            start_key: None,
        };

        let mut items = Vec::new();
        loop {
            let page = self.gateway.scan(request.clone()).await?;
            items.extend(page.items);
            match page.last_evaluated_key {
                Some(key) => request.start_key = Some(key),
                None => return Ok(items),
            }
        }
    }

    async fn exists_by_id(&self, id: &str) -> Result<bool> {
        let item = self.get_by_id(id, &["id".to_string()]).await?;
        Ok(item.is_some())
    }

    async fn exists(&self, index: Option<&str>, key: KeyCondition) -> Result<bool> {
        Ok(self.count(index, key).await? > 0)
    }

    async fn create_item(
        &self,
        id: &str,
        model: Item,
        condition: Option<Condition>,
    ) -> Result<Item> {
        let item = Self::with_id(id, model);
        let request = PutRequest {
            table: self.table.clone(),
            item: item.clone(),
            condition: Some(Condition::guarded(Condition::not_exists("id"), condition)),
        };

        match self.gateway.put(request).await {
            Ok(()) => Ok(item),
            Err(GatewayError::ConditionalCheckFailed) => Err(DataError::AlreadyExists(id.to_string())),
            Err(err) => Err(err.into()),
        }
    }

    async fn put_item(&self, id: &str, model: Item) -> Result<Item> {
        let item = Self::with_id(id, model);
        let request = PutRequest {
            table: self.table.clone(),
            item: item.clone(),
            condition: None,
        };

        self.gateway.put(request).await?;
        Ok(item)
    }

    async fn update_item(
        &self,
        id: &str,
        model: Item,
        condition: Option<Condition>,
        extra: UpdatePlan,
    ) -> Result<Item> {
        let request = self.update_request(id, model, condition, extra);
        if request.update.is_empty() {
            return Err(GatewayError::InvalidRequest("update has no actions".to_string()).into());
        }

        match self.gateway.update(request).await {
            Ok(item) => Ok(item),
            Err(GatewayError::ConditionalCheckFailed) => {
                Err(DataError::ConditionFailed(id.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn delete_item(&self, id: &str, condition: Option<Condition>) -> Result<()> {
        let request = DeleteRequest {
            table: self.table.clone(),
            key: id_key(id),
            condition: Some(Condition::guarded(Condition::exists("id"), condition)),
        };

        match self.gateway.delete(request).await {
            Ok(()) => Ok(()),
            Err(GatewayError::ConditionalCheckFailed) => {
                Err(DataError::ConditionFailed(id.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn delete_by_ids(&self, ids: &[String]) -> Result<Vec<bool>> {
        let operations = ids.iter().map(|id| self.delete_op(id, None)).collect();
        self.transact_write(operations).await
    }

    async fn transact_write(&self, operations: Vec<WriteOp>) -> Result<Vec<bool>> {
        let total = operations.len();
        let mut outcomes = Vec::with_capacity(total);

        for (chunk_index, chunk) in chunked(operations, TRANSACT_WRITE_LIMIT)
            .into_iter()
            .enumerate()
        {
            let len = chunk.len();
            tracing::debug!(table = %self.table, chunk = chunk_index, items = len, "Writing transaction chunk");

            match self.gateway.transact_write(chunk).await {
                Ok(()) => outcomes.extend(std::iter::repeat_n(true, len)),
                Err(err) => {
                    let Some(reasons) = err.item_level_reasons() else {
                        return Err(err.into());
                    };
                    tracing::debug!(
                        table = %self.table,
                        chunk = chunk_index,
                        reasons = ?reasons,
                        "Transaction chunk canceled"
                    );
                    outcomes.extend(chunk_outcomes(reasons, len));
                    // Later chunks are not attempted.
                    outcomes.resize(total, false);
                    return Ok(outcomes);
                }
            }
        }

        Ok(outcomes)
    }

    async fn transact_read(&self, requests: Vec<GetRequest>) -> Result<Vec<Item>> {
        let chunks = chunked(requests, TRANSACT_GET_LIMIT);
        let results = try_join_all(
            chunks
                .into_iter()
                .map(|chunk| self.gateway.transact_get(chunk)),
        )
        .await?;

        Ok(results.into_iter().flatten().flatten().collect())
    }

    fn create_op(&self, id: &str, model: Item, condition: Option<Condition>) -> WriteOp {
        WriteOp::Put(PutRequest {
            table: self.table.clone(),
            item: Self::with_id(id, model),
            condition: Some(Condition::guarded(Condition::not_exists("id"), condition)),
        })
    }

    fn update_op(
        &self,
        id: &str,
        model: Item,
        condition: Option<Condition>,
        extra: UpdatePlan,
    ) -> WriteOp {
        WriteOp::Update(self.update_request(id, model, condition, extra))
    }

    fn delete_op(&self, id: &str, condition: Option<Condition>) -> WriteOp {
        WriteOp::Delete(DeleteRequest {
            table: self.table.clone(),
            key: id_key(id),
            condition: Some(Condition::guarded(Condition::exists("id"), condition)),
        })
    }

    fn get_op(&self, id: &str, fields: &[String]) -> GetRequest {
        GetRequest {
            table: self.table.clone(),
            key: id_key(id),
            projection: Projection::new(fields.iter().cloned()),
        }
    }
}
