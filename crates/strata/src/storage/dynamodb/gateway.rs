//! DynamoDB gateway implementation.
//!
//! Implements `strata_core::storage::StorageGateway` using DynamoDB.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_dynamodb::error::BuildError;
use aws_sdk_dynamodb::types::{
    Delete, Get, KeysAndAttributes, Put, ReturnValue, Select as DynamoSelect, TransactGetItem,
    TransactWriteItem, Update,
};
use aws_sdk_dynamodb::Client;

use strata_core::expression::ExpressionBuilder;
use strata_core::storage::{
    BatchGetRequest, DeleteRequest, GatewayError, GetRequest, Item, Page, PutRequest,
    QueryRequest, Result, ScanRequest, Select, StorageGateway, UpdateRequest, WriteOp,
};

use super::conversions::{
    from_attribute_map, names_map, to_attribute_map, values_map, AttributeMap,
};
use super::error::{
    map_batch_get_error, map_delete_item_error, map_get_item_error, map_put_item_error,
    map_query_error, map_scan_error, map_transact_get_error, map_transact_write_error,
    map_update_item_error,
};
use crate::config::StrataConfig;

/// Rounds of `UnprocessedKeys` retries before a batch read gives up.
const MAX_BATCH_RETRIES: u32 = 5;

fn invalid(err: BuildError) -> GatewayError {
    GatewayError::InvalidRequest(err.to_string())
}

fn items(raw: Option<Vec<AttributeMap>>) -> Result<Vec<Item>> {
    raw.unwrap_or_default()
        .iter()
        .map(from_attribute_map)
        .collect()
}

fn start_key(key: Option<&Item>) -> Option<AttributeMap> {
    key.map(to_attribute_map)
}

/// DynamoDB-based storage gateway.
///
/// The gateway is table-agnostic: every request names its table.
#[derive(Debug, Clone)]
pub struct DynamoDbGateway {
    client: Client,
}

impl DynamoDbGateway {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Creates a gateway from configuration, using the AWS SDK default
    /// credential chain.
    pub async fn from_config(config: &StrataConfig) -> Self {
        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(config.region.clone()));
        if let Some(url) = &config.endpoint_url {
            loader = loader.endpoint_url(url);
        }
        let sdk_config = loader.load().await;
        Self::new(Client::new(&sdk_config))
    }

    fn write_item(op: WriteOp) -> Result<TransactWriteItem> {
        let mut builder = ExpressionBuilder::new();
        let item = match op {
            WriteOp::Put(req) => {
                let condition = req.condition.as_ref().map(|c| builder.condition(c));
                let (names, values) = builder.into_parts();
                let put = Put::builder()
                    .table_name(req.table)
                    .set_item(Some(to_attribute_map(&req.item)))
                    .set_condition_expression(condition)
                    .set_expression_attribute_names(names_map(names))
                    .set_expression_attribute_values(values_map(values))
                    .build()
                    .map_err(invalid)?;
                TransactWriteItem::builder().put(put).build()
            }
            WriteOp::Update(req) => {
                let expression = builder.update(&req.update).ok_or_else(|| {
                    GatewayError::InvalidRequest("update has no actions".to_string())
                })?;
                let condition = req.condition.as_ref().map(|c| builder.condition(c));
                let (names, values) = builder.into_parts();
                let update = Update::builder()
                    .table_name(req.table)
                    .set_key(Some(to_attribute_map(&req.key)))
                    .update_expression(expression)
                    .set_condition_expression(condition)
                    .set_expression_attribute_names(names_map(names))
                    .set_expression_attribute_values(values_map(values))
                    .build()
                    .map_err(invalid)?;
                TransactWriteItem::builder().update(update).build()
            }
            WriteOp::Delete(req) => {
                let condition = req.condition.as_ref().map(|c| builder.condition(c));
                let (names, values) = builder.into_parts();
                let delete = Delete::builder()
                    .table_name(req.table)
                    .set_key(Some(to_attribute_map(&req.key)))
                    .set_condition_expression(condition)
                    .set_expression_attribute_names(names_map(names))
                    .set_expression_attribute_values(values_map(values))
                    .build()
                    .map_err(invalid)?;
                TransactWriteItem::builder().delete(delete).build()
            }
        };
        Ok(item)
    }

    fn get_item(request: GetRequest) -> Result<TransactGetItem> {
        let mut builder = ExpressionBuilder::new();
        let projection = builder.projection(&request.projection);
        let (names, _) = builder.into_parts();
        let get = Get::builder()
            .table_name(request.table)
            .set_key(Some(to_attribute_map(&request.key)))
            .set_projection_expression(projection)
            .set_expression_attribute_names(names_map(names))
            .build()
            .map_err(invalid)?;
        Ok(TransactGetItem::builder().get(get).build())
    }
}

#[async_trait]
impl StorageGateway for DynamoDbGateway {
    async fn get(&self, request: GetRequest) -> Result<Option<Item>> {
        let mut builder = ExpressionBuilder::new();
        let projection = builder.projection(&request.projection);
        let (names, _) = builder.into_parts();

        let result = self
            .client
            .get_item()
            .table_name(&request.table)
            .set_key(Some(to_attribute_map(&request.key)))
            .set_projection_expression(projection)
            .set_expression_attribute_names(names_map(names))
            .send()
            .await
            .map_err(map_get_item_error)?;

        result.item.as_ref().map(from_attribute_map).transpose()
    }

    async fn put(&self, request: PutRequest) -> Result<()> {
        let mut builder = ExpressionBuilder::new();
        let condition = request.condition.as_ref().map(|c| builder.condition(c));
        let (names, values) = builder.into_parts();

        self.client
            .put_item()
            .table_name(&request.table)
            .set_item(Some(to_attribute_map(&request.item)))
            .set_condition_expression(condition)
            .set_expression_attribute_names(names_map(names))
            .set_expression_attribute_values(values_map(values))
            .send()
            .await
            .map_err(map_put_item_error)?;

        Ok(())
    }

    async fn update(&self, request: UpdateRequest) -> Result<Item> {
        let mut builder = ExpressionBuilder::new();
        let expression = builder
            .update(&request.update)
            .ok_or_else(|| GatewayError::InvalidRequest("update has no actions".to_string()))?;
        let condition = request.condition.as_ref().map(|c| builder.condition(c));
        let (names, values) = builder.into_parts();

        let result = self
            .client
            .update_item()
            .table_name(&request.table)
            .set_key(Some(to_attribute_map(&request.key)))
            .update_expression(expression)
            .set_condition_expression(condition)
            .set_expression_attribute_names(names_map(names))
            .set_expression_attribute_values(values_map(values))
            .return_values(ReturnValue::AllNew)
            .send()
            .await
            .map_err(map_update_item_error)?;

        result
            .attributes
            .as_ref()
            .map(from_attribute_map)
            .transpose()
            .map(Option::unwrap_or_default)
    }

    async fn delete(&self, request: DeleteRequest) -> Result<()> {
        let mut builder = ExpressionBuilder::new();
        let condition = request.condition.as_ref().map(|c| builder.condition(c));
        let (names, values) = builder.into_parts();

        self.client
            .delete_item()
            .table_name(&request.table)
            .set_key(Some(to_attribute_map(&request.key)))
            .set_condition_expression(condition)
            .set_expression_attribute_names(names_map(names))
            .set_expression_attribute_values(values_map(values))
            .send()
            .await
            .map_err(map_delete_item_error)?;

        Ok(())
    }

    async fn query(&self, request: QueryRequest) -> Result<Page> {
        let mut builder = ExpressionBuilder::new();
        let projection = builder.projection(&request.projection);
        let key_condition = builder
            .key_condition(&request.key_condition)
            .map_err(|e| GatewayError::InvalidRequest(e.to_string()))?;
        let (names, values) = builder.into_parts();
        let select = match request.select {
            Select::Count => Some(DynamoSelect::Count),
            Select::Items => None,
        };

        let result = self
            .client
            .query()
            .table_name(&request.table)
            .set_index_name(request.index.clone())
            .key_condition_expression(key_condition)
            .set_projection_expression(projection)
            .set_expression_attribute_names(names_map(names))
            .set_expression_attribute_values(values_map(values))
            .scan_index_forward(request.ascending)
            .set_limit(request.limit.map(|l| l as i32))
            .set_exclusive_start_key(start_key(request.start_key.as_ref()))
            .set_select(select)
            .send()
            .await
            .map_err(map_query_error)?;

        Ok(Page {
            count: result.count.max(0) as usize,
            items: items(result.items)?,
            last_evaluated_key: result
                .last_evaluated_key
                .as_ref()
                .map(from_attribute_map)
                .transpose()?,
        })
    }

    async fn scan(&self, request: ScanRequest) -> Result<Page> {
        let mut builder = ExpressionBuilder::new();
        let projection = builder.projection(&request.projection);
        let (names, _) = builder.into_parts();

        let result = self
            .client
            .scan()
            .table_name(&request.table)
            .set_index_name(request.index.clone())
            .set_projection_expression(projection)
            .set_expression_attribute_names(names_map(names))
            .set_limit(request.limit.map(|l| l as i32))
            .set_exclusive_start_key(start_key(request.start_key.as_ref()))
            .send()
            .await
            .map_err(map_scan_error)?;

        Ok(Page {
            count: result.count.max(0) as usize,
            items: items(result.items)?,
            last_evaluated_key: result
                .last_evaluated_key
                .as_ref()
                .map(from_attribute_map)
                .transpose()?,
        })
    }

    async fn batch_get(&self, request: BatchGetRequest) -> Result<Vec<Item>> {
        if request.keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder = ExpressionBuilder::new();
        let projection = builder.projection(&request.projection);
        let (names, _) = builder.into_parts();
        let keys = KeysAndAttributes::builder()
            .set_keys(Some(request.keys.iter().map(to_attribute_map).collect()))
            .set_projection_expression(projection)
            .set_expression_attribute_names(names_map(names))
            .build()
            .map_err(invalid)?;

        let mut pending = HashMap::from([(request.table.clone(), keys)]);
        let mut found = Vec::new();
        let mut attempt = 0;
        loop {
            let result = self
                .client
                .batch_get_item()
                .set_request_items(Some(pending))
                .send()
                .await
                .map_err(map_batch_get_error)?;

            if let Some(mut responses) = result.responses {
                found.extend(items(responses.remove(&request.table))?);
            }

            match result.unprocessed_keys {
                Some(unprocessed) if !unprocessed.is_empty() => {
                    attempt += 1;
                    if attempt > MAX_BATCH_RETRIES {
                        return Err(GatewayError::Throttled(
                            "Batch read left unprocessed keys".to_string(),
                        ));
                    }
                    tracing::debug!(table = %request.table, attempt, "Retrying unprocessed keys");
                    tokio::time::sleep(Duration::from_millis(50 << attempt)).await;
                    pending = unprocessed;
                }
                _ => return Ok(found),
            }
        }
    }

    async fn transact_write(&self, operations: Vec<WriteOp>) -> Result<()> {
        let items = operations
            .into_iter()
            .map(Self::write_item)
            .collect::<Result<Vec<_>>>()?;

        self.client
            .transact_write_items()
            .set_transact_items(Some(items))
            .send()
            .await
            .map_err(map_transact_write_error)?;

        Ok(())
    }

    async fn transact_get(&self, requests: Vec<GetRequest>) -> Result<Vec<Option<Item>>> {
        let items = requests
            .into_iter()
            .map(Self::get_item)
            .collect::<Result<Vec<_>>>()?;

        let result = self
            .client
            .transact_get_items()
            .set_transact_items(Some(items))
            .send()
            .await
            .map_err(map_transact_get_error)?;

        result
            .responses
            .unwrap_or_default()
            .iter()
            .map(|response| response.item.as_ref().map(from_attribute_map).transpose())
            .collect()
    }
}
