use std::marker::PhantomData;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use strata_core::events::{CrudEvent, EventSink, NoopEventSink};
use strata_core::expression::{Condition, KeyCondition, UpdatePlan};
use strata_core::record::{stamp_new, stamp_update, CrudRecord, Status};
use strata_core::storage::{Item, WriteOp, TRANSACT_WRITE_LIMIT};
use strata_core::validation::{is_suppressed, relax_schema, NoopValidator, Validator};

use super::error::{CrudError, Result};
use super::transition::Transition;
use super::types::{PageQuery, StatusQuery};
use crate::data::{DataAccess, DataError, DataErrorKind, IndexQuery, PageResult, ScanQuery};

/// Index of every record of one owner.
const OWNER_INDEX: &str = "userId";

/// Owner-scoped records with a status lifecycle, on top of [`DataAccess`].
///
/// Every mutation is a single conditional write; the owner id and the prior
/// status are the only guards. Racy outcomes (stale owner, wrong status, a
/// vanished record) come back as `false` or `None`, while infrastructure
/// failures propagate.
pub struct CrudService<T> {
    data: Arc<dyn DataAccess>,
    validator: Arc<dyn Validator>,
    schema: Value,
    events: Arc<dyn EventSink>,
    record: PhantomData<fn() -> T>,
}

impl<T> std::fmt::Debug for CrudService<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrudService")
            .field("table", &self.data.table())
            .finish_non_exhaustive()
    }
}

impl<T> CrudService<T>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    pub fn new(data: Arc<dyn DataAccess>, schema: Value) -> Self {
        Self {
            data,
            validator: Arc::new(NoopValidator),
            schema,
            events: Arc::new(NoopEventSink),
            record: PhantomData,
        }
    }

    pub fn with_validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn data(&self) -> &dyn DataAccess {
        self.data.as_ref()
    }

    fn now() -> i64 {
        chrono::Utc::now().timestamp_millis()
    }

    fn to_item<M: Serialize>(model: &M) -> Result<Item> {
        match serde_json::to_value(model).map_err(DataError::from)? {
            Value::Object(item) => Ok(item),
            _ => Err(CrudError::DataEmpty),
        }
    }

    fn to_record(item: Item) -> Result<CrudRecord<T>> {
        Ok(serde_json::from_value(Value::Object(item)).map_err(DataError::from)?)
    }

    fn owner(item: &Item) -> Option<&str> {
        item.get("userId").and_then(Value::as_str)
    }

    async fn publish(&self, event: CrudEvent) {
        if let Err(err) = self.events.publish(self.data.table(), &event).await {
            tracing::warn!(table = %self.data.table(), error = %err, "Failed to publish event");
        }
    }

    /// Validates a model against the schema.
    ///
    /// `required = false` drops the schema's required list for partial
    /// models. `lenient` tolerates string length violations and numbers
    /// stored as strings in form date fields.
    pub fn validate(&self, model: &Value, required: bool, lenient: bool) -> Result<()> {
        match model {
            Value::Object(map) if !map.is_empty() => {}
            _ => return Err(CrudError::DataEmpty),
        }

        let schema = if required {
            self.schema.clone()
        } else {
            relax_schema(&self.schema)
        };
        self.validator
            .validate(model, &schema, &|violation| !is_suppressed(violation, lenient))?;
        Ok(())
    }

    /// Stamps a new record, then writes it only if `id` is free.
    pub async fn create(
        &self,
        id: &str,
        model: &CrudRecord<T>,
        user_id: Option<&str>,
    ) -> Result<CrudRecord<T>> {
        let item = Self::to_item(model)?;
        self.validate(&Value::Object(item.clone()), true, true)?;

        let item = stamp_new(item, user_id, Self::now())?;
        let stored = match self.data.create_item(id, item, None).await {
            Ok(stored) => stored,
            Err(err) if err.kind() == DataErrorKind::AlreadyExists => {
                tracing::debug!(table = %self.data.table(), id = %id, "Id already exists");
                return Err(CrudError::IdExists(id.to_string()));
            }
            Err(err) => return Err(err.into()),
        };

        self.publish(CrudEvent::Created {
            id: id.to_string(),
            user_id: user_id.map(str::to_string),
        })
        .await;
        Self::to_record(stored)
    }

    /// Stamps a new record and overwrites whatever is stored under `id`.
    pub async fn put_by_id(
        &self,
        id: &str,
        model: &CrudRecord<T>,
        user_id: Option<&str>,
    ) -> Result<CrudRecord<T>> {
        let item = Self::to_item(model)?;
        self.validate(&Value::Object(item.clone()), true, true)?;

        let item = stamp_new(item, user_id, Self::now())?;
        let stored = self.data.put_item(id, item).await?;

        self.publish(CrudEvent::Created {
            id: id.to_string(),
            user_id: user_id.map(str::to_string),
        })
        .await;
        Self::to_record(stored)
    }

    /// Reads a record of `user_id`.
    ///
    /// Returns `None` when absent and `Forbidden` when another owner holds
    /// it. With a non-empty `fields`, the record only carries those fields
    /// (plus `userId`), so `T` must tolerate the missing ones.
    pub async fn get_by_id(
        &self,
        id: &str,
        fields: &[String],
        user_id: &str,
    ) -> Result<Option<CrudRecord<T>>> {
        let mut fields = fields.to_vec();
        if !fields.is_empty() && !fields.iter().any(|f| f == "userId") {
            fields.push("userId".to_string());
        }

        let Some(item) = self.data.get_by_id(id, &fields).await? else {
            return Ok(None);
        };
        if Self::owner(&item) != Some(user_id) {
            return Err(CrudError::Forbidden);
        }
        Self::to_record(item).map(Some)
    }

    pub async fn exists_by_id(&self, id: &str, user_id: &str) -> Result<bool> {
        let Some(item) = self.data.get_by_id(id, &["userId".to_string()]).await? else {
            return Ok(false);
        };
        if Self::owner(&item) != Some(user_id) {
            return Err(CrudError::Forbidden);
        }
        Ok(true)
    }

    /// Updates an existing record from a partial model and bumps `ver` by
    /// `inc`.
    ///
    /// Fields absent from the model are untouched, `null` or empty arrays
    /// remove them. Ownership, status and version fields in the model are
    /// ignored. Returns `None` when the record is gone.
    pub async fn upd_by_id<M>(
        &self,
        id: &str,
        model: &M,
        user_id: &str,
        inc: u64,
    ) -> Result<Option<CrudRecord<T>>>
    where
        M: Serialize + Sync,
    {
        let item = Self::to_item(model)?;
        self.validate(&Value::Object(item.clone()), true, false)?;

        let item = stamp_update(item, Some(user_id), Self::now());
        let extra = UpdatePlan::new().increment("ver", inc);
        match self.data.update_item(id, item, None, extra).await {
            Ok(stored) => {
                self.publish(CrudEvent::Updated {
                    id: id.to_string(),
                    user_id: Some(user_id.to_string()),
                })
                .await;
                Self::to_record(stored).map(Some)
            }
            Err(err) if err.is_condition_failed() => {
                tracing::debug!(table = %self.data.table(), id = %id, "Update skipped, record is gone");
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Updates a record owned by `user_id` from a partial model, validated
    /// without the required list.
    pub async fn set_by_id<M>(&self, id: &str, model: &M, user_id: &str, inc: u64) -> Result<bool>
    where
        M: Serialize + Sync,
    {
        let item = Self::to_item(model)?;
        self.validate(&Value::Object(item.clone()), false, true)?;

        let item = stamp_update(item, Some(user_id), Self::now());
        let condition = Condition::eq("userId", user_id);
        let extra = UpdatePlan::new().increment("ver", inc);
        match self.data.update_item(id, item, Some(condition), extra).await {
            Ok(_) => {
                self.publish(CrudEvent::Updated {
                    id: id.to_string(),
                    user_id: Some(user_id.to_string()),
                })
                .await;
                Ok(true)
            }
            Err(err) if err.is_condition_failed() => {
                tracing::debug!(table = %self.data.table(), id = %id, user_id = %user_id, "Set rejected");
                Ok(false)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Removes a record owned by `user_id`.
    pub async fn del_by_id(&self, id: &str, user_id: &str) -> Result<bool> {
        let condition = Condition::eq("userId", user_id);
        match self.data.delete_item(id, Some(condition)).await {
            Ok(()) => {
                self.publish(CrudEvent::Deleted {
                    id: id.to_string(),
                    user_id: user_id.to_string(),
                })
                .await;
                Ok(true)
            }
            Err(err) if err.is_condition_failed() => {
                tracing::debug!(table = %self.data.table(), id = %id, user_id = %user_id, "Delete rejected");
                Ok(false)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Applies a status transition to a record owned by `user_id`.
    ///
    /// `false` when the record is absent, owned by someone else, or not in
    /// a source status of the transition.
    pub async fn transition(
        &self,
        id: &str,
        user_id: &str,
        transition: Transition,
        reason: Option<&str>,
    ) -> Result<bool> {
        let plan = transition.plan(Self::now(), reason);
        let condition = transition.condition(user_id);

        match self.data.update_item(id, Item::new(), Some(condition), plan).await {
            Ok(_) => {
                self.publish(CrudEvent::StatusChanged {
                    id: id.to_string(),
                    user_id: user_id.to_string(),
                    status: transition.target(),
                })
                .await;
                Ok(true)
            }
            Err(err) if err.is_condition_failed() => {
                tracing::debug!(
                    table = %self.data.table(),
                    id = %id,
                    transition = ?transition,
                    "Transition rejected"
                );
                Ok(false)
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn block_by_id(&self, id: &str, reason: Option<&str>, user_id: &str) -> Result<bool> {
        self.transition(id, user_id, Transition::Block, reason).await
    }

    pub async fn unblock_by_id(&self, id: &str, user_id: &str) -> Result<bool> {
        self.transition(id, user_id, Transition::Unblock, None).await
    }

    pub async fn disable_by_id(&self, id: &str, user_id: &str) -> Result<bool> {
        self.transition(id, user_id, Transition::Disable, None).await
    }

    pub async fn enable_by_id(&self, id: &str, user_id: &str) -> Result<bool> {
        self.transition(id, user_id, Transition::Enable, None).await
    }

    /// Soft delete.
    pub async fn archive_by_id(&self, id: &str, user_id: &str) -> Result<bool> {
        self.transition(id, user_id, Transition::Archive, None).await
    }

    pub async fn restore_by_id(&self, id: &str, user_id: &str) -> Result<bool> {
        self.transition(id, user_id, Transition::Restore, None).await
    }

    /// Copies an enabled record to `new_id`, then archives the old one.
    ///
    /// The two writes are separate; a failure in between leaves both ids
    /// populated.
    pub async fn move_by_id(
        &self,
        new_id: &str,
        old_id: &str,
        user_id: &str,
    ) -> Result<CrudRecord<T>> {
        let current = match self.data.get_by_id(old_id, &[]).await? {
            Some(item) if Self::owner(&item) == Some(user_id) => item,
            _ => return Err(CrudError::Forbidden),
        };
        let status = current.get("status").and_then(Value::as_u64);
        if status != Some(u64::from(Status::Enabled.code())) {
            return Err(CrudError::EnabledRequired);
        }

        let stored = match self.data.create_item(new_id, current, None).await {
            Ok(stored) => stored,
            Err(err) if err.kind() == DataErrorKind::AlreadyExists => {
                return Err(CrudError::IdExists(new_id.to_string()));
            }
            Err(err) => return Err(err.into()),
        };

        if !self.archive_by_id(old_id, user_id).await? {
            tracing::warn!(table = %self.data.table(), id = %old_id, "Moved record was not archived");
        }

        self.publish(CrudEvent::Moved {
            from: old_id.to_string(),
            to: new_id.to_string(),
            user_id: user_id.to_string(),
        })
        .await;
        Self::to_record(stored)
    }

    fn by_status(&self, user_id: Option<&str>, query: &StatusQuery) -> Result<IndexQuery> {
        let index = match user_id {
            Some(user_id) => IndexQuery::new(query.owner_index()?).key("userId", user_id),
            None => IndexQuery::new(query.status_index()?).key("status", query.status),
        };
        Ok(index
            .sort(query.sort()?)
            .ascending(query.ascending)
            .with_limit(query.limit)
            .cursor(query.cursor.clone())
            .fields(query.fields.iter().cloned()))
    }

    fn records(items: Vec<Item>) -> Result<Vec<CrudRecord<T>>> {
        items.into_iter().map(Self::to_record).collect()
    }

    /// One page of an owner's records in a status, ordered by the status
    /// timestamp.
    pub async fn page_by_status(
        &self,
        user_id: &str,
        query: &StatusQuery,
    ) -> Result<PageResult<CrudRecord<T>>> {
        let page = self
            .data
            .page_by_index(self.by_status(Some(user_id), query)?)
            .await?;
        page.try_map(Self::to_record)
    }

    pub async fn count_by_status(&self, user_id: &str, query: &StatusQuery) -> Result<usize> {
        let key = KeyCondition::new()
            .key("userId", user_id)
            .sort(query.sort()?);
        Ok(self.data.count(Some(query.owner_index()?.as_str()), key).await?)
    }

    pub async fn list_by_status(
        &self,
        user_id: &str,
        query: &StatusQuery,
    ) -> Result<Vec<CrudRecord<T>>> {
        let items = self
            .data
            .list_by_key(self.by_status(Some(user_id), query)?)
            .await?;
        Self::records(items)
    }

    /// Like [`Self::page_by_status`] across every owner.
    pub async fn page_all_by_status(
        &self,
        query: &StatusQuery,
    ) -> Result<PageResult<CrudRecord<T>>> {
        let page = self.data.page_by_index(self.by_status(None, query)?).await?;
        page.try_map(Self::to_record)
    }

    pub async fn list_all_by_status(&self, query: &StatusQuery) -> Result<Vec<CrudRecord<T>>> {
        let items = self.data.list_by_key(self.by_status(None, query)?).await?;
        Self::records(items)
    }

    /// One page of an owner's records, whatever their status.
    pub async fn page(&self, user_id: &str, query: &PageQuery) -> Result<PageResult<CrudRecord<T>>> {
        let index = IndexQuery::new(OWNER_INDEX)
            .key("userId", user_id)
            .ascending(query.ascending)
            .with_limit(query.limit)
            .cursor(query.cursor.clone())
            .fields(query.fields.iter().cloned());
        let page = self.data.page_by_index(index).await?;
        page.try_map(Self::to_record)
    }

    pub async fn count(&self, user_id: &str) -> Result<usize> {
        let key = KeyCondition::new().key("userId", user_id);
        Ok(self.data.count(Some(OWNER_INDEX), key).await?)
    }

    pub async fn list(&self, user_id: &str, fields: &[String]) -> Result<Vec<CrudRecord<T>>> {
        let index = IndexQuery::new(OWNER_INDEX)
            .key("userId", user_id)
            .fields(fields.iter().cloned());
        Self::records(self.data.list_by_key(index).await?)
    }

    /// One page of a table scan; `ascending` does not apply.
    pub async fn page_all(&self, query: &PageQuery) -> Result<PageResult<CrudRecord<T>>> {
        let scan = ScanQuery {
            index: None,
            limit: query.limit,
            cursor: query.cursor.clone(),
            fields: query.fields.clone(),
        };
        let page = self.data.page_all(scan).await?;
        page.try_map(Self::to_record)
    }

    pub async fn list_all(&self, fields: &[String]) -> Result<Vec<CrudRecord<T>>> {
        Self::records(self.data.list_all(None, fields).await?)
    }

    pub async fn list_by_ids(&self, ids: &[String], fields: &[String]) -> Result<Vec<CrudRecord<T>>> {
        Self::records(self.data.list_by_ids(ids, fields).await?)
    }

    /// Creates many records transactionally, one conditional create each.
    ///
    /// Returns one outcome per item, in input order. `BatchCreated` names
    /// only the ids of committed chunks.
    pub async fn create_by_batch(
        &self,
        items: Vec<(String, CrudRecord<T>)>,
        user_id: Option<&str>,
    ) -> Result<Vec<bool>> {
        let now = Self::now();
        let mut ids = Vec::with_capacity(items.len());
        let mut operations = Vec::with_capacity(items.len());
        for (id, model) in items {
            let item = stamp_new(Self::to_item(&model)?, user_id, now)?;
            operations.push(self.data.create_op(&id, item, None));
            ids.push(id);
        }

        tracing::debug!(table = %self.data.table(), items = ids.len(), "Creating batch");
        let outcomes = self.data.transact_write(operations).await?;

        // A canceled chunk reports `true` for its untouched items although
        // nothing in it was written; only fully successful chunks committed.
        let created: Vec<String> = ids
            .chunks(TRANSACT_WRITE_LIMIT)
            .zip(outcomes.chunks(TRANSACT_WRITE_LIMIT))
            .filter(|(_, chunk)| chunk.iter().all(|ok| *ok))
            .flat_map(|(ids, _)| ids.iter().cloned())
            .collect();
        if !created.is_empty() {
            self.publish(CrudEvent::BatchCreated {
                ids: created,
                user_id: user_id.map(str::to_string),
            })
            .await;
        }
        Ok(outcomes)
    }

    /// A stamped update for a later [`DataAccess::transact_write`].
    pub fn update_op<M: Serialize>(
        &self,
        id: &str,
        model: &M,
        user_id: Option<&str>,
        condition: Option<Condition>,
    ) -> Result<WriteOp> {
        let item = stamp_update(Self::to_item(model)?, user_id, Self::now());
        Ok(self.data.update_op(id, item, condition, UpdatePlan::new()))
    }

    /// Base64 of `value` without padding, for derived identifiers.
    pub fn encode_id(value: &str) -> String {
        STANDARD_NO_PAD.encode(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DataAccessService;
    use crate::events::MemoryEventBus;
    use crate::storage::InMemoryGateway;
    use serde::Deserialize;
    use serde_json::json;
    use strata_core::storage::GatewayError;
    use strata_core::validation::{SchemaViolation, ViolationKind};

    const TABLE: &str = "app.notes";

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Note {
        #[serde(default)]
        title: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tag: Option<String>,
    }

    /// Requires `title` when the schema lists it, and caps it at 8 chars.
    struct TitleValidator;

    impl Validator for TitleValidator {
        fn validate(
            &self,
            json: &Value,
            schema: &Value,
            on_error: &dyn Fn(&SchemaViolation) -> bool,
        ) -> std::result::Result<(), SchemaViolation> {
            let required = schema
                .get("required")
                .and_then(Value::as_array)
                .is_some_and(|r| r.contains(&json!("title")));
            let title = json.get("title").and_then(Value::as_str);

            let violation = match title {
                None if required => Some(SchemaViolation::new(
                    "title",
                    ViolationKind::Required,
                    "is required",
                )),
                Some(title) if title.len() > 8 => Some(SchemaViolation::new(
                    "title",
                    ViolationKind::MaxLength,
                    "must be at most 8 characters",
                )),
                _ => None,
            };
            match violation {
                Some(violation) if on_error(&violation) => Err(violation),
                _ => Ok(()),
            }
        }
    }

    fn note(title: &str) -> CrudRecord<Note> {
        CrudRecord::new(Note {
            title: title.to_string(),
            tag: None,
        })
    }

    fn crud(gateway: &InMemoryGateway) -> CrudService<Note> {
        let data = DataAccessService::new(Arc::new(gateway.clone()), TABLE);
        CrudService::new(Arc::new(data), json!({"type": "object", "required": ["title"]}))
            .with_validator(Arc::new(TitleValidator))
    }

    async fn stored(gateway: &InMemoryGateway, id: &str) -> Item {
        gateway.item(TABLE, id).await.unwrap()
    }

    async fn seed(gateway: &InMemoryGateway, id: &str, user_id: &str, status: Status) {
        let mut item = json!({"id": id, "userId": user_id, "title": id, "ver": 0, "status": status.code()})
            .as_object()
            .cloned()
            .unwrap();
        item.insert(status.key().unwrap().to_string(), json!(100));
        gateway.insert(TABLE, item).await.unwrap();
    }

    #[tokio::test]
    async fn test_create_defaults_to_draft() {
        let gateway = InMemoryGateway::new();
        let crud = crud(&gateway);

        let mut model = note("hello");
        model.enable = Some(5);
        model.block = Some(6);
        model.update = Some(7);
        let record = crud.create("n1", &model, Some("u1")).await.unwrap();

        assert_eq!(record.id.as_deref(), Some("n1"));
        assert_eq!(record.status, Some(Status::Draft));
        assert!(record.draft.is_some());
        assert_eq!(record.lifecycle_count(), 1);
        assert_eq!(record.update, None);
        assert_eq!(record.ver, Some(0));
        assert_eq!(record.user_id.as_deref(), Some("u1"));
        assert_eq!(record.create_by.as_deref(), Some("u1"));
        assert_eq!(record.data.title, "hello");
        assert_eq!(stored(&gateway, "n1").await["status"], json!(1));
    }

    #[tokio::test]
    async fn test_create_honors_supplied_status() {
        let gateway = InMemoryGateway::new();
        let crud = crud(&gateway);

        let model = note("hello").with_status(Status::Enabled).with_create(42);
        let record = crud.create("n1", &model, Some("u1")).await.unwrap();

        assert_eq!(record.status, Some(Status::Enabled));
        assert_eq!(record.enable, Some(42));
        assert_eq!(record.create, Some(42));
        assert_eq!(record.lifecycle_count(), 1);
    }

    #[tokio::test]
    async fn test_create_rejects_taken_id() {
        let gateway = InMemoryGateway::new();
        let crud = crud(&gateway);
        crud.create("n1", &note("first"), Some("u1")).await.unwrap();

        let err = crud.create("n1", &note("second"), Some("u2")).await.unwrap_err();

        assert_eq!(err, CrudError::IdExists("n1".to_string()));
        assert_eq!(stored(&gateway, "n1").await["title"], json!("first"));
    }

    #[tokio::test]
    async fn test_create_rejects_error_status() {
        let gateway = InMemoryGateway::new();
        let crud = crud(&gateway);

        let err = crud
            .create("n1", &note("a").with_status(Status::Error), None)
            .await
            .unwrap_err();

        assert_eq!(err.code(), "STATUS_INVALID");
        assert_eq!(gateway.len(TABLE).await, 0);
    }

    #[tokio::test]
    async fn test_create_tolerates_long_strings() {
        let gateway = InMemoryGateway::new();
        let crud = crud(&gateway);

        let record = crud
            .create("n1", &note("a rather long title"), Some("u1"))
            .await
            .unwrap();

        assert_eq!(record.data.title, "a rather long title");
    }

    #[tokio::test]
    async fn test_upd_by_id_rejects_long_strings() {
        let gateway = InMemoryGateway::new();
        let crud = crud(&gateway);
        crud.create("n1", &note("hello"), Some("u1")).await.unwrap();

        let err = crud
            .upd_by_id("n1", &json!({"title": "a rather long title"}), "u1", 1)
            .await
            .unwrap_err();

        assert_eq!(
            err,
            CrudError::Schema {
                field: "title".to_string(),
                message: "must be at most 8 characters".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_put_by_id_overwrites() {
        let gateway = InMemoryGateway::new();
        let crud = crud(&gateway);
        crud.create("n1", &note("first"), Some("u1")).await.unwrap();

        let record = crud.put_by_id("n1", &note("second"), Some("u1")).await.unwrap();

        assert_eq!(record.data.title, "second");
        assert_eq!(stored(&gateway, "n1").await["title"], json!("second"));
    }

    #[tokio::test]
    async fn test_put_by_id_tolerates_long_strings() {
        let gateway = InMemoryGateway::new();
        let crud = crud(&gateway);
        let long = note("a very long title");

        assert!(crud.create("n1", &long, Some("u1")).await.is_ok());
        let record = crud.put_by_id("n2", &long, Some("u1")).await.unwrap();

        assert_eq!(record.data.title, "a very long title");
        assert_eq!(stored(&gateway, "n2").await["title"], json!("a very long title"));
    }

    #[tokio::test]
    async fn test_validate_rejects_empty_models() {
        let gateway = InMemoryGateway::new();
        let crud = crud(&gateway);

        assert_eq!(crud.validate(&json!({}), false, false), Err(CrudError::DataEmpty));
        assert_eq!(crud.validate(&json!(null), false, false), Err(CrudError::DataEmpty));
        assert_eq!(
            crud.validate(&json!({"tag": "x"}), true, false).unwrap_err().code(),
            "SCHEMA_ERROR"
        );
        assert!(crud.validate(&json!({"tag": "x"}), false, false).is_ok());
    }

    #[tokio::test]
    async fn test_get_by_id_separates_forbidden_from_absent() {
        let gateway = InMemoryGateway::new();
        let crud = crud(&gateway);
        crud.create("n1", &note("hello"), Some("u1")).await.unwrap();

        assert!(crud.get_by_id("missing", &[], "u1").await.unwrap().is_none());
        assert_eq!(
            crud.get_by_id("n1", &[], "u2").await.unwrap_err(),
            CrudError::Forbidden
        );
        assert_eq!(crud.exists_by_id("n1", "u2").await, Err(CrudError::Forbidden));
        assert!(crud.exists_by_id("n1", "u1").await.unwrap());
        assert!(!crud.exists_by_id("missing", "u1").await.unwrap());

        let first = crud.get_by_id("n1", &[], "u1").await.unwrap();
        let second = crud.get_by_id("n1", &[], "u1").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_get_by_id_projects_owner_too() {
        let gateway = InMemoryGateway::new();
        let crud = crud(&gateway);
        crud.create("n1", &note("hello"), Some("u1")).await.unwrap();

        let record = crud
            .get_by_id("n1", &["title".to_string()], "u1")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(record.data.title, "hello");
        assert_eq!(record.user_id.as_deref(), Some("u1"));
        assert_eq!(record.status, None);
    }

    #[tokio::test]
    async fn test_every_transition_from_every_status() {
        let statuses = [
            Status::Draft,
            Status::Enabled,
            Status::Disabled,
            Status::Deleted,
            Status::Blocked,
        ];

        for transition in Transition::ALL {
            for status in statuses {
                let gateway = InMemoryGateway::new();
                let crud = crud(&gateway);
                seed(&gateway, "n1", "u1", status).await;
                let before = stored(&gateway, "n1").await;

                let changed = crud.transition("n1", "u1", transition, None).await.unwrap();
                let after = stored(&gateway, "n1").await;

                assert_eq!(changed, transition.allows(status), "{transition:?} from {status:?}");
                if changed {
                    let record: CrudRecord<Note> =
                        serde_json::from_value(Value::Object(after)).unwrap();
                    assert_eq!(record.status, Some(transition.target()));
                    assert_eq!(record.lifecycle_count(), 1);
                    assert!(record.lifecycle(transition.target()).is_some());
                    assert_eq!(record.ver, Some(1));
                } else {
                    assert_eq!(after, before);
                }
            }
        }
    }

    #[tokio::test]
    async fn test_transition_requires_owner() {
        let gateway = InMemoryGateway::new();
        let crud = crud(&gateway);
        seed(&gateway, "n1", "u1", Status::Enabled).await;
        let before = stored(&gateway, "n1").await;

        assert!(!crud.disable_by_id("n1", "u2").await.unwrap());
        assert!(!crud.disable_by_id("missing", "u1").await.unwrap());
        assert_eq!(stored(&gateway, "n1").await, before);
    }

    #[tokio::test]
    async fn test_block_reason_round_trip() {
        let gateway = InMemoryGateway::new();
        let crud = crud(&gateway);
        seed(&gateway, "n1", "u1", Status::Enabled).await;

        assert!(crud.block_by_id("n1", Some("spam"), "u1").await.unwrap());
        assert_eq!(stored(&gateway, "n1").await["statusReason"], json!("spam"));
        assert!(!crud.block_by_id("n1", None, "u1").await.unwrap());

        assert!(crud.unblock_by_id("n1", "u1").await.unwrap());
        let item = stored(&gateway, "n1").await;
        assert!(!item.contains_key("statusReason"));
        assert_eq!(item["status"], json!(2));
    }

    #[tokio::test]
    async fn test_lifecycle_walk() {
        let gateway = InMemoryGateway::new();
        let crud = crud(&gateway);
        crud.create("n1", &note("hello"), Some("u1")).await.unwrap();

        assert!(crud.enable_by_id("n1", "u1").await.unwrap());
        assert!(crud.disable_by_id("n1", "u1").await.unwrap());
        assert!(crud.archive_by_id("n1", "u1").await.unwrap());
        assert!(!crud.enable_by_id("n1", "u1").await.unwrap());
        assert!(crud.restore_by_id("n1", "u1").await.unwrap());

        let record = crud.get_by_id("n1", &[], "u1").await.unwrap().unwrap();
        assert_eq!(record.status, Some(Status::Draft));
        assert_eq!(record.lifecycle_count(), 1);
        assert_eq!(record.ver, Some(4));
    }

    #[tokio::test]
    async fn test_upd_by_id_tri_state() {
        let gateway = InMemoryGateway::new();
        let crud = crud(&gateway);
        let mut model = note("hello");
        model.data.tag = Some("red".to_string());
        model.log = Some("created".to_string());
        crud.create("n1", &model, Some("u1")).await.unwrap();

        let patch = json!({"title": "renamed", "tag": null, "status": 2, "userId": "u9"});
        let record = crud.upd_by_id("n1", &patch, "u1", 1).await.unwrap().unwrap();

        assert_eq!(record.data.title, "renamed");
        assert_eq!(record.data.tag, None);
        assert_eq!(record.log.as_deref(), Some("created"));
        assert_eq!(record.status, Some(Status::Draft));
        assert_eq!(record.user_id.as_deref(), Some("u1"));
        assert_eq!(record.update_by.as_deref(), Some("u1"));
        assert!(record.update.is_some());
        assert_eq!(record.ver, Some(1));
        assert!(!stored(&gateway, "n1").await.contains_key("tag"));
    }

    #[tokio::test]
    async fn test_upd_by_id_missing_record_is_none() {
        let gateway = InMemoryGateway::new();
        let crud = crud(&gateway);

        let result = crud.upd_by_id("missing", &json!({"title": "a"}), "u1", 1).await;

        assert_eq!(result, Ok(None));
    }

    #[tokio::test]
    async fn test_upd_by_id_propagates_backend_errors() {
        let gateway = InMemoryGateway::new();
        let crud = crud(&gateway);
        crud.create("n1", &note("hello"), Some("u1")).await.unwrap();
        gateway
            .fail_next(GatewayError::Backend("boom".to_string()))
            .await;

        let err = crud
            .upd_by_id("n1", &json!({"title": "a"}), "u1", 1)
            .await
            .unwrap_err();

        match err {
            CrudError::Data(err) => assert_eq!(err.kind(), DataErrorKind::Fatal),
            other => panic!("expected a data error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_set_by_id_is_owner_gated() {
        let gateway = InMemoryGateway::new();
        let crud = crud(&gateway);
        crud.create("n1", &note("hello"), Some("u1")).await.unwrap();

        assert!(!crud.set_by_id("n1", &json!({"tag": "x"}), "u2", 1).await.unwrap());
        assert!(crud.set_by_id("n1", &json!({"tag": "x"}), "u1", 2).await.unwrap());

        let item = stored(&gateway, "n1").await;
        assert_eq!(item["tag"], json!("x"));
        assert_eq!(item["ver"], json!(2));
    }

    #[tokio::test]
    async fn test_del_by_id_is_owner_gated() {
        let gateway = InMemoryGateway::new();
        let crud = crud(&gateway);
        crud.create("n1", &note("hello"), Some("u1")).await.unwrap();

        assert!(!crud.del_by_id("n1", "u2").await.unwrap());
        assert!(crud.del_by_id("n1", "u1").await.unwrap());
        assert!(!crud.del_by_id("n1", "u1").await.unwrap());
        assert_eq!(gateway.len(TABLE).await, 0);
    }

    #[tokio::test]
    async fn test_move_by_id() {
        let gateway = InMemoryGateway::new();
        let crud = crud(&gateway);
        seed(&gateway, "old", "u1", Status::Enabled).await;

        let moved = crud.move_by_id("new", "old", "u1").await.unwrap();

        assert_eq!(moved.id.as_deref(), Some("new"));
        assert_eq!(moved.status, Some(Status::Enabled));
        assert_eq!(stored(&gateway, "new").await["title"], json!("old"));
        assert_eq!(stored(&gateway, "old").await["status"], json!(4));
    }

    #[tokio::test]
    async fn test_move_by_id_failures() {
        let gateway = InMemoryGateway::new();
        let crud = crud(&gateway);
        seed(&gateway, "draft", "u1", Status::Draft).await;
        seed(&gateway, "enabled", "u1", Status::Enabled).await;
        seed(&gateway, "taken", "u2", Status::Enabled).await;

        assert_eq!(
            crud.move_by_id("x", "missing", "u1").await.unwrap_err(),
            CrudError::Forbidden
        );
        assert_eq!(
            crud.move_by_id("x", "taken", "u1").await.unwrap_err(),
            CrudError::Forbidden
        );
        assert_eq!(
            crud.move_by_id("x", "draft", "u1").await.unwrap_err(),
            CrudError::EnabledRequired
        );
        assert_eq!(
            crud.move_by_id("taken", "enabled", "u1").await.unwrap_err(),
            CrudError::IdExists("taken".to_string())
        );
        assert_eq!(stored(&gateway, "enabled").await["status"], json!(2));
    }

    #[tokio::test]
    async fn test_create_by_batch_reports_per_item() {
        let gateway = InMemoryGateway::new();
        let crud = crud(&gateway);

        let outcomes = crud
            .create_by_batch(
                vec![("a".to_string(), note("a")), ("b".to_string(), note("b"))],
                Some("u1"),
            )
            .await
            .unwrap();
        assert_eq!(outcomes, vec![true, true]);
        assert_eq!(stored(&gateway, "b").await["status"], json!(1));

        let outcomes = crud
            .create_by_batch(
                vec![
                    ("c".to_string(), note("c")),
                    ("a".to_string(), note("a")),
                    ("d".to_string(), note("d")),
                ],
                Some("u1"),
            )
            .await
            .unwrap();
        assert_eq!(outcomes, vec![true, false, true]);
    }

    #[tokio::test]
    async fn test_batch_event_names_committed_chunks_only() {
        let gateway = InMemoryGateway::new();
        let bus = MemoryEventBus::new();
        let crud = crud(&gateway).with_events(Arc::new(bus.clone()));
        let ids: Vec<String> = (0..30).map(|_| uuid::Uuid::new_v4().to_string()).collect();
        crud.create(&ids[27], &note("taken"), Some("u1")).await.unwrap();
        let mut events = bus.subscribe(TABLE).await;

        let items = ids.iter().map(|id| (id.clone(), note("n"))).collect();
        let outcomes = crud.create_by_batch(items, Some("u1")).await.unwrap();

        assert!(outcomes[..27].iter().all(|ok| *ok));
        assert!(!outcomes[27]);
        assert!(outcomes[28..].iter().all(|ok| *ok));
        assert!(gateway.item(TABLE, &ids[26]).await.is_none());
        assert_eq!(
            events.recv().await.unwrap(),
            CrudEvent::BatchCreated {
                ids: ids[..25].to_vec(),
                user_id: Some("u1".to_string())
            }
        );
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_create_by_batch_spans_chunks() {
        let gateway = InMemoryGateway::new();
        let crud = crud(&gateway);
        let items: Vec<_> = (0..30)
            .map(|i| (uuid::Uuid::new_v4().to_string(), note(&format!("n{i}"))))
            .collect();

        let outcomes = crud.create_by_batch(items, Some("u1")).await.unwrap();

        assert_eq!(outcomes, vec![true; 30]);
        assert_eq!(gateway.len(TABLE).await, 30);
        assert_eq!(crud.count("u1").await.unwrap(), 30);
    }

    #[tokio::test]
    async fn test_status_queries() {
        let gateway = InMemoryGateway::new();
        let crud = crud(&gateway);
        seed(&gateway, "a", "u1", Status::Enabled).await;
        seed(&gateway, "b", "u1", Status::Enabled).await;
        seed(&gateway, "c", "u1", Status::Draft).await;
        seed(&gateway, "d", "u2", Status::Enabled).await;

        let enabled = StatusQuery::default().ascending(true);
        let page = crud.page_by_status("u1", &enabled.clone().limit(1)).await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert!(page.next_cursor.is_some());

        let owned = crud.list_by_status("u1", &enabled).await.unwrap();
        let ids: Vec<_> = owned.iter().filter_map(|r| r.id.clone()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(crud.count_by_status("u1", &enabled).await.unwrap(), 2);
        assert_eq!(
            crud.count_by_status("u1", &StatusQuery::new(Status::Draft)).await.unwrap(),
            1
        );

        let all = crud.list_all_by_status(&enabled).await.unwrap();
        assert_eq!(all.len(), 3);
        let page = crud.page_all_by_status(&enabled).await.unwrap();
        assert_eq!(page.items.len(), 3);
        assert!(page.next_cursor.is_none());

        let out_of_range = StatusQuery::default().from(200);
        assert_eq!(crud.count_by_status("u1", &out_of_range).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_owner_queries() {
        let gateway = InMemoryGateway::new();
        let crud = crud(&gateway);
        seed(&gateway, "a", "u1", Status::Enabled).await;
        seed(&gateway, "b", "u1", Status::Draft).await;
        seed(&gateway, "c", "u2", Status::Enabled).await;

        assert_eq!(crud.count("u1").await.unwrap(), 2);
        assert_eq!(crud.list("u1", &[]).await.unwrap().len(), 2);

        let page = crud
            .page("u1", &PageQuery::new().ascending(true).limit(1))
            .await
            .unwrap();
        assert_eq!(page.items[0].id.as_deref(), Some("a"));
        let next = crud
            .page("u1", &PageQuery::new().ascending(true).limit(1).cursor(page.next_cursor))
            .await
            .unwrap();
        assert_eq!(next.items[0].id.as_deref(), Some("b"));

        assert_eq!(crud.list_all(&[]).await.unwrap().len(), 3);
        assert_eq!(crud.page_all(&PageQuery::new().limit(2)).await.unwrap().items.len(), 2);
        let some = crud
            .list_by_ids(&["c".to_string(), "missing".to_string()], &[])
            .await
            .unwrap();
        assert_eq!(some.len(), 1);
    }

    #[tokio::test]
    async fn test_update_op_is_stamped() {
        let gateway = InMemoryGateway::new();
        let crud = crud(&gateway);
        crud.create("n1", &note("hello"), Some("u1")).await.unwrap();

        let op = crud
            .update_op("n1", &json!({"title": "x", "status": 5}), Some("u1"), None)
            .unwrap();
        let outcomes = crud.data().transact_write(vec![op]).await.unwrap();

        assert_eq!(outcomes, vec![true]);
        let item = stored(&gateway, "n1").await;
        assert_eq!(item["title"], json!("x"));
        assert_eq!(item["status"], json!(1));
        assert_eq!(item["updateBy"], json!("u1"));
    }

    #[tokio::test]
    async fn test_mutations_publish_events() {
        let gateway = InMemoryGateway::new();
        let bus = MemoryEventBus::new();
        let mut events = bus.subscribe(TABLE).await;
        let crud = crud(&gateway).with_events(Arc::new(bus.clone()));

        crud.create("n1", &note("hello"), Some("u1")).await.unwrap();
        crud.enable_by_id("n1", "u1").await.unwrap();
        assert!(!crud.restore_by_id("n1", "u1").await.unwrap());
        crud.del_by_id("n1", "u1").await.unwrap();

        assert_eq!(
            events.recv().await.unwrap(),
            CrudEvent::Created {
                id: "n1".to_string(),
                user_id: Some("u1".to_string())
            }
        );
        assert_eq!(
            events.recv().await.unwrap(),
            CrudEvent::StatusChanged {
                id: "n1".to_string(),
                user_id: "u1".to_string(),
                status: Status::Enabled
            }
        );
        assert_eq!(
            events.recv().await.unwrap(),
            CrudEvent::Deleted {
                id: "n1".to_string(),
                user_id: "u1".to_string()
            }
        );
    }

    #[test]
    fn test_encode_id_strips_padding() {
        assert_eq!(CrudService::<Note>::encode_id("a"), "YQ");
        assert_eq!(CrudService::<Note>::encode_id("abc"), "YWJj");
    }
}
