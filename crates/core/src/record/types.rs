use serde::{Deserialize, Serialize};

use super::Status;

/// A persisted record: lifecycle metadata around the caller's domain data.
///
/// Every metadata field is optional so projected reads deserialize too.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrudRecord<D> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draft: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disable: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub star: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ver: Option<u64>,
    #[serde(flatten)]
    pub data: D,
}

impl<D> CrudRecord<D> {
    pub fn new(data: D) -> Self {
        Self {
            id: None,
            create: None,
            create_by: None,
            update: None,
            update_by: None,
            log: None,
            status: None,
            draft: None,
            enable: None,
            disable: None,
            block: None,
            delete: None,
            star: None,
            user_id: None,
            status_reason: None,
            ver: None,
            data,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_create(mut self, create: i64) -> Self {
        self.create = Some(create);
        self
    }

    /// Timestamp of the given lifecycle status, if set.
    pub fn lifecycle(&self, status: Status) -> Option<i64> {
        match status {
            Status::Draft => self.draft,
            Status::Enabled => self.enable,
            Status::Disabled => self.disable,
            Status::Deleted => self.delete,
            Status::Blocked => self.block,
            Status::None | Status::Error => None,
        }
    }

    /// Number of lifecycle timestamps currently set.
    pub fn lifecycle_count(&self) -> usize {
        [self.draft, self.enable, self.disable, self.delete, self.block]
            .iter()
            .filter(|t| t.is_some())
            .count()
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id.as_deref() == Some(user_id)
    }
}
