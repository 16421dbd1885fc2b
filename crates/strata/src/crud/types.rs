use serde_json::Value;

use strata_core::expression::SortFilter;
use strata_core::record::{Status, StatusError};
use strata_core::storage::Cursor;

/// Selects records by status, optionally bounded by the timestamp of that
/// status.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusQuery {
    pub status: Status,
    pub from: Option<i64>,
    pub to: Option<i64>,
    pub ascending: bool,
    pub limit: Option<u32>,
    pub cursor: Option<Cursor>,
    pub fields: Vec<String>,
}

impl Default for StatusQuery {
    fn default() -> Self {
        Self::new(Status::Enabled)
    }
}

impl StatusQuery {
    pub fn new(status: Status) -> Self {
        Self {
            status,
            from: None,
            to: None,
            ascending: false,
            limit: None,
            cursor: None,
            fields: Vec::new(),
        }
    }

    pub fn from(mut self, from: i64) -> Self {
        self.from = Some(from);
        self
    }

    pub fn to(mut self, to: i64) -> Self {
        self.to = Some(to);
        self
    }

    pub fn ascending(mut self, ascending: bool) -> Self {
        self.ascending = ascending;
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn cursor(mut self, cursor: Option<Cursor>) -> Self {
        self.cursor = cursor;
        self
    }

    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Lifecycle attribute of the status; also the sort key of its indexes.
    pub fn status_key(&self) -> Result<&'static str, StatusError> {
        self.status.key()
    }

    /// Index holding one owner's records sorted by the status timestamp.
    pub fn owner_index(&self) -> Result<String, StatusError> {
        Ok(format!("userId-{}", self.status_key()?))
    }

    /// Index holding every owner's records of the status.
    pub fn status_index(&self) -> Result<String, StatusError> {
        Ok(self.status_key()?.to_string())
    }

    pub fn sort(&self) -> Result<SortFilter, StatusError> {
        Ok(SortFilter::new(self.status_key()?).range(
            self.from.map(Value::from),
            self.to.map(Value::from),
        ))
    }
}

/// Options shared by owner-scoped listings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageQuery {
    pub ascending: bool,
    pub limit: Option<u32>,
    pub cursor: Option<Cursor>,
    pub fields: Vec<String>,
}

impl PageQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ascending(mut self, ascending: bool) -> Self {
        self.ascending = ascending;
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn cursor(mut self, cursor: Option<Cursor>) -> Self {
        self.cursor = cursor;
        self
    }

    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_to_enabled_descending() {
        let query = StatusQuery::default();

        assert_eq!(query.status, Status::Enabled);
        assert!(!query.ascending);
        assert_eq!(query.owner_index().unwrap(), "userId-enable");
        assert_eq!(query.status_index().unwrap(), "enable");
    }

    #[test]
    fn test_sort_filter_uses_status_timestamp() {
        let sort = StatusQuery::new(Status::Blocked).from(10).to(20).sort().unwrap();

        assert_eq!(sort.name, "block");
        assert_eq!(sort.from, Some(json!(10)));
        assert_eq!(sort.to, Some(json!(20)));
    }

    #[test]
    fn test_status_without_key_is_invalid() {
        let query = StatusQuery::new(Status::Error);

        assert_eq!(
            query.owner_index(),
            Err(StatusError::NoLifecycleKey(Status::Error))
        );
    }
}
