use serde::{Deserialize, Serialize};
use serde_json::Value;

use strata_core::expression::{KeyCondition, Projection, SortFilter};
use strata_core::storage::Cursor;

/// One page of results and the cursor of the next page, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<Cursor>,
}

impl<T> PageResult<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            next_cursor: None,
        }
    }

    /// Converts every item, keeping the cursor.
    pub fn try_map<U, E>(self, f: impl FnMut(T) -> Result<U, E>) -> Result<PageResult<U>, E> {
        Ok(PageResult {
            items: self.items.into_iter().map(f).collect::<Result<_, _>>()?,
            next_cursor: self.next_cursor,
        })
    }
}

/// A paged query on the table or one of its secondary indexes.
///
/// A cursor is only valid when replayed with the query that produced it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IndexQuery {
    pub index: Option<String>,
    pub key: KeyCondition,
    /// Scan direction; descending unless set.
    pub ascending: bool,
    pub limit: Option<u32>,
    pub cursor: Option<Cursor>,
    pub fields: Vec<String>,
}

impl IndexQuery {
    pub fn new(index: impl Into<String>) -> Self {
        Self {
            index: Some(index.into()),
            ..Self::default()
        }
    }

    /// A query on the table's primary key.
    pub fn table() -> Self {
        Self::default()
    }

    pub fn key(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.key = self.key.key(name, value);
        self
    }

    pub fn sort(mut self, filter: SortFilter) -> Self {
        self.key = self.key.sort(filter);
        self
    }

    pub fn with_sort(mut self, filter: Option<SortFilter>) -> Self {
        self.key = self.key.with_sort(filter);
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

    pub fn with_limit(mut self, limit: Option<u32>) -> Self {
        self.limit = limit;
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

    pub fn projection(&self) -> Projection {
        Projection::new(self.fields.iter().cloned())
    }
}

/// A paged full scan of the table or an index.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScanQuery {
    pub index: Option<String>,
    pub limit: Option<u32>,
    pub cursor: Option<Cursor>,
    pub fields: Vec<String>,
}

impl ScanQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_limit(mut self, limit: Option<u32>) -> Self {
        self.limit = limit;
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

    pub fn projection(&self) -> Projection {
        Projection::new(self.fields.iter().cloned())
    }
}
