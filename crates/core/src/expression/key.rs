use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::condition::Condition;
use crate::storage::Item;

/// Range filter on the sort key of an index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SortFilter {
    pub name: String,
    pub from: Option<Value>,
    pub to: Option<Value>,
}

impl SortFilter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            from: None,
            to: None,
        }
    }

    /// Sets the inclusive lower bound.
    pub fn from(mut self, value: impl Into<Value>) -> Self {
        self.from = Some(value.into());
        self
    }

    /// Sets the inclusive upper bound.
    pub fn to(mut self, value: impl Into<Value>) -> Self {
        self.to = Some(value.into());
        self
    }

    /// Sets both bounds from optional values.
    pub fn range<V: Into<Value>>(mut self, from: Option<V>, to: Option<V>) -> Self {
        self.from = from.map(Into::into);
        self.to = to.map(Into::into);
        self
    }

    /// The predicate this filter stands for.
    ///
    /// Equal bounds collapse to equality; a filter with no bounds matches any
    /// non-negative sort value.
    pub fn condition(&self) -> Condition {
        match (&self.from, &self.to) {
            (Some(from), Some(to)) if from == to => Condition::eq(&self.name, to.clone()),
            (Some(from), Some(to)) => Condition::between(&self.name, from.clone(), to.clone()),
            (Some(from), None) => Condition::compare(
                &self.name,
                super::Comparator::Ge,
                from.clone(),
            ),
            (None, Some(to)) => Condition::compare(&self.name, super::Comparator::Le, to.clone()),
            (None, None) => Condition::compare(&self.name, super::Comparator::Ge, 0),
        }
    }
}

/// Equality on the index hash key(s), optionally narrowed by a sort filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyCondition {
    pub keys: Vec<(String, Value)>,
    pub sort: Option<SortFilter>,
}

impl KeyCondition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an equality clause on a key attribute.
    pub fn key(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.keys.push((name.into(), value.into()));
        self
    }

    pub fn sort(mut self, filter: SortFilter) -> Self {
        self.sort = Some(filter);
        self
    }

    pub fn with_sort(mut self, filter: Option<SortFilter>) -> Self {
        self.sort = filter;
        self
    }

    /// The attribute the matched items are ordered by, if any.
    pub fn sort_name(&self) -> Option<&str> {
        self.sort.as_ref().map(|sort| sort.name.as_str())
    }

    /// Whether an item belongs to the key range.
    ///
    /// Items lacking the sort attribute do not appear in a sorted index.
    pub fn matches(&self, item: &Item) -> bool {
        let keys_match = self
            .keys
            .iter()
            .all(|(name, value)| Condition::eq(name, value.clone()).matches(item));
        keys_match
            && self
                .sort
                .as_ref()
                .is_none_or(|sort| sort.condition().matches(item))
    }
}
