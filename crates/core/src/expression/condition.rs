use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::path::{compare_values, lookup};
use crate::storage::Item;

/// Binary comparison operators supported in conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Comparator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Comparator {
    /// Returns the operator token used in DynamoDB expressions.
    pub fn as_str(&self) -> &'static str {
        match self {
            Comparator::Eq => "=",
            Comparator::Ne => "<>",
            Comparator::Lt => "<",
            Comparator::Le => "<=",
            Comparator::Gt => ">",
            Comparator::Ge => ">=",
        }
    }

    fn accepts(&self, ordering: Ordering) -> bool {
        match self {
            Comparator::Eq => ordering == Ordering::Equal,
            Comparator::Ne => ordering != Ordering::Equal,
            Comparator::Lt => ordering == Ordering::Less,
            Comparator::Le => ordering != Ordering::Greater,
            Comparator::Gt => ordering == Ordering::Greater,
            Comparator::Ge => ordering != Ordering::Less,
        }
    }
}

/// A server-evaluated predicate over the current state of an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Condition {
    Exists(String),
    NotExists(String),
    Compare {
        path: String,
        op: Comparator,
        value: Value,
    },
    Between {
        path: String,
        low: Value,
        high: Value,
    },
    And(Vec<Condition>),
    Or(Vec<Condition>),
}

impl Condition {
    pub fn exists(path: impl Into<String>) -> Self {
        Condition::Exists(path.into())
    }

    pub fn not_exists(path: impl Into<String>) -> Self {
        Condition::NotExists(path.into())
    }

    pub fn compare(path: impl Into<String>, op: Comparator, value: impl Into<Value>) -> Self {
        Condition::Compare {
            path: path.into(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(path, Comparator::Eq, value)
    }

    pub fn ne(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(path, Comparator::Ne, value)
    }

    pub fn between(
        path: impl Into<String>,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> Self {
        Condition::Between {
            path: path.into(),
            low: low.into(),
            high: high.into(),
        }
    }

    /// Matches when the attribute equals any of the given values.
    pub fn one_of<V: Into<Value>>(
        path: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let path = path.into();
        let mut options: Vec<Condition> = values
            .into_iter()
            .map(|value| Self::eq(path.clone(), value))
            .collect();
        if options.len() == 1 {
            return options.remove(0);
        }
        Condition::Or(options)
    }

    /// Conjoins `other` onto this condition, flattening nested ANDs.
    pub fn and(self, other: Condition) -> Self {
        match self {
            Condition::And(mut parts) => {
                parts.push(other);
                Condition::And(parts)
            }
            current => Condition::And(vec![current, other]),
        }
    }

    /// Combines an optional caller condition with a mandatory guard.
    pub fn guarded(guard: Condition, extra: Option<Condition>) -> Self {
        match extra {
            Some(extra) => guard.and(extra),
            None => guard,
        }
    }

    /// Evaluates the condition against an item. Absent items are passed as
    /// an empty map.
    pub fn matches(&self, item: &Item) -> bool {
        match self {
            Condition::Exists(path) => lookup(item, path).is_some(),
            Condition::NotExists(path) => lookup(item, path).is_none(),
            Condition::Compare { path, op, value } => match lookup(item, path) {
                Some(current) => compare_values(current, value)
                    .map(|ordering| op.accepts(ordering))
                    .unwrap_or(*op == Comparator::Ne),
                None => *op == Comparator::Ne,
            },
            Condition::Between { path, low, high } => lookup(item, path).is_some_and(|current| {
                matches!(
                    compare_values(current, low),
                    Some(Ordering::Greater | Ordering::Equal)
                ) && matches!(
                    compare_values(current, high),
                    Some(Ordering::Less | Ordering::Equal)
                )
            }),
            Condition::And(parts) => parts.iter().all(|part| part.matches(item)),
            Condition::Or(parts) => parts.iter().any(|part| part.matches(item)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item(value: Value) -> Item {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_and_flattens() {
        let cond = Condition::exists("id")
            .and(Condition::eq("userId", "u1"))
            .and(Condition::ne("status", 5));

        match cond {
            Condition::And(parts) => assert_eq!(parts.len(), 3),
            other => panic!("expected AND, got {:?}", other),
        }
    }

    #[test]
    fn test_one_of_single_value_is_plain_equality() {
        assert_eq!(Condition::one_of("status", [4]), Condition::eq("status", 4));
    }

    #[test]
    fn test_existence_checks() {
        let present = item(json!({"id": "a"}));
        let absent = Item::new();

        assert!(Condition::exists("id").matches(&present));
        assert!(!Condition::exists("id").matches(&absent));
        assert!(Condition::not_exists("id").matches(&absent));
    }

    #[test]
    fn test_status_guard_evaluation() {
        let record = item(json!({"id": "a", "userId": "u1", "status": 2}));
        let guard = Condition::exists("id")
            .and(Condition::eq("userId", "u1"))
            .and(Condition::one_of("status", [1, 3]));

        assert!(!guard.matches(&record));

        let record = item(json!({"id": "a", "userId": "u1", "status": 3}));
        assert!(guard.matches(&record));
    }

    #[test]
    fn test_not_equal_on_missing_attribute_holds() {
        assert!(Condition::ne("status", 5).matches(&Item::new()));
    }

    #[test]
    fn test_between_is_inclusive() {
        let record = item(json!({"enable": 10}));

        assert!(Condition::between("enable", 10, 20).matches(&record));
        assert!(Condition::between("enable", 0, 10).matches(&record));
        assert!(!Condition::between("enable", 11, 20).matches(&record));
    }
}
