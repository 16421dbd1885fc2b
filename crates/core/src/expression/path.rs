//! Attribute path helpers shared by condition evaluation and projections.

use std::cmp::Ordering;

use serde_json::Value;

use crate::storage::Item;

/// Resolves a dotted attribute path (`a.b.c`) inside an item.
pub fn lookup<'a>(item: &'a Item, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = item.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Orders two attribute values the way the backend compares scalars.
///
/// Numbers compare numerically, strings lexicographically. Values of
/// different types have no ordering.
pub fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => l.as_f64()?.partial_cmp(&r.as_f64()?),
        (Value::String(l), Value::String(r)) => Some(l.cmp(r)),
        (Value::Bool(l), Value::Bool(r)) => Some(l.cmp(r)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (l, r) if l == r => Some(Ordering::Equal),
        _ => None,
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
    fn test_lookup_nested_path() {
        let item = item(json!({"a": {"b": {"c": 3}}, "x": 1}));

        assert_eq!(lookup(&item, "a.b.c"), Some(&json!(3)));
        assert_eq!(lookup(&item, "x"), Some(&json!(1)));
        assert_eq!(lookup(&item, "a.z"), None);
        assert_eq!(lookup(&item, "x.y"), None);
    }

    #[test]
    fn test_compare_numbers_across_representations() {
        assert_eq!(compare_values(&json!(1), &json!(1.0)), Some(Ordering::Equal));
        assert_eq!(compare_values(&json!(2), &json!(10)), Some(Ordering::Less));
    }

    #[test]
    fn test_compare_mismatched_types_is_unordered() {
        assert_eq!(compare_values(&json!("1"), &json!(1)), None);
    }
}
