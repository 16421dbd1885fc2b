use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::storage::Item;

/// SET / REMOVE / increment actions applied to an existing item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdatePlan {
    pub set: Vec<(String, Value)>,
    pub remove: Vec<String>,
    pub increment: Vec<(String, Value)>,
}

impl UpdatePlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a plan from a partial model.
    ///
    /// Keys absent from the model are left untouched. `null` and empty
    /// arrays remove the attribute; every other value is set.
    pub fn from_model(model: &Item) -> Self {
        let mut plan = Self::new();
        for (name, value) in model {
            match value {
                Value::Null => plan.remove.push(name.clone()),
                Value::Array(values) if values.is_empty() => plan.remove.push(name.clone()),
                value => plan.set.push((name.clone(), value.clone())),
            }
        }
        plan
    }

    pub fn set(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set.push((name.into(), value.into()));
        self
    }

    pub fn remove(mut self, name: impl Into<String>) -> Self {
        self.remove.push(name.into());
        self
    }

    /// Adds `by` to a numeric attribute, counting from 0 when absent.
    pub fn increment(mut self, name: impl Into<String>, by: impl Into<Value>) -> Self {
        self.increment.push((name.into(), by.into()));
        self
    }

    /// Appends the actions of `other` after this plan's actions.
    pub fn merge(mut self, other: UpdatePlan) -> Self {
        self.set.extend(other.set);
        self.remove.extend(other.remove);
        self.increment.extend(other.increment);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.remove.is_empty() && self.increment.is_empty()
    }

    /// Applies the plan to an item in place.
    pub fn apply(&self, item: &mut Item) {
        for (path, value) in &self.set {
            write_path(item, path, Some(value.clone()));
        }
        for path in &self.remove {
            write_path(item, path, None);
        }
        for (path, by) in &self.increment {
            let current = super::lookup(item, path)
                .and_then(Value::as_f64)
                .unwrap_or(0.0);
            let by = by.as_f64().unwrap_or(0.0);
            write_path(item, path, Some(number(current + by)));
        }
    }
}

fn number(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Value::from(value as i64)
    } else {
        serde_json::Number::from_f64(value)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

fn write_path(item: &mut Item, path: &str, value: Option<Value>) {
    let mut segments = path.split('.').peekable();
    let mut current = item;
    while let Some(segment) = segments.next() {
        if segments.peek().is_none() {
            match value {
                Some(value) => {
                    current.insert(segment.to_string(), value);
                }
                None => {
                    current.remove(segment);
                }
            }
            return;
        }
        let slot = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        match slot {
            Value::Object(child) => current = child,
            _ => return,
        }
    }
}
