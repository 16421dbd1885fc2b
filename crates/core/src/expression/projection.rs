use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::path::lookup;
use crate::storage::Item;

/// Attribute paths to fetch. An empty projection fetches every attribute.
///
/// Paths are kept in request order. A path is dropped when a shorter prefix
/// of it is also requested (`a.b` already covers `a.b.c`), and repeated
/// paths collapse to their first occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Projection {
    paths: Vec<String>,
}

impl Projection {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields: Vec<String> = fields
            .into_iter()
            .map(Into::into)
            .filter(|field| !field.is_empty())
            .collect();

        let paths = fields
            .iter()
            .enumerate()
            .filter(|(i, field)| !fields[..*i].contains(field))
            .filter(|(_, field)| {
                !fields
                    .iter()
                    .any(|other| field.starts_with(&format!("{other}.")))
            })
            .map(|(_, field)| field.clone())
            .collect();

        Self { paths }
    }

    /// Returns a projection that also fetches `field`. Fetching everything
    /// stays fetching everything.
    pub fn including(&self, field: &str) -> Self {
        if self.is_all() {
            return self.clone();
        }
        Self::new(self.paths.iter().map(String::as_str).chain([field]))
    }

    pub fn is_all(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// Copies the projected attributes of `item` into a new item.
    pub fn apply(&self, item: &Item) -> Item {
        if self.is_all() {
            return item.clone();
        }
        let mut projected = Item::new();
        for path in &self.paths {
            if lookup(item, path).is_none() {
                continue;
            }
            let segments: Vec<&str> = path.split('.').collect();
            copy_path(item, &mut projected, &segments);
        }
        projected
    }
}

fn copy_path(source: &Item, target: &mut Item, segments: &[&str]) {
    let Some((head, rest)) = segments.split_first() else {
        return;
    };
    let Some(value) = source.get(*head) else {
        return;
    };
    if rest.is_empty() {
        target.insert(head.to_string(), value.clone());
        return;
    }
    if let Value::Object(child) = value {
        let slot = target
            .entry(head.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(target_child) = slot {
            copy_path(child, target_child, rest);
        }
    }
}
