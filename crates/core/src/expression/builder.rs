use std::collections::{BTreeMap, HashMap};

use serde_json::Value;

use super::{Condition, ExpressionError, KeyCondition, Projection, UpdatePlan};

/// Alias families. Each family owns a disjoint placeholder prefix so that
/// projection, key, condition and update clauses rendered into the same
/// request can never collide.
const CONDITION: &str = "c";
const UPDATE: &str = "u";

/// Renders expression ASTs into DynamoDB expression strings.
///
/// Placeholders accumulate into shared name/value maps across calls, so a
/// single builder renders every clause of one request.
///
/// | Clause     | Names       | Values                     |
/// |------------|-------------|----------------------------|
/// | projection | `#p{i}x{j}` | -                          |
/// | key        | `#k{i}`     | `:k{i}`                    |
/// | sort       | `#kr`       | `:krv`, `:krv0`, `:krv1`   |
/// | condition  | `#c{i}`     | `:c{i}`                    |
/// | update     | `#u{i}`     | `:u{i}`                    |
#[derive(Debug, Clone, Default)]
pub struct ExpressionBuilder {
    names: BTreeMap<String, String>,
    values: BTreeMap<String, Value>,
    aliases: HashMap<(&'static str, String), String>,
    name_counters: HashMap<&'static str, usize>,
    value_counters: HashMap<&'static str, usize>,
}

impl ExpressionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Renders a projection expression; `None` means "all attributes".
    pub fn projection(&mut self, projection: &Projection) -> Option<String> {
        if projection.is_all() {
            return None;
        }
        let rendered: Vec<String> = projection
            .paths()
            .iter()
            .enumerate()
            .map(|(i, path)| {
                path.split('.')
                    .enumerate()
                    .map(|(j, segment)| {
                        let alias = format!("#p{i}x{j}");
                        self.names.insert(alias.clone(), segment.to_string());
                        alias
                    })
                    .collect::<Vec<_>>()
                    .join(".")
            })
            .collect();
        Some(rendered.join(","))
    }

    /// Renders a key condition: one equality per key, then the sort filter.
    pub fn key_condition(&mut self, condition: &KeyCondition) -> Result<String, ExpressionError> {
        if condition.keys.is_empty() {
            return Err(ExpressionError::EmptyKeyCondition);
        }
        let mut clauses = Vec::with_capacity(condition.keys.len() + 1);
        for (i, (name, value)) in condition.keys.iter().enumerate() {
            self.names.insert(format!("#k{i}"), name.clone());
            self.values.insert(format!(":k{i}"), value.clone());
            clauses.push(format!("#k{i} = :k{i}"));
        }
        if let Some(sort) = &condition.sort {
            self.names.insert("#kr".to_string(), sort.name.clone());
            let clause = match (&sort.from, &sort.to) {
                (Some(from), Some(to)) if from == to => {
                    self.values.insert(":krv".to_string(), to.clone());
                    "#kr = :krv".to_string()
                }
                (Some(from), Some(to)) => {
                    self.values.insert(":krv0".to_string(), from.clone());
                    self.values.insert(":krv1".to_string(), to.clone());
                    "#kr BETWEEN :krv0 AND :krv1".to_string()
                }
                (Some(from), None) => {
                    self.values.insert(":krv".to_string(), from.clone());
                    "#kr >= :krv".to_string()
                }
                (None, Some(to)) => {
                    self.values.insert(":krv".to_string(), to.clone());
                    "#kr <= :krv".to_string()
                }
                (None, None) => {
                    self.values.insert(":krv".to_string(), Value::from(0));
                    "#kr >= :krv".to_string()
                }
            };
            clauses.push(clause);
        }
        Ok(clauses.join(" AND "))
    }

    /// Renders a condition expression.
    pub fn condition(&mut self, condition: &Condition) -> String {
        match condition {
            Condition::Exists(path) => {
                format!("attribute_exists({})", self.path(CONDITION, path))
            }
            Condition::NotExists(path) => {
                format!("attribute_not_exists({})", self.path(CONDITION, path))
            }
            Condition::Compare { path, op, value } => {
                let name = self.path(CONDITION, path);
                let placeholder = self.value(CONDITION, value.clone());
                format!("{name} {} {placeholder}", op.as_str())
            }
            Condition::Between { path, low, high } => {
                let name = self.path(CONDITION, path);
                let low = self.value(CONDITION, low.clone());
                let high = self.value(CONDITION, high.clone());
                format!("{name} BETWEEN {low} AND {high}")
            }
            Condition::And(parts) => self.join(parts, " AND "),
            Condition::Or(parts) => self.join(parts, " OR "),
        }
    }

    /// Renders an update expression; `None` when the plan has no actions.
    pub fn update(&mut self, plan: &UpdatePlan) -> Option<String> {
        let mut set = Vec::with_capacity(plan.set.len() + plan.increment.len());
        for (path, value) in &plan.set {
            let name = self.path(UPDATE, path);
            let placeholder = self.value(UPDATE, value.clone());
            set.push(format!("{name} = {placeholder}"));
        }
        for (path, by) in &plan.increment {
            let name = self.path(UPDATE, path);
            let zero = self.value(UPDATE, Value::from(0));
            let by = self.value(UPDATE, by.clone());
            set.push(format!("{name} = if_not_exists({name}, {zero}) + {by}"));
        }
        let remove: Vec<String> = plan
            .remove
            .iter()
            .map(|path| self.path(UPDATE, path))
            .collect();

        let mut expression = Vec::with_capacity(2);
        if !set.is_empty() {
            expression.push(format!("SET {}", set.join(", ")));
        }
        if !remove.is_empty() {
            expression.push(format!("REMOVE {}", remove.join(", ")));
        }
        if expression.is_empty() {
            None
        } else {
            Some(expression.join(" "))
        }
    }

    pub fn names(&self) -> &BTreeMap<String, String> {
        &self.names
    }

    pub fn values(&self) -> &BTreeMap<String, Value> {
        &self.values
    }

    /// Consumes the builder, returning the accumulated name and value maps.
    pub fn into_parts(self) -> (BTreeMap<String, String>, BTreeMap<String, Value>) {
        (self.names, self.values)
    }

    fn join(&mut self, parts: &[Condition], separator: &str) -> String {
        parts
            .iter()
            .map(|part| match part {
                Condition::And(inner) | Condition::Or(inner) if inner.len() > 1 => {
                    format!("({})", self.condition(part))
                }
                _ => self.condition(part),
            })
            .collect::<Vec<_>>()
            .join(separator)
    }

    fn path(&mut self, family: &'static str, path: &str) -> String {
        path.split('.')
            .map(|segment| self.name(family, segment))
            .collect::<Vec<_>>()
            .join(".")
    }

    fn name(&mut self, family: &'static str, attribute: &str) -> String {
        let key = (family, attribute.to_string());
        if let Some(alias) = self.aliases.get(&key) {
            return alias.clone();
        }
        let counter = self.name_counters.entry(family).or_insert(0);
        let alias = format!("#{family}{counter}");
        *counter += 1;
        self.names.insert(alias.clone(), attribute.to_string());
        self.aliases.insert(key, alias.clone());
        alias
    }

    fn value(&mut self, family: &'static str, value: Value) -> String {
        let counter = self.value_counters.entry(family).or_insert(0);
        let placeholder = format!(":{family}{counter}");
        *counter += 1;
        self.values.insert(placeholder.clone(), value);
        placeholder
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::SortFilter;
    use serde_json::json;

    #[test]
    fn test_projection_aliases_per_segment() {
        let mut builder = ExpressionBuilder::new();

        let rendered = builder.projection(&Projection::new(["a.b", "a.b.c", "x"]));

        assert_eq!(rendered.as_deref(), Some("#p0x0.#p0x1,#p1x0"));
        assert_eq!(builder.names().len(), 3);
        assert_eq!(builder.names()["#p0x0"], "a");
        assert_eq!(builder.names()["#p0x1"], "b");
        assert_eq!(builder.names()["#p1x0"], "x");
    }

    #[test]
    fn test_empty_projection_means_all() {
        let mut builder = ExpressionBuilder::new();
        assert_eq!(builder.projection(&Projection::all()), None);
        assert!(builder.names().is_empty());
    }

    #[test]
    fn test_key_condition_variants() {
        let cases = [
            (SortFilter::new("enable").from(7).to(7), "#kr = :krv"),
            (
                SortFilter::new("enable").from(1).to(9),
                "#kr BETWEEN :krv0 AND :krv1",
            ),
            (SortFilter::new("enable").from(1), "#kr >= :krv"),
            (SortFilter::new("enable").to(9), "#kr <= :krv"),
            (SortFilter::new("enable"), "#kr >= :krv"),
        ];

        for (sort, expected) in cases {
            let mut builder = ExpressionBuilder::new();
            let rendered = builder
                .key_condition(&KeyCondition::new().key("userId", "u1").sort(sort))
                .unwrap();
            assert_eq!(rendered, format!("#k0 = :k0 AND {expected}"));
            assert_eq!(builder.names()["#kr"], "enable");
        }
    }

    #[test]
    fn test_open_sort_filter_defaults_to_zero() {
        let mut builder = ExpressionBuilder::new();
        builder
            .key_condition(
                &KeyCondition::new()
                    .key("userId", "u1")
                    .sort(SortFilter::new("draft")),
            )
            .unwrap();

        assert_eq!(builder.values()[":krv"], json!(0));
    }

    #[test]
    fn test_key_condition_requires_a_key() {
        let mut builder = ExpressionBuilder::new();
        assert_eq!(
            builder.key_condition(&KeyCondition::new()),
            Err(ExpressionError::EmptyKeyCondition)
        );
    }

    #[test]
    fn test_condition_rendering_reuses_aliases() {
        let mut builder = ExpressionBuilder::new();
        let condition = Condition::exists("id")
            .and(Condition::eq("userId", "u1"))
            .and(Condition::one_of("status", [1, 3]));

        let rendered = builder.condition(&condition);

        assert_eq!(
            rendered,
            "attribute_exists(#c0) AND #c1 = :c0 AND (#c2 = :c1 OR #c2 = :c2)"
        );
        assert_eq!(builder.names()["#c2"], "status");
        assert_eq!(builder.values()[":c2"], json!(3));
    }

    #[test]
    fn test_update_rendering() {
        let mut builder = ExpressionBuilder::new();
        let plan = UpdatePlan::new()
            .set("foo", "bar")
            .remove("qty")
            .increment("ver", 1);

        let rendered = builder.update(&plan);

        assert_eq!(
            rendered.as_deref(),
            Some("SET #u0 = :u0, #u1 = if_not_exists(#u1, :u1) + :u2 REMOVE #u2")
        );
        assert_eq!(builder.names()["#u2"], "qty");
        assert_eq!(builder.values()[":u2"], json!(1));
    }

    #[test]
    fn test_families_never_collide() {
        let mut builder = ExpressionBuilder::new();
        let projection = builder.projection(&Projection::new(["status"]));
        let keys = builder
            .key_condition(&KeyCondition::new().key("status", 2))
            .unwrap();
        let condition = builder.condition(&Condition::eq("status", 2));
        let update = builder.update(&UpdatePlan::new().set("status", 3));

        assert_eq!(projection.as_deref(), Some("#p0x0"));
        assert_eq!(keys, "#k0 = :k0");
        assert_eq!(condition, "#c0 = :c0");
        assert_eq!(update.as_deref(), Some("SET #u0 = :u0"));
        assert_eq!(builder.names().len(), 4);
        assert_eq!(builder.values().len(), 3);
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let render = || {
            let mut builder = ExpressionBuilder::new();
            let condition = builder.condition(
                &Condition::not_exists("id").and(Condition::eq("a.b", "x")),
            );
            (condition, builder.into_parts())
        };

        assert_eq!(render(), render());
    }
}
