//! DynamoDB attribute conversion functions.
//!
//! Pure functions converting between `serde_json` values and DynamoDB
//! `AttributeValue`s. Testable without DynamoDB access.

use std::collections::{BTreeMap, HashMap};

use aws_sdk_dynamodb::primitives::Blob;
use aws_sdk_dynamodb::types::AttributeValue;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde_json::{Number, Value};

use strata_core::storage::{GatewayError, Item};

pub type AttributeMap = HashMap<String, AttributeValue>;

/// Convert a JSON value to an attribute value.
pub fn to_attribute(value: &Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(b) => AttributeValue::Bool(*b),
        Value::Number(n) => AttributeValue::N(n.to_string()),
        Value::String(s) => AttributeValue::S(s.clone()),
        Value::Array(values) => AttributeValue::L(values.iter().map(to_attribute).collect()),
        Value::Object(map) => AttributeValue::M(to_attribute_map(map)),
    }
}

/// Convert an item to a DynamoDB attribute map.
pub fn to_attribute_map(item: &Item) -> AttributeMap {
    item.iter()
        .map(|(k, v)| (k.clone(), to_attribute(v)))
        .collect()
}

/// Convert an attribute value to JSON. Binary data becomes base64 text.
pub fn from_attribute(value: &AttributeValue) -> Result<Value, GatewayError> {
    Ok(match value {
        AttributeValue::Null(_) => Value::Null,
        AttributeValue::Bool(b) => Value::Bool(*b),
        AttributeValue::N(n) => Value::Number(parse_number(n)?),
        AttributeValue::S(s) => Value::String(s.clone()),
        AttributeValue::B(blob) => Value::String(encode_blob(blob)),
        AttributeValue::L(values) => Value::Array(
            values
                .iter()
                .map(from_attribute)
                .collect::<Result<_, _>>()?,
        ),
        AttributeValue::M(map) => Value::Object(from_attribute_map(map)?),
        AttributeValue::Ss(values) => Value::Array(values.iter().cloned().map(Value::String).collect()),
        AttributeValue::Ns(values) => Value::Array(
            values
                .iter()
                .map(|n| parse_number(n).map(Value::Number))
                .collect::<Result<_, _>>()?,
        ),
        AttributeValue::Bs(values) => {
            Value::Array(values.iter().map(|b| Value::String(encode_blob(b))).collect())
        }
        other => {
            return Err(GatewayError::Serialization(format!(
                "Unsupported attribute value: {:?}",
                other
            )))
        }
    })
}

/// Convert a DynamoDB attribute map to an item.
pub fn from_attribute_map(map: &AttributeMap) -> Result<Item, GatewayError> {
    map.iter()
        .map(|(k, v)| Ok((k.clone(), from_attribute(v)?)))
        .collect()
}

/// Expression attribute names, or `None` when there are none.
pub fn names_map(names: BTreeMap<String, String>) -> Option<HashMap<String, String>> {
    (!names.is_empty()).then(|| names.into_iter().collect())
}

/// Expression attribute values, or `None` when there are none.
pub fn values_map(values: BTreeMap<String, Value>) -> Option<AttributeMap> {
    (!values.is_empty()).then(|| {
        values
            .iter()
            .map(|(k, v)| (k.clone(), to_attribute(v)))
            .collect()
    })
}

fn parse_number(n: &str) -> Result<Number, GatewayError> {
    if let Ok(i) = n.parse::<i64>() {
        return Ok(Number::from(i));
    }
    if let Ok(u) = n.parse::<u64>() {
        return Ok(Number::from(u));
    }
    n.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .ok_or_else(|| GatewayError::Serialization(format!("Invalid number attribute: {}", n)))
}

fn encode_blob(blob: &Blob) -> String {
    STANDARD.encode(blob.as_ref())
}
