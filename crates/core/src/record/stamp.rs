use serde_json::Value;

use super::{Status, StatusError, LIFECYCLE_FIELDS};
use crate::storage::Item;

/// Fields a generic update never writes.
const CREATE_ONLY_FIELDS: [&str; 5] = ["create", "createBy", "userId", "status", "ver"];

/// Reads a millisecond timestamp from `field`, falling back to `now`.
pub fn now_or(model: &Item, field: &str, now: i64) -> i64 {
    model.get(field).and_then(Value::as_i64).unwrap_or(now)
}

/// Stamps a model for creation.
///
/// The status defaults to DRAFT and only its own lifecycle timestamp is
/// written; caller-supplied lifecycle and update fields are dropped. `ver`
/// starts at 0. An owner, when given, becomes both `userId` and `createBy`.
pub fn stamp_new(mut model: Item, user_id: Option<&str>, now: i64) -> Result<Item, StatusError> {
    let time = now_or(&model, "create", now);
    let status = match model.get("status").and_then(Value::as_u64) {
        None | Some(0) => Status::Draft,
        Some(code) => {
            let code = u8::try_from(code).map_err(|_| StatusError::UnknownCode(code))?;
            Status::try_from(code)?
        }
    };
    let status_key = status.key()?;

    for field in LIFECYCLE_FIELDS.iter().chain(&["update", "updateBy"]) {
        model.remove(*field);
    }
    model.insert("status".to_string(), status.into());
    model.insert("create".to_string(), Value::from(time));
    model.insert("ver".to_string(), Value::from(0));
    model.insert(status_key.to_string(), Value::from(time));

    if let Some(user_id) = user_id {
        model.insert("userId".to_string(), Value::from(user_id));
        model.insert("createBy".to_string(), Value::from(user_id));
    }

    Ok(model)
}

/// Stamps a model for a generic update.
///
/// Ownership, status, lifecycle and version fields are dropped so the
/// resulting update plan can never touch them.
pub fn stamp_update(mut model: Item, user_id: Option<&str>, now: i64) -> Item {
    let time = now_or(&model, "update", now);

    for field in CREATE_ONLY_FIELDS.iter().chain(LIFECYCLE_FIELDS.iter()) {
        model.remove(*field);
    }
    model.insert("update".to_string(), Value::from(time));

    if let Some(user_id) = user_id {
        model.insert("updateBy".to_string(), Value::from(user_id));
    }

    model
}

/// Drops `null` attributes before a whole-item write.
pub fn strip_nulls(mut item: Item) -> Item {
    item.retain(|_, value| !value.is_null());
    item
}
