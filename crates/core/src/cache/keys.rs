use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Serialize;

use super::Result;

/// Returns the cache key of a query request: base64 of its JSON form.
///
/// Identical requests always map to the same key.
pub fn query_key<R: Serialize>(request: &R) -> Result<String> {
    let json = serde_json::to_vec(request)?;
    Ok(STANDARD.encode(json))
}
