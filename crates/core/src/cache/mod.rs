mod error;
mod keys;
mod traits;

pub use error::{CacheError, Result};
pub use keys::query_key;
pub use traits::{NoopQueryCache, QueryCache};
