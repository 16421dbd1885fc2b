use async_trait::async_trait;

use super::Result;

/// Cache of list-query results keyed by the serialized request.
///
/// Entries are never invalidated on writes; only list queries consult it.
#[async_trait]
pub trait QueryCache: Send + Sync {
    /// Gets a cached result by key.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Stores a result under key.
    async fn set(&self, key: &str, value: &[u8]) -> Result<()>;
}

/// Cache that stores nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopQueryCache;

#[async_trait]
impl QueryCache for NoopQueryCache {
    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &[u8]) -> Result<()> {
        Ok(())
    }
}
