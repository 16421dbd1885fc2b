use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use strata_core::cache::{QueryCache, Result};

/// In-memory query cache without eviction.
#[derive(Debug, Clone, Default)]
pub struct MemoryQueryCache {
    store: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryQueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached results.
    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.store.read().await.is_empty()
    }
}

#[async_trait]
impl QueryCache for MemoryQueryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let store = self.store.read().await;
        Ok(store.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        let mut store = self.store.write().await;
        store.insert(key.to_string(), value.to_vec());
        Ok(())
    }
}
