//! Query cache implementations.
//!
//! `MemoryQueryCache` is a development aid: unbounded, process-local and
//! never invalidated on writes. Build it only when `DEBUG` is set.

mod memory;

use std::sync::Arc;

use strata_core::cache::{NoopQueryCache, QueryCache};

use crate::config::StrataConfig;

pub use memory::MemoryQueryCache;

/// Selects the query cache for a configuration.
pub fn query_cache(config: &StrataConfig) -> Arc<dyn QueryCache> {
    if config.debug {
        Arc::new(MemoryQueryCache::new())
    } else {
        Arc::new(NoopQueryCache)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_debug_selects_memory_cache() {
        let mut config = StrataConfig::new("app");
        config.debug = true;
        let cache = query_cache(&config);

        cache.set("k", b"v").await.unwrap();

        assert_eq!(cache.get("k").await.unwrap(), Some(b"v".to_vec()));
    }

    #[tokio::test]
    async fn test_default_selects_noop_cache() {
        let cache = query_cache(&StrataConfig::new("app"));

        cache.set("k", b"v").await.unwrap();

        assert_eq!(cache.get("k").await.unwrap(), None);
    }
}
