use async_trait::async_trait;

use super::{CrudEvent, Result};

/// Side channel receiving record mutations.
///
/// Publishing is observational; a failed publish never fails the mutation.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn publish(&self, topic: &str, event: &CrudEvent) -> Result<()>;
}

/// Sink that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEventSink;

#[async_trait]
impl EventSink for NoopEventSink {
    async fn publish(&self, _topic: &str, _event: &CrudEvent) -> Result<()> {
        Ok(())
    }
}
