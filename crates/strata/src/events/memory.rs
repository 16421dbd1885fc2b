//! In-memory event bus.
//!
//! Delivers `CrudEvent`s to subscribers of a topic using tokio broadcast
//! channels, one channel per topic.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{broadcast, RwLock};

use strata_core::events::{CrudEvent, EventSink, Result};

/// Channel capacity for each topic.
const CHANNEL_CAPACITY: usize = 100;

#[derive(Debug, Clone, Default)]
pub struct MemoryEventBus {
    channels: Arc<RwLock<HashMap<String, broadcast::Sender<CrudEvent>>>>,
}

impl MemoryEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to events published on `topic`.
    pub async fn subscribe(&self, topic: &str) -> broadcast::Receiver<CrudEvent> {
        self.get_or_create_channel(topic).await.subscribe()
    }

    async fn get_or_create_channel(&self, topic: &str) -> broadcast::Sender<CrudEvent> {
        {
            let channels = self.channels.read().await;
            if let Some(sender) = channels.get(topic) {
                return sender.clone();
            }
        }

        let mut channels = self.channels.write().await;

        // Another task may have created it in between.
        if let Some(sender) = channels.get(topic) {
            return sender.clone();
        }

        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        channels.insert(topic.to_string(), sender.clone());
        sender
    }
}

#[async_trait]
impl EventSink for MemoryEventBus {
    async fn publish(&self, topic: &str, event: &CrudEvent) -> Result<()> {
        let sender = self.get_or_create_channel(topic).await;

        // No receivers is not an error.
        let _ = sender.send(event.clone());

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn created(id: &str) -> CrudEvent {
        CrudEvent::Created {
            id: id.to_string(),
            user_id: Some("u1".to_string()),
        }
    }

    #[tokio::test]
    async fn test_publish_and_subscribe() {
        let bus = MemoryEventBus::new();
        let mut receiver = bus.subscribe("app.notes").await;

        bus.publish("app.notes", &created("n1")).await.unwrap();

        assert_eq!(receiver.recv().await.unwrap(), created("n1"));
    }

    #[tokio::test]
    async fn test_topics_are_isolated() {
        let bus = MemoryEventBus::new();
        let mut notes = bus.subscribe("app.notes").await;

        bus.publish("app.users", &created("u1")).await.unwrap();
        bus.publish("app.notes", &created("n1")).await.unwrap();

        assert_eq!(notes.recv().await.unwrap(), created("n1"));
        assert!(notes.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let bus = MemoryEventBus::new();

        assert!(bus.publish("app.notes", &created("n1")).await.is_ok());
    }
}
