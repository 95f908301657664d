//! In-process topic bus.
//!
//! Everything published, whether by actions or by ingress, is broadcast to
//! subscribers (the SSE route). Delivery is at-most-once: a slow subscriber
//! that lags loses messages, and publishing with no subscribers is a no-op.

use serde::Serialize;
use tokio::sync::broadcast;
use triggerd_core::context::Publisher;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BusMessage {
    pub topic: String,
    pub payload: String,
}

#[derive(Clone)]
pub struct TopicBus {
    tx: broadcast::Sender<BusMessage>,
}

impl TopicBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BusMessage> {
        self.tx.subscribe()
    }

    pub fn send(&self, topic: &str, payload: String) {
        let receivers = self
            .tx
            .send(BusMessage {
                topic: topic.to_string(),
                payload,
            })
            .unwrap_or(0);
        tracing::debug!(topic, receivers, "published");
    }
}

impl Publisher for TopicBus {
    fn publish(&self, topic: &str, payload: String) -> triggerd_core::Result<()> {
        self.send(topic, payload);
        Ok(())
    }
}
