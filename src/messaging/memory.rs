use std::collections::HashSet;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{mpsc, Mutex};

use super::broker::{channel_stream, BrokerError, Delivery, DeliveryStream, MessageBroker, QueueBinding};

const SUBSCRIPTION_BUFFER: usize = 256;

/// One call to `publish`, successful or not.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedMessage {
    pub exchange: String,
    pub routing_key: String,
    pub payload: Vec<u8>,
}

impl PublishedMessage {
    pub fn json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::from_slice(&self.payload)
    }
}

struct Subscription {
    exchange: String,
    routing_key: String,
    sender: mpsc::Sender<Delivery>,
}

#[derive(Default)]
struct BrokerState {
    attempts: Vec<PublishedMessage>,
    published: Vec<PublishedMessage>,
    subscriptions: Vec<Subscription>,
    fail_next: usize,
    failing_keys: HashSet<String>,
}

/// Process-local broker. Routes by exact routing key and records every
/// publish attempt so callers can inspect what went out.
#[derive(Default)]
pub struct InMemoryBroker {
    state: Mutex<BrokerState>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `n` publishes fail with a transport error.
    pub async fn fail_next_publishes(&self, n: usize) {
        self.state.lock().await.fail_next = n;
    }

    /// Every publish on `routing_key` fails until cleared.
    pub async fn fail_routing_key(&self, routing_key: impl Into<String>) {
        self.state.lock().await.failing_keys.insert(routing_key.into());
    }

    pub async fn clear_failures(&self) {
        let mut state = self.state.lock().await;
        state.fail_next = 0;
        state.failing_keys.clear();
    }

    /// Every publish call in order, including rejected ones.
    pub async fn attempts(&self) -> Vec<PublishedMessage> {
        self.state.lock().await.attempts.clone()
    }

    /// Messages the broker accepted.
    pub async fn published(&self) -> Vec<PublishedMessage> {
        self.state.lock().await.published.clone()
    }

    pub async fn published_to(&self, routing_key: &str) -> Vec<PublishedMessage> {
        self.state
            .lock()
            .await
            .published
            .iter()
            .filter(|m| m.routing_key == routing_key)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl MessageBroker for InMemoryBroker {
    async fn publish(&self, exchange: &str, routing_key: &str, payload: &[u8]) -> Result<(), BrokerError> {
        let message = PublishedMessage {
            exchange: exchange.to_string(),
            routing_key: routing_key.to_string(),
            payload: payload.to_vec(),
        };

        let senders = {
            let mut state = self.state.lock().await;
            state.attempts.push(message.clone());

            if state.fail_next > 0 {
                state.fail_next -= 1;
                return Err(BrokerError::Transport(format!("injected failure publishing {routing_key}")));
            }
            if state.failing_keys.contains(routing_key) {
                return Err(BrokerError::Transport(format!("routing key {routing_key} is unavailable")));
            }

            state.published.push(message);
            state.subscriptions.retain(|s| !s.sender.is_closed());
            state
                .subscriptions
                .iter()
                .filter(|s| s.exchange == exchange && s.routing_key == routing_key)
                .map(|s| s.sender.clone())
                .collect::<Vec<_>>()
        };

        let delivery = Delivery::new(routing_key, payload.to_vec()).with_published_at(Utc::now());
        for sender in senders {
            if sender.send(delivery.clone()).await.is_err() {
                tracing::debug!(routing_key = %routing_key, "Subscriber dropped before delivery");
            }
        }

        tracing::debug!(exchange = %exchange, routing_key = %routing_key, "Published to in-memory broker");
        Ok(())
    }

    async fn subscribe(&self, binding: &QueueBinding) -> Result<DeliveryStream, BrokerError> {
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        self.state.lock().await.subscriptions.push(Subscription {
            exchange: binding.exchange.clone(),
            routing_key: binding.routing_key.clone(),
            sender: tx,
        });

        tracing::info!(
            queue = %binding.queue,
            routing_key = %binding.routing_key,
            "Bound in-memory queue"
        );
        Ok(channel_stream(rx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use std::time::Duration;

    #[tokio::test]
    async fn test_subscription_receives_matching_routing_key_only() {
        let broker = InMemoryBroker::new();
        let mut stream = broker.subscribe(&QueueBinding::default()).await.unwrap();

        broker.publish("order.exchange", "order.status.ready", b"{}").await.unwrap();
        broker
            .publish("order.exchange", "order.status.confirmed", br#"{"orderId":"1"}"#)
            .await
            .unwrap();

        let delivery = tokio::time::timeout(Duration::from_secs(1), stream.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(delivery.routing_key, "order.status.confirmed");
        assert_eq!(delivery.payload, br#"{"orderId":"1"}"#.to_vec());
        assert_eq!(broker.published().await.len(), 2);
    }

    #[tokio::test]
    async fn test_injected_failures_are_recorded_as_attempts() {
        let broker = InMemoryBroker::new();
        broker.fail_next_publishes(1).await;

        let first = broker.publish("x", "order.status.ready", b"1").await;
        let second = broker.publish("x", "order.status.ready", b"2").await;

        assert!(matches!(first, Err(BrokerError::Transport(_))));
        assert!(second.is_ok());
        assert_eq!(broker.attempts().await.len(), 2);
        assert_eq!(broker.published().await.len(), 1);
        assert_eq!(broker.published_to("order.status.ready").await[0].payload, b"2".to_vec());
    }

    #[tokio::test]
    async fn test_failing_routing_key() {
        let broker = InMemoryBroker::new();
        broker.fail_routing_key("order.status.delivered").await;

        assert!(broker.publish("x", "order.status.delivered", b"").await.is_err());
        assert!(broker.publish("x", "order.status.ready", b"").await.is_ok());

        broker.clear_failures().await;
        assert!(broker.publish("x", "order.status.delivered", b"").await.is_ok());
    }
}
