use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::Stream;
use tokio::sync::mpsc;

use crate::domain::order::{CONFIRMED_DLQ_ROUTING_KEY, CONFIRMED_ROUTING_KEY};

// ============================================================================
// Broker Abstraction
// ============================================================================
//
// Topic-exchange style publish/subscribe. Producers publish bytes under an
// exchange and a routing key; consumers bind a named queue to one routing key
// and receive a stream of deliveries. Dead-letter routing and message TTL are
// carried on the binding and enforced by the queue worker.
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("Broker transport error: {0}")]
    Transport(String),

    #[error("Failed to bind queue {queue}: {reason}")]
    Subscription { queue: String, reason: String },

    #[error("Broker connection closed")]
    Closed,
}

/// A message handed to a consumer.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub routing_key: String,
    pub payload: Vec<u8>,
    pub published_at: DateTime<Utc>,
}

impl Delivery {
    pub fn new(routing_key: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            routing_key: routing_key.into(),
            payload,
            published_at: Utc::now(),
        }
    }

    pub fn with_published_at(mut self, published_at: DateTime<Utc>) -> Self {
        self.published_at = published_at;
        self
    }

    /// Age of the message relative to `now`; never negative.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.published_at).to_std().unwrap_or(Duration::ZERO)
    }
}

pub type DeliveryStream = Pin<Box<dyn Stream<Item = Delivery> + Send>>;

/// Wraps a channel receiver as a delivery stream.
pub fn channel_stream(rx: mpsc::Receiver<Delivery>) -> DeliveryStream {
    Box::pin(futures_util::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|delivery| (delivery, rx))
    }))
}

/// Declares a durable queue bound to one routing key, with its dead-letter
/// route and message TTL.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueBinding {
    pub queue: String,
    pub exchange: String,
    pub routing_key: String,
    pub dead_letter_exchange: String,
    pub dead_letter_routing_key: String,
    pub message_ttl: Duration,
}

impl QueueBinding {
    /// The kitchen's binding for confirmed orders.
    pub fn confirmed_orders(exchange: impl Into<String>, queue: impl Into<String>, message_ttl: Duration) -> Self {
        let exchange = exchange.into();
        Self {
            queue: queue.into(),
            dead_letter_exchange: exchange.clone(),
            exchange,
            routing_key: CONFIRMED_ROUTING_KEY.to_string(),
            dead_letter_routing_key: CONFIRMED_DLQ_ROUTING_KEY.to_string(),
            message_ttl,
        }
    }
}

impl Default for QueueBinding {
    fn default() -> Self {
        Self::confirmed_orders("order.exchange", "order.confirmed", Duration::from_secs(30))
    }
}

#[async_trait]
pub trait MessageBroker: Send + Sync {
    async fn publish(&self, exchange: &str, routing_key: &str, payload: &[u8]) -> Result<(), BrokerError>;

    async fn subscribe(&self, binding: &QueueBinding) -> Result<DeliveryStream, BrokerError>;
}
