use std::sync::Arc;

use crate::domain::order::{EventMessage, LifecycleEvent};
use crate::metrics::Metrics;

use super::broker::{BrokerError, MessageBroker};

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Failed to serialize event: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to publish {routing_key}: {source}")]
    Transport {
        routing_key: String,
        #[source]
        source: BrokerError,
    },
}

/// Serializes lifecycle events and hands them to the broker on one exchange.
pub struct EventPublisher {
    broker: Arc<dyn MessageBroker>,
    exchange: String,
    metrics: Option<Arc<Metrics>>,
}

impl EventPublisher {
    pub fn new(broker: Arc<dyn MessageBroker>, exchange: impl Into<String>) -> Self {
        Self {
            broker,
            exchange: exchange.into(),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn exchange(&self) -> &str {
        &self.exchange
    }

    pub async fn publish(&self, event: &LifecycleEvent) -> Result<(), PublishError> {
        let routing_key = event.routing_key();
        let body = serde_json::to_vec(&EventMessage::stamped(&event.payload))?;

        let result = self
            .broker
            .publish(&self.exchange, routing_key, &body)
            .await
            .map_err(|source| PublishError::Transport {
                routing_key: routing_key.to_string(),
                source,
            });

        if let Some(metrics) = &self.metrics {
            metrics.record_publish(routing_key, result.is_ok());
        }

        if result.is_ok() {
            tracing::info!(
                order_id = %event.order_id(),
                routing_key = %routing_key,
                exchange = %self.exchange,
                "Published lifecycle event"
            );
        }
        result
    }
}
