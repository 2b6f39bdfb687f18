use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use futures_util::StreamExt;

use crate::metrics::Metrics;

use super::broker::{BrokerError, Delivery, MessageBroker, QueueBinding};

// ============================================================================
// Queue Worker - delivery loop with TTL and dead-lettering
// ============================================================================
//
// Pulls deliveries off a bound queue and hands each one to a handler on its
// own task. A delivery older than the binding's TTL is dead-lettered without
// being handled; a handler error dead-letters the delivery as rejected. The
// original payload is republished unchanged under the dead-letter key.
//
// ============================================================================

pub const EXPIRED_REASON: &str = "expired";
pub const REJECTED_REASON: &str = "rejected";

#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, delivery: &Delivery) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryOutcome {
    Acked,
    DeadLettered { reason: &'static str },
}

pub struct QueueWorker {
    broker: Arc<dyn MessageBroker>,
    binding: QueueBinding,
    handler: Arc<dyn MessageHandler>,
    metrics: Option<Arc<Metrics>>,
}

impl QueueWorker {
    pub fn new(broker: Arc<dyn MessageBroker>, binding: QueueBinding, handler: Arc<dyn MessageHandler>) -> Self {
        Self {
            broker,
            binding,
            handler,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn binding(&self) -> &QueueBinding {
        &self.binding
    }

    /// Handles one delivery to completion.
    pub async fn process(&self, delivery: Delivery) -> DeliveryOutcome {
        let age = delivery.age(Utc::now());
        if age > self.binding.message_ttl {
            tracing::warn!(
                queue = %self.binding.queue,
                age_ms = age.as_millis() as u64,
                ttl_ms = self.binding.message_ttl.as_millis() as u64,
                "Message expired before processing"
            );
            return self.dead_letter(&delivery, EXPIRED_REASON).await;
        }

        match self.handler.handle(&delivery).await {
            Ok(()) => {
                self.record_outcome("acked");
                DeliveryOutcome::Acked
            }
            Err(e) => {
                tracing::error!(
                    queue = %self.binding.queue,
                    error = %e,
                    "Handler rejected message"
                );
                self.dead_letter(&delivery, REJECTED_REASON).await
            }
        }
    }

    /// Consumes the bound queue until the broker closes the stream. Each
    /// delivery runs on its own task.
    pub async fn run(self: Arc<Self>) -> Result<(), BrokerError> {
        let mut stream = self.broker.subscribe(&self.binding).await?;
        tracing::info!(queue = %self.binding.queue, "Queue worker started");

        while let Some(delivery) = stream.next().await {
            let worker = self.clone();
            tokio::spawn(async move {
                worker.process(delivery).await;
            });
        }

        tracing::info!(queue = %self.binding.queue, "Queue worker stopped");
        Ok(())
    }

    async fn dead_letter(&self, delivery: &Delivery, reason: &'static str) -> DeliveryOutcome {
        let dlq_key = &self.binding.dead_letter_routing_key;

        if let Err(e) = self
            .broker
            .publish(&self.binding.dead_letter_exchange, dlq_key, &delivery.payload)
            .await
        {
            tracing::error!(
                routing_key = %dlq_key,
                error = %e,
                "Failed to dead-letter message; it is dropped"
            );
        } else {
            tracing::warn!(routing_key = %dlq_key, reason = reason, "Message dead-lettered");
        }

        if let Some(metrics) = &self.metrics {
            metrics.record_dead_letter(dlq_key, reason);
        }
        self.record_outcome(reason);
        DeliveryOutcome::DeadLettered { reason }
    }

    fn record_outcome(&self, outcome: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.record_consumer_message(outcome);
        }
    }
}
