use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use rdkafka::{
    config::ClientConfig,
    consumer::{CommitMode, Consumer, StreamConsumer},
    message::Message,
    producer::{FutureProducer, FutureRecord},
    util::Timeout,
};
use tokio::sync::mpsc;

use super::broker::{channel_stream, BrokerError, Delivery, DeliveryStream, MessageBroker, QueueBinding};

const SEND_TIMEOUT: Duration = Duration::from_secs(5);
const SUBSCRIPTION_BUFFER: usize = 256;

/// Kafka-compatible broker backed by Redpanda.
///
/// Each routing key maps to a topic of the same name; the exchange travels
/// as the record key. A queue binding becomes a consumer group named after
/// the queue, with offsets committed only after the delivery has been handed
/// to the subscriber.
pub struct RedpandaBroker {
    brokers: String,
    producer: FutureProducer,
}

impl RedpandaBroker {
    pub fn new(brokers: &str) -> Result<Self, BrokerError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", "5000")
            .create()
            .map_err(|e| BrokerError::Transport(format!("Failed to create Redpanda producer: {e}")))?;

        Ok(Self {
            brokers: brokers.to_string(),
            producer,
        })
    }

    fn consumer_for(&self, binding: &QueueBinding) -> Result<StreamConsumer, BrokerError> {
        ClientConfig::new()
            .set("bootstrap.servers", &self.brokers)
            .set("group.id", &binding.queue)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest")
            .set("session.timeout.ms", "6000")
            .create()
            .map_err(|e| BrokerError::Subscription {
                queue: binding.queue.clone(),
                reason: format!("Failed to create consumer: {e}"),
            })
    }
}

#[async_trait]
impl MessageBroker for RedpandaBroker {
    async fn publish(&self, exchange: &str, routing_key: &str, payload: &[u8]) -> Result<(), BrokerError> {
        let record = FutureRecord::to(routing_key).key(exchange).payload(payload);

        self.producer
            .send(record, Timeout::After(SEND_TIMEOUT))
            .await
            .map_err(|(e, _)| {
                tracing::error!(error = %e, topic = %routing_key, "Failed to publish to Redpanda");
                BrokerError::Transport(format!("Kafka send error: {e}"))
            })?;

        tracing::debug!(topic = %routing_key, key = %exchange, "Published to Redpanda");
        Ok(())
    }

    async fn subscribe(&self, binding: &QueueBinding) -> Result<DeliveryStream, BrokerError> {
        let consumer = self.consumer_for(binding)?;
        consumer
            .subscribe(&[binding.routing_key.as_str()])
            .map_err(|e| BrokerError::Subscription {
                queue: binding.queue.clone(),
                reason: format!("Failed to subscribe to topic: {e}"),
            })?;

        tracing::info!(
            queue = %binding.queue,
            topic = %binding.routing_key,
            "Subscribed to Redpanda topic"
        );

        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        tokio::spawn(async move {
            let mut stream = consumer.stream();

            while let Some(result) = stream.next().await {
                let message = match result {
                    Ok(message) => message,
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to receive message from Redpanda");
                        continue;
                    }
                };

                let published_at = message
                    .timestamp()
                    .to_millis()
                    .and_then(DateTime::from_timestamp_millis)
                    .unwrap_or_else(Utc::now);
                let delivery = Delivery::new(message.topic(), message.payload().unwrap_or_default().to_vec())
                    .with_published_at(published_at);

                if tx.send(delivery).await.is_err() {
                    tracing::debug!("Delivery receiver dropped, stopping Redpanda consumer");
                    break;
                }

                if let Err(e) = consumer.commit_message(&message, CommitMode::Async) {
                    tracing::warn!(
                        topic = message.topic(),
                        partition = message.partition(),
                        offset = message.offset(),
                        error = %e,
                        "Failed to commit offset (message may be redelivered)"
                    );
                }
            }

            tracing::debug!("Redpanda consumer task exiting");
        });

        Ok(channel_stream(rx))
    }
}
