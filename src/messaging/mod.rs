// ============================================================================
// Messaging - broker plumbing for order lifecycle events
// ============================================================================
//
// - Broker abstraction (MessageBroker, QueueBinding, Delivery)
// - Brokers (in-memory, Redpanda)
// - Publisher (lifecycle event → exchange/routing key)
// - Queue worker (TTL, dead-lettering, per-delivery tasks)
// - Consumer (confirmed orders → RECEIVED, with retry)
//
// ============================================================================

mod broker;
mod consumer;
mod memory;
mod publisher;
mod queue;
mod redpanda;

pub use broker::{channel_stream, BrokerError, Delivery, DeliveryStream, MessageBroker, QueueBinding};
pub use consumer::{ConsumerError, OrderEventConsumer};
pub use memory::{InMemoryBroker, PublishedMessage};
pub use publisher::{EventPublisher, PublishError};
pub use queue::{DeliveryOutcome, MessageHandler, QueueWorker, EXPIRED_REASON, REJECTED_REASON};
pub use redpanda::RedpandaBroker;
