use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::order::{EventMessage, Order, OrderDetails, OrderError, OrderWorkflowService, Transition};
use crate::utils::{RetryExecutor, RetryExhausted};

use super::broker::Delivery;
use super::queue::MessageHandler;

#[derive(Debug, thiserror::Error)]
pub enum ConsumerError {
    #[error("Failed to decode confirmed-order message: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    RetryExhausted(#[from] RetryExhausted<OrderError>),
}

/// Kitchen-side consumer for `order.status.confirmed`.
///
/// Moves the order to `RECEIVED` under the retry executor. Exhausted retries
/// propagate to the queue worker, which owns dead-lettering.
pub struct OrderEventConsumer {
    workflow: Arc<OrderWorkflowService>,
    retry: RetryExecutor,
}

impl OrderEventConsumer {
    pub fn new(workflow: Arc<OrderWorkflowService>, retry: RetryExecutor) -> Self {
        Self { workflow, retry }
    }

    pub async fn handle_confirmed(&self, delivery: &Delivery) -> Result<Order, ConsumerError> {
        let message: EventMessage<OrderDetails> = serde_json::from_slice(&delivery.payload)?;
        let order_id = message.payload.order_id;

        tracing::info!(order_id = %order_id, published_at = %message.timestamp, "Received confirmed order");

        let order = self
            .retry
            .execute(Transition::ReceiveConfirmed.name(), |attempt| {
                let workflow = self.workflow.clone();
                let order_id = order_id.clone();
                async move {
                    tracing::debug!(order_id = %order_id, attempt = attempt, "Moving order to RECEIVED");
                    workflow.receive_confirmed(&order_id).await
                }
            })
            .await?;

        Ok(order)
    }
}

#[async_trait]
impl MessageHandler for OrderEventConsumer {
    async fn handle(&self, delivery: &Delivery) -> anyhow::Result<()> {
        self.handle_confirmed(delivery).await?;
        Ok(())
    }
}
