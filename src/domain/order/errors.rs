use super::value_objects::OrderStatus;
use crate::persistence::RepositoryError;

// ============================================================================
// Order Business Rule Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("Order not found: {0}")]
    NotFound(String),

    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    #[error("Order {order_id} must be {expected} for this operation, but is {actual}")]
    InvalidStatusTransition {
        order_id: String,
        expected: OrderStatus,
        actual: OrderStatus,
    },

    #[error("Transition {transition} is not configured for order {order_id}")]
    TransitionNotConfigured { order_id: String, transition: String },

    #[error("Invalid order items: {0}")]
    InvalidItems(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid customer identifier: {0}")]
    InvalidCustomerId(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
