// ============================================================================
// Persistence - repository collaborators
// ============================================================================
//
// The workflow only talks to these traits. State lives entirely behind them;
// nothing in the workflow caches aggregates between calls.
//
// ============================================================================

mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::customer::{Cpf, Customer};
use crate::domain::order::{Order, OrderStatus};

pub use memory::{InMemoryCustomerRepository, InMemoryOrderRepository};

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Persists a new order, assigning its identity.
    async fn save(&self, order: Order) -> Result<Order, RepositoryError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Order>, RepositoryError>;

    /// Replaces the stored order. `None` when no order with `id` exists.
    async fn update(&self, id: &str, order: Order) -> Result<Option<Order>, RepositoryError>;

    /// Orders on the kitchen board (`Received`, `Preparing`, `Ready`), sorted by
    /// board priority and then oldest first.
    async fn find_all_active(&self) -> Result<Vec<Order>, RepositoryError>;

    /// Orders in `status` created strictly before `threshold`.
    async fn find_by_status_before(
        &self,
        status: OrderStatus,
        threshold: DateTime<Utc>,
    ) -> Result<Vec<Order>, RepositoryError>;
}

#[async_trait]
pub trait CustomerRepository: Send + Sync {
    async fn save(&self, customer: Customer) -> Result<Customer, RepositoryError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Customer>, RepositoryError>;

    /// Lookup by the national identifier carried in identity tokens.
    async fn find_by_external_id(&self, cpf: &Cpf) -> Result<Option<Customer>, RepositoryError>;
}
