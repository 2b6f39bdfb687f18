use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{CustomerRepository, OrderRepository, RepositoryError};
use crate::domain::customer::{Cpf, Customer};
use crate::domain::order::{Order, OrderStatus};

// ============================================================================
// In-memory repositories
// ============================================================================
//
// Last write wins on `update`; there is no version check.
//
// ============================================================================

#[derive(Default)]
pub struct InMemoryOrderRepository {
    orders: RwLock<HashMap<String, Order>>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn is_empty(&self) -> bool {
        self.orders.read().await.is_empty()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn save(&self, mut order: Order) -> Result<Order, RepositoryError> {
        let id = match order.id() {
            Some(id) => id.to_string(),
            None => Uuid::now_v7().to_string(),
        };
        order.assign_id(id.clone());

        let mut orders = self.orders.write().await;
        if orders.contains_key(&id) {
            return Err(RepositoryError::Conflict(format!("order {id} already exists")));
        }
        orders.insert(id.clone(), order.clone());

        tracing::debug!(order_id = %id, "Stored new order");
        Ok(order)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Order>, RepositoryError> {
        Ok(self.orders.read().await.get(id).cloned())
    }

    async fn update(&self, id: &str, mut order: Order) -> Result<Option<Order>, RepositoryError> {
        let mut orders = self.orders.write().await;
        let Some(slot) = orders.get_mut(id) else {
            return Ok(None);
        };
        order.assign_id(id);
        *slot = order.clone();
        Ok(Some(order))
    }

    async fn find_all_active(&self) -> Result<Vec<Order>, RepositoryError> {
        let orders = self.orders.read().await;
        let mut active: Vec<(u8, Order)> = orders
            .values()
            .filter_map(|o| o.status().board_priority().map(|p| (p, o.clone())))
            .collect();

        active.sort_by(|(pa, a), (pb, b)| pa.cmp(pb).then(a.created_at().cmp(&b.created_at())));
        Ok(active.into_iter().map(|(_, o)| o).collect())
    }

    async fn find_by_status_before(
        &self,
        status: OrderStatus,
        threshold: DateTime<Utc>,
    ) -> Result<Vec<Order>, RepositoryError> {
        let orders = self.orders.read().await;
        let mut matching: Vec<Order> = orders
            .values()
            .filter(|o| o.status() == status && o.created_at() < threshold)
            .cloned()
            .collect();
        matching.sort_by_key(|o| o.created_at());
        Ok(matching)
    }
}

#[derive(Default)]
pub struct InMemoryCustomerRepository {
    customers: RwLock<HashMap<String, Customer>>,
}

impl InMemoryCustomerRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CustomerRepository for InMemoryCustomerRepository {
    async fn save(&self, mut customer: Customer) -> Result<Customer, RepositoryError> {
        let mut customers = self.customers.write().await;
        if customers.values().any(|c| c.cpf == customer.cpf) {
            return Err(RepositoryError::Conflict(format!(
                "customer with CPF {} already exists",
                customer.cpf
            )));
        }
        if customer.id.is_empty() {
            customer.id = Uuid::new_v4().to_string();
        }
        customers.insert(customer.id.clone(), customer.clone());
        Ok(customer)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Customer>, RepositoryError> {
        Ok(self.customers.read().await.get(id).cloned())
    }

    async fn find_by_external_id(&self, cpf: &Cpf) -> Result<Option<Customer>, RepositoryError> {
        Ok(self
            .customers
            .read()
            .await
            .values()
            .find(|c| &c.cpf == cpf)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::LineItem;
    use bigdecimal::BigDecimal;
    use chrono::Duration;

    fn order_created_at(minutes_ago: i64, status: OrderStatus) -> Order {
        let mut order = Order::new(None, vec![LineItem::new("p", 1, BigDecimal::from(10))])
            .with_created_at(Utc::now() - Duration::minutes(minutes_ago));
        order.advance(status);
        order
    }

    #[tokio::test]
    async fn test_save_assigns_identity() {
        let repo = InMemoryOrderRepository::new();
        let saved = repo.save(order_created_at(0, OrderStatus::Pending)).await.unwrap();

        let id = saved.id().unwrap().to_string();
        assert!(saved.items().iter().all(|i| i.order_id.as_deref() == Some(id.as_str())));

        let found = repo.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(found.status(), OrderStatus::Pending);
    }

    #[tokio::test]
    async fn test_update_keeps_created_at() {
        let repo = InMemoryOrderRepository::new();
        let saved = repo.save(order_created_at(30, OrderStatus::Pending)).await.unwrap();
        let id = saved.id().unwrap().to_string();

        let mut loaded = repo.find_by_id(&id).await.unwrap().unwrap();
        loaded.advance(OrderStatus::Confirmed);
        loaded.add_item(LineItem::new("extra", 1, BigDecimal::from(3)));
        repo.update(&id, loaded).await.unwrap().unwrap();

        let stored = repo.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(stored.created_at(), saved.created_at());
        assert!(stored.updated_at() > stored.created_at());
        assert_eq!(stored.status(), OrderStatus::Confirmed);
    }

    #[tokio::test]
    async fn test_update_missing_order_returns_none() {
        let repo = InMemoryOrderRepository::new();
        let result = repo.update("ghost", order_created_at(0, OrderStatus::Pending)).await.unwrap();
        assert!(result.is_none());
        assert!(repo.is_empty().await);
    }

    #[tokio::test]
    async fn test_find_all_active_sorts_by_priority_then_age() {
        let repo = InMemoryOrderRepository::new();
        let received_old = repo.save(order_created_at(50, OrderStatus::Received)).await.unwrap();
        let ready_new = repo.save(order_created_at(5, OrderStatus::Ready)).await.unwrap();
        let preparing = repo.save(order_created_at(20, OrderStatus::Preparing)).await.unwrap();
        let ready_old = repo.save(order_created_at(15, OrderStatus::Ready)).await.unwrap();
        repo.save(order_created_at(60, OrderStatus::Pending)).await.unwrap();
        repo.save(order_created_at(70, OrderStatus::Delivered)).await.unwrap();
        repo.save(order_created_at(80, OrderStatus::Confirmed)).await.unwrap();

        let active = repo.find_all_active().await.unwrap();
        let ids: Vec<_> = active.iter().map(|o| o.id().unwrap()).collect();
        assert_eq!(
            ids,
            vec![
                ready_old.id().unwrap(),
                ready_new.id().unwrap(),
                preparing.id().unwrap(),
                received_old.id().unwrap()
            ]
        );
    }

    #[tokio::test]
    async fn test_find_by_status_before_threshold() {
        let repo = InMemoryOrderRepository::new();
        repo.save(order_created_at(45, OrderStatus::Preparing)).await.unwrap();
        repo.save(order_created_at(5, OrderStatus::Preparing)).await.unwrap();
        repo.save(order_created_at(45, OrderStatus::Ready)).await.unwrap();

        let stale = repo
            .find_by_status_before(OrderStatus::Preparing, Utc::now() - Duration::minutes(30))
            .await
            .unwrap();
        assert_eq!(stale.len(), 1);
    }

    #[tokio::test]
    async fn test_customer_lookup_by_cpf() {
        let repo = InMemoryCustomerRepository::new();
        let cpf = Cpf::parse("111.444.777-35").unwrap();
        let customer = Customer::new("Maria", cpf.clone(), "maria@example.com", "11999990000").unwrap();
        let saved = repo.save(customer).await.unwrap();

        let found = repo.find_by_external_id(&cpf).await.unwrap().unwrap();
        assert_eq!(found.id, saved.id);
        assert!(repo.find_by_id(&saved.id).await.unwrap().is_some());

        let other = Cpf::parse("123.456.789-09").unwrap();
        assert!(repo.find_by_external_id(&other).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_cpf_is_a_conflict() {
        let repo = InMemoryCustomerRepository::new();
        let cpf = Cpf::parse("11144477735").unwrap();
        repo.save(Customer::new("Ana", cpf.clone(), "ana@example.com", "1").unwrap())
            .await
            .unwrap();

        let err = repo
            .save(Customer::new("Ana Clone", cpf, "clone@example.com", "2").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }
}
