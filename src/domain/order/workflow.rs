use std::sync::Arc;

use bigdecimal::BigDecimal;
use chrono::Utc;

use crate::domain::customer::Cpf;
use crate::identity::IdentityToken;
use crate::messaging::EventPublisher;
use crate::metrics::Metrics;
use crate::persistence::{CustomerRepository, OrderRepository};

use super::aggregate::Order;
use super::commands::{CreateOrder, NewLineItem};
use super::errors::OrderError;
use super::events::LifecycleEvent;
use super::transitions::{Transition, TransitionTable};
use super::value_objects::OrderStatus;

// ============================================================================
// Order Workflow Service
// ============================================================================
//
// Orchestrates: load → check transition table → advance → update → publish
//
// Persistence happens before the publish attempt. A failed publish is logged
// and counted but never undoes or fails the committed transition.
//
// ============================================================================

pub struct OrderWorkflowService {
    orders: Arc<dyn OrderRepository>,
    customers: Arc<dyn CustomerRepository>,
    publisher: Arc<EventPublisher>,
    transitions: TransitionTable,
    metrics: Option<Arc<Metrics>>,
}

impl OrderWorkflowService {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        customers: Arc<dyn CustomerRepository>,
        publisher: Arc<EventPublisher>,
    ) -> Self {
        Self {
            orders,
            customers,
            publisher,
            transitions: TransitionTable::kitchen(),
            metrics: None,
        }
    }

    pub fn with_transitions(mut self, transitions: TransitionTable) -> Self {
        self.transitions = transitions;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn transitions(&self) -> &TransitionTable {
        &self.transitions
    }

    /// Validates the items, resolves the customer from `identity_token` when
    /// one is given and stores a new `PENDING` order.
    pub async fn create_order(&self, command: CreateOrder, identity_token: Option<&str>) -> Result<Order, OrderError> {
        validate_items(&command.items)?;

        let customer_id = match identity_token {
            Some(token) => Some(self.resolve_customer(token).await?),
            None => command.customer_id,
        };

        let items = command.items.into_iter().map(NewLineItem::into_line_item).collect();
        let order = self.orders.save(Order::new(customer_id, items)).await?;

        tracing::info!(
            order_id = order.id().unwrap_or_default(),
            customer_id = order.customer_id().unwrap_or("anonymous"),
            total = %order.total(),
            "Order created"
        );
        Ok(order)
    }

    pub async fn find_by_id(&self, order_id: &str) -> Result<Order, OrderError> {
        self.orders
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| OrderError::NotFound(order_id.to_string()))
    }

    /// Orders on the kitchen board, most urgent first.
    pub async fn list_active(&self) -> Result<Vec<Order>, OrderError> {
        Ok(self.orders.find_all_active().await?)
    }

    /// Orders in `status` created more than `older_than` ago.
    pub async fn stale_orders(&self, status: OrderStatus, older_than: chrono::Duration) -> Result<Vec<Order>, OrderError> {
        // a window reaching past the earliest representable instant matches nothing
        let Some(threshold) = Utc::now().checked_sub_signed(older_than) else {
            return Ok(Vec::new());
        };
        Ok(self.orders.find_by_status_before(status, threshold).await?)
    }

    pub async fn confirm(&self, order_id: &str) -> Result<Order, OrderError> {
        self.apply(order_id, Transition::Confirm).await
    }

    pub async fn receive_confirmed(&self, order_id: &str) -> Result<Order, OrderError> {
        self.apply(order_id, Transition::ReceiveConfirmed).await
    }

    pub async fn start_preparation(&self, order_id: &str) -> Result<Order, OrderError> {
        self.apply(order_id, Transition::StartPreparation).await
    }

    pub async fn mark_ready(&self, order_id: &str) -> Result<Order, OrderError> {
        self.apply(order_id, Transition::MarkReady).await
    }

    pub async fn mark_delivered(&self, order_id: &str) -> Result<Order, OrderError> {
        self.apply(order_id, Transition::MarkDelivered).await
    }

    async fn apply(&self, order_id: &str, transition: Transition) -> Result<Order, OrderError> {
        let mut order = self.find_by_id(order_id).await?;
        let rule = *self.transitions.resolve(order_id, transition, order.status())?;

        order.advance(rule.to);
        let order = self
            .orders
            .update(order_id, order)
            .await?
            .ok_or_else(|| OrderError::NotFound(order_id.to_string()))?;

        if let Some(metrics) = &self.metrics {
            metrics.record_transition(rule.to.as_str());
        }
        tracing::info!(
            order_id = %order_id,
            transition = %transition,
            from = %rule.from,
            to = %rule.to,
            "Order status changed"
        );

        let event = LifecycleEvent::from_order(rule.event, order_id, &order);
        if let Err(e) = self.publisher.publish(&event).await {
            tracing::error!(
                order_id = %order_id,
                routing_key = %event.routing_key(),
                error = %e,
                "Lifecycle event dropped; transition stays committed"
            );
        }

        Ok(order)
    }

    async fn resolve_customer(&self, token: &str) -> Result<String, OrderError> {
        let claims = IdentityToken::decode(token)?;
        let cpf = Cpf::parse(&claims.cpf).map_err(|e| OrderError::InvalidCustomerId(e.to_string()))?;

        let customer = self
            .customers
            .find_by_external_id(&cpf)
            .await?
            .ok_or_else(|| OrderError::CustomerNotFound(cpf.to_string()))?;

        tracing::debug!(customer_id = %customer.id, "Resolved customer from identity token");
        Ok(customer.id)
    }
}

fn validate_items(items: &[NewLineItem]) -> Result<(), OrderError> {
    if items.is_empty() {
        return Err(OrderError::InvalidItems("an order needs at least one item".to_string()));
    }

    let zero = BigDecimal::from(0);
    for item in items {
        if item.quantity == 0 {
            return Err(OrderError::InvalidItems(format!(
                "quantity for {} must be positive",
                item.product_id
            )));
        }
        if item.unit_price < zero {
            return Err(OrderError::InvalidItems(format!(
                "unit price for {} cannot be negative",
                item.product_id
            )));
        }
    }
    Ok(())
}
