use bigdecimal::BigDecimal;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use super::value_objects::{LineItem, OrderStatus};

// ============================================================================
// Order Aggregate
// ============================================================================
//
// Pure data holder with mutation primitives. Status ordering rules are not
// checked here; the workflow service consults its transition table before
// calling `advance`.
//
// Invariant: `total` always equals the sum of the line item subtotals.
//
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct Order {
    // Identity, assigned by the repository on first save
    id: Option<String>,

    customer_id: Option<String>,
    status: OrderStatus,
    items: Vec<LineItem>,
    total: BigDecimal,

    // Audit Trail
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Order {
    /// A new, unsaved order in `Pending` status.
    pub fn new(customer_id: Option<String>, items: Vec<LineItem>) -> Self {
        let now = Utc::now();
        let mut order = Self {
            id: None,
            customer_id,
            status: OrderStatus::Pending,
            items: Vec::new(),
            total: BigDecimal::from(0),
            created_at: now,
            updated_at: now,
        };
        order.set_items(items);
        order.updated_at = order.created_at;
        order
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn customer_id(&self) -> Option<&str> {
        self.customer_id.as_deref()
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn total(&self) -> &BigDecimal {
        &self.total
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Binds the persistence identity and points every line item back at it.
    pub fn assign_id(&mut self, id: impl Into<String>) {
        let id = id.into();
        for item in &mut self.items {
            item.order_id = Some(id.clone());
        }
        self.id = Some(id);
    }

    /// Links the order to a resolved customer.
    pub fn assign_customer(&mut self, customer_id: impl Into<String>) {
        self.customer_id = Some(customer_id.into());
        self.touch();
    }

    /// Backdates creation of an unsaved order.
    #[cfg(test)]
    pub(crate) fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        if self.updated_at < created_at {
            self.updated_at = created_at;
        }
        self
    }

    /// Overwrites the status unconditionally and refreshes `updated_at`.
    pub fn advance(&mut self, target: OrderStatus) {
        self.status = target;
        self.touch();
    }

    /// Time spent since creation while the order is still being worked on;
    /// zero once it is ready, delivered or cancelled.
    pub fn elapsed_preparation_time(&self, now: DateTime<Utc>) -> Duration {
        match self.status {
            OrderStatus::Ready | OrderStatus::Delivered | OrderStatus::Cancelled => Duration::zero(),
            _ => (now - self.created_at).max(Duration::zero()),
        }
    }

    pub fn set_items(&mut self, items: Vec<LineItem>) {
        self.items = items;
        if let Some(id) = &self.id {
            for item in &mut self.items {
                item.order_id = Some(id.clone());
            }
        }
        self.recalculate_total();
    }

    pub fn add_item(&mut self, mut item: LineItem) {
        item.order_id = self.id.clone();
        self.items.push(item);
        self.recalculate_total();
    }

    /// Removing an unknown item id is a no-op.
    pub fn remove_item(&mut self, item_id: &str) {
        let before = self.items.len();
        self.items.retain(|item| item.id != item_id);
        if self.items.len() != before {
            self.recalculate_total();
        }
    }

    fn recalculate_total(&mut self) {
        self.total = self
            .items
            .iter()
            .fold(BigDecimal::from(0), |acc, item| acc + item.subtotal());
        self.touch();
    }

    // updated_at never moves backwards, even if the wall clock does
    fn touch(&mut self) {
        let now = Utc::now();
        if now > self.updated_at {
            self.updated_at = now;
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
