use std::fmt;

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Order Value Objects
// ============================================================================

/// Lifecycle state of an order.
///
/// The forward path is `Pending → Confirmed → Received → Preparing → Ready →
/// Delivered`. `Cancelled` is terminal and only recognised, never entered, by
/// this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Received,
    Preparing,
    Ready,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 7] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Received,
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    /// Statuses under which elapsed preparation time is still tracked.
    pub fn is_transitional(self) -> bool {
        matches!(
            self,
            OrderStatus::Pending | OrderStatus::Confirmed | OrderStatus::Received | OrderStatus::Preparing
        )
    }

    /// Position on the kitchen board. Orders closest to pickup come first;
    /// statuses that never appear on the board have no priority.
    pub fn board_priority(self) -> Option<u8> {
        match self {
            OrderStatus::Ready => Some(1),
            OrderStatus::Preparing => Some(2),
            OrderStatus::Received => Some(3),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Confirmed => "CONFIRMED",
            OrderStatus::Received => "RECEIVED",
            OrderStatus::Preparing => "PREPARING",
            OrderStatus::Ready => "READY",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One product line of an order.
///
/// `order_id` is a navigation back-reference only; a line item never lives
/// outside the order that owns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: String,
    pub order_id: Option<String>,
    pub product_id: String,
    pub quantity: u32,
    pub unit_price: BigDecimal,
    pub note: Option<String>,
}

impl LineItem {
    pub fn new(product_id: impl Into<String>, quantity: u32, unit_price: BigDecimal) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            order_id: None,
            product_id: product_id.into(),
            quantity,
            unit_price,
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// `quantity * unit_price`, recomputed on every call.
    pub fn subtotal(&self) -> BigDecimal {
        &self.unit_price * BigDecimal::from(self.quantity)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
