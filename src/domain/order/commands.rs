use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use super::value_objects::LineItem;

// ============================================================================
// Order Commands - Represent caller intent
// ============================================================================

/// Request to open a new order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateOrder {
    /// Used as-is when no identity token is supplied.
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub items: Vec<NewLineItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLineItem {
    pub product_id: String,
    pub quantity: u32,
    pub unit_price: BigDecimal,
    #[serde(default)]
    pub note: Option<String>,
}

impl NewLineItem {
    pub fn new(product_id: impl Into<String>, quantity: u32, unit_price: BigDecimal) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
            unit_price,
            note: None,
        }
    }

    pub fn into_line_item(self) -> LineItem {
        let item = LineItem::new(self.product_id, self.quantity, self.unit_price);
        match self.note {
            Some(note) => item.with_note(note),
            None => item,
        }
    }
}
