use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::aggregate::Order;

// ============================================================================
// Order Lifecycle Events - what downstream subsystems hear about
// ============================================================================

pub const CONFIRMED_ROUTING_KEY: &str = "order.status.confirmed";
pub const RECEIVED_ROUTING_KEY: &str = "order.status.received";
pub const PREPARING_ROUTING_KEY: &str = "order.status.preparing";
pub const READY_ROUTING_KEY: &str = "order.status.ready";
pub const DELIVERED_ROUTING_KEY: &str = "order.status.delivered";
pub const CONFIRMED_DLQ_ROUTING_KEY: &str = "order.status.confirmed.dlq";

/// Kind of lifecycle event; each kind owns one routing key on the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Confirmed,
    Received,
    Preparing,
    Ready,
    Delivered,
}

impl EventKind {
    pub fn routing_key(self) -> &'static str {
        match self {
            EventKind::Confirmed => CONFIRMED_ROUTING_KEY,
            EventKind::Received => RECEIVED_ROUTING_KEY,
            EventKind::Preparing => PREPARING_ROUTING_KEY,
            EventKind::Ready => READY_ROUTING_KEY,
            EventKind::Delivered => DELIVERED_ROUTING_KEY,
        }
    }

    /// Confirmed and received events ship the full item list and total.
    pub fn carries_details(self) -> bool {
        matches!(self, EventKind::Confirmed | EventKind::Received)
    }
}

// ============================================================================
// Payloads
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventItem {
    pub product_id: String,
    pub quantity: u32,
    pub unit_price: BigDecimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Full order snapshot carried by `confirmed` and `received` events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDetails {
    pub order_id: String,
    pub customer_id: Option<String>,
    pub items: Vec<EventItem>,
    pub total: BigDecimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderReference {
    pub order_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventPayload {
    Details(OrderDetails),
    Reference(OrderReference),
}

impl EventPayload {
    pub fn order_id(&self) -> &str {
        match self {
            EventPayload::Details(d) => &d.order_id,
            EventPayload::Reference(r) => &r.order_id,
        }
    }
}

/// A lifecycle event ready to be handed to the publisher.
#[derive(Debug, Clone, PartialEq)]
pub struct LifecycleEvent {
    pub kind: EventKind,
    pub payload: EventPayload,
}

impl LifecycleEvent {
    /// Builds the payload shape that matches `kind` from the persisted order.
    pub fn from_order(kind: EventKind, order_id: &str, order: &Order) -> Self {
        let payload = if kind.carries_details() {
            EventPayload::Details(OrderDetails {
                order_id: order_id.to_string(),
                customer_id: order.customer_id().map(str::to_string),
                items: order
                    .items()
                    .iter()
                    .map(|item| EventItem {
                        product_id: item.product_id.clone(),
                        quantity: item.quantity,
                        unit_price: item.unit_price.clone(),
                        note: item.note.clone(),
                    })
                    .collect(),
                total: order.total().clone(),
            })
        } else {
            EventPayload::Reference(OrderReference {
                order_id: order_id.to_string(),
            })
        };
        Self { kind, payload }
    }

    pub fn routing_key(&self) -> &'static str {
        self.kind.routing_key()
    }

    pub fn order_id(&self) -> &str {
        self.payload.order_id()
    }
}

/// Wire form: the payload fields plus a server-side timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMessage<P> {
    #[serde(flatten)]
    pub payload: P,
    pub timestamp: DateTime<Utc>,
}

impl<P> EventMessage<P> {
    pub fn stamped(payload: P) -> Self {
        Self {
            payload,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::LineItem;
    use std::str::FromStr;

    fn order() -> Order {
        let mut order = Order::new(
            Some("customer-456".into()),
            vec![LineItem::new("product-1", 2, BigDecimal::from_str("15.0").unwrap()).with_note("no onions")],
        );
        order.assign_id("order-123");
        order
    }

    #[test]
    fn test_routing_keys() {
        assert_eq!(EventKind::Confirmed.routing_key(), "order.status.confirmed");
        assert_eq!(EventKind::Received.routing_key(), "order.status.received");
        assert_eq!(EventKind::Preparing.routing_key(), "order.status.preparing");
        assert_eq!(EventKind::Ready.routing_key(), "order.status.ready");
        assert_eq!(EventKind::Delivered.routing_key(), "order.status.delivered");
    }

    #[test]
    fn test_detailed_payload_for_confirmed_and_received() {
        for kind in [EventKind::Confirmed, EventKind::Received] {
            let event = LifecycleEvent::from_order(kind, "order-123", &order());
            match &event.payload {
                EventPayload::Details(details) => {
                    assert_eq!(details.order_id, "order-123");
                    assert_eq!(details.customer_id.as_deref(), Some("customer-456"));
                    assert_eq!(details.items.len(), 1);
                    assert_eq!(details.items[0].note.as_deref(), Some("no onions"));
                    assert_eq!(details.total, BigDecimal::from(30));
                }
                other => panic!("expected details, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_reference_payload_for_other_kinds() {
        for kind in [EventKind::Preparing, EventKind::Ready, EventKind::Delivered] {
            let event = LifecycleEvent::from_order(kind, "order-123", &order());
            assert_eq!(
                event.payload,
                EventPayload::Reference(OrderReference { order_id: "order-123".into() })
            );
        }
    }

    #[test]
    fn test_wire_format_flattens_payload() {
        let event = LifecycleEvent::from_order(EventKind::Ready, "order-123", &order());
        let json = serde_json::to_value(EventMessage::stamped(&event.payload)).unwrap();

        let object = json.as_object().unwrap();
        assert_eq!(object.len(), 2);
        assert_eq!(object["order_id"], "order-123");
        assert!(object.contains_key("timestamp"));
    }

    #[test]
    fn test_confirmed_message_decodes_as_details() {
        let event = LifecycleEvent::from_order(EventKind::Confirmed, "order-123", &order());
        let bytes = serde_json::to_vec(&EventMessage::stamped(&event.payload)).unwrap();

        let decoded: EventMessage<OrderDetails> = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decoded.payload.order_id, "order-123");
        assert_eq!(decoded.payload.total, BigDecimal::from(30));
    }
}
