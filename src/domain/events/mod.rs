//! Domain events
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::aggregates::order::{OrderStatus, PaymentMethod};
use crate::domain::value_objects::{CartId, OrderId, UserId};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "aggregate", content = "event", rename_all = "snake_case")]
pub enum DomainEvent {
    Order(OrderEvent),
}

impl DomainEvent {
    /// Routing key suffix, e.g. `orders.placed`.
    pub fn subject(&self) -> String {
        match self {
            Self::Order(event) => format!("orders.{}", event.kind()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEvent {
    Placed { order_id: OrderId, owner: UserId, cart_id: CartId, total: Decimal, payment_method: PaymentMethod },
    StatusChanged { order_id: OrderId, from: OrderStatus, to: OrderStatus, at: DateTime<Utc> },
    Delivered { order_id: OrderId, at: DateTime<Utc> },
    Paid { order_id: OrderId, at: DateTime<Utc> },
    StockAdjustmentFailed { order_id: OrderId, reason: String },
}

impl OrderEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Placed { .. } => "placed",
            Self::StatusChanged { .. } => "status_changed",
            Self::Delivered { .. } => "delivered",
            Self::Paid { .. } => "paid",
            Self::StockAdjustmentFailed { .. } => "stock_adjustment_failed",
        }
    }
}
