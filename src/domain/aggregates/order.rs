//! Order Aggregate

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::{Validate, ValidationError};

use crate::domain::aggregates::cart::{Cart, CartLine};
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::pricing::{self, Charges};
use crate::domain::value_objects::{CartId, OrderId, UserId};

/// Purchase record created from a cart at checkout. The line snapshot and
/// amounts are fixed at creation; only payment, delivery and status move.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    id: OrderId,
    #[serde(rename = "user")]
    owner: UserId,
    cart_id: CartId,
    #[serde(rename = "cartItems")]
    lines: Vec<CartLine>,
    shipping_address: ShippingAddress,
    #[serde(rename = "taxPrice")]
    tax_amount: Decimal,
    #[serde(rename = "shippingPrice")]
    shipping_amount: Decimal,
    #[serde(rename = "totalOrderPrice")]
    total_amount: Decimal,
    payment_method: PaymentMethod,
    is_paid: bool,
    paid_at: Option<DateTime<Utc>>,
    status: OrderStatus,
    status_changed_at: Option<DateTime<Utc>>,
    is_delivered: bool,
    delivered_at: Option<DateTime<Utc>>,
    stock_adjusted: bool,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    #[validate(custom = "not_blank")]
    pub details: String,
    #[validate(custom = "phone_number")]
    pub phone: String,
    #[validate(custom = "not_blank")]
    pub city: String,
    #[validate(custom = "not_blank")]
    pub postal_code: String,
}

impl ShippingAddress {
    /// Flat key/value form handed to the payment provider and replayed back on completion.
    pub fn to_metadata(&self) -> Vec<(&'static str, String)> {
        vec![
            ("details", self.details.clone()),
            ("phone", self.phone.clone()),
            ("city", self.city.clone()),
            ("postalCode", self.postal_code.clone()),
        ]
    }
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("required");
        err.message = Some(Cow::from("is required"));
        return Err(err);
    }
    Ok(())
}

fn phone_number(value: &str) -> Result<(), ValidationError> {
    let digits = value.strip_prefix('+').unwrap_or(value);
    if !(7..=15).contains(&digits.len()) || !digits.chars().all(|c| c.is_ascii_digit()) {
        let mut err = ValidationError::new("phone");
        err.message = Some(Cow::from("must be 7 to 15 digits with an optional leading +"));
        return Err(err);
    }
    Ok(())
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod { #[default] Cash, Card }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    #[default]
    Processing,
    Shipped,
    #[serde(rename = "Out for Delivery")]
    OutForDelivery,
    Delivered,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 4] = [Self::Processing, Self::Shipped, Self::OutForDelivery, Self::Delivered];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processing => "Processing",
            Self::Shipped => "Shipped",
            Self::OutForDelivery => "Out for Delivery",
            Self::Delivered => "Delivered",
        }
    }

    /// Forward moves of the lifecycle; skipping ahead is allowed, going back is not.
    pub fn allowed_next(&self) -> &'static [OrderStatus] {
        match self {
            Self::Processing => &[Self::Shipped, Self::OutForDelivery, Self::Delivered],
            Self::Shipped => &[Self::OutForDelivery, Self::Delivered],
            Self::OutForDelivery => &[Self::Delivered],
            Self::Delivered => &[],
        }
    }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool { self.allowed_next().contains(&next) }
    pub fn is_terminal(&self) -> bool { self.allowed_next().is_empty() }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for OrderStatus {
    type Err = OrderError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|status| status.as_str() == s).ok_or_else(|| OrderError::UnknownStatus(s.to_string()))
    }
}

/// How out-of-table status changes are treated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OrderStatusPolicy {
    /// Any status may be set; moves outside the table are only reported.
    #[default]
    Lenient,
    ForwardOnly,
}

impl FromStr for OrderStatusPolicy {
    type Err = OrderError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lenient" => Ok(Self::Lenient),
            "forward-only" | "forward_only" => Ok(Self::ForwardOnly),
            other => Err(OrderError::UnknownPolicy(other.to_string())),
        }
    }
}

/// Result of [`Order::update_status`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusChange {
    Unchanged,
    Changed { from: OrderStatus, to: OrderStatus, out_of_order: bool },
}

impl Order {
    /// Snapshots `cart` into a new order priced at the cart's payable total plus `charges`.
    pub fn place(cart: &Cart, shipping_address: ShippingAddress, charges: Charges, payment_method: PaymentMethod) -> Self {
        let now = Utc::now();
        let total_amount = pricing::order_total(cart.payable_total(), &charges);
        let mut order = Self {
            id: OrderId::new(), owner: cart.owner(), cart_id: cart.id(), lines: cart.lines().to_vec(),
            shipping_address, tax_amount: charges.tax, shipping_amount: charges.shipping, total_amount,
            payment_method, is_paid: false, paid_at: None, status: OrderStatus::Processing,
            status_changed_at: None, is_delivered: false, delivered_at: None, stock_adjusted: false,
            version: 0, created_at: now, updated_at: now, events: vec![],
        };
        order.raise_event(DomainEvent::Order(OrderEvent::Placed {
            order_id: order.id, owner: order.owner, cart_id: order.cart_id, total: total_amount, payment_method,
        }));
        order
    }

    pub fn id(&self) -> OrderId { self.id }
    pub fn owner(&self) -> UserId { self.owner }
    pub fn cart_id(&self) -> CartId { self.cart_id }
    pub fn lines(&self) -> &[CartLine] { &self.lines }
    pub fn shipping_address(&self) -> &ShippingAddress { &self.shipping_address }
    pub fn tax_amount(&self) -> Decimal { self.tax_amount }
    pub fn shipping_amount(&self) -> Decimal { self.shipping_amount }
    pub fn total_amount(&self) -> Decimal { self.total_amount }
    pub fn payment_method(&self) -> PaymentMethod { self.payment_method }
    pub fn is_paid(&self) -> bool { self.is_paid }
    pub fn paid_at(&self) -> Option<DateTime<Utc>> { self.paid_at }
    pub fn status(&self) -> OrderStatus { self.status }
    pub fn status_changed_at(&self) -> Option<DateTime<Utc>> { self.status_changed_at }
    pub fn is_delivered(&self) -> bool { self.is_delivered }
    pub fn delivered_at(&self) -> Option<DateTime<Utc>> { self.delivered_at }
    pub fn stock_adjusted(&self) -> bool { self.stock_adjusted }
    pub fn version(&self) -> u64 { self.version }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }

    pub fn mark_paid(&mut self, at: DateTime<Utc>) {
        if self.is_paid { return; }
        self.is_paid = true;
        self.paid_at = Some(at);
        self.touch();
        self.raise_event(DomainEvent::Order(OrderEvent::Paid { order_id: self.id, at }));
    }

    pub fn mark_stock_adjusted(&mut self) { self.stock_adjusted = true; self.touch(); }

    /// Moves the order to `next`. Setting the current status again changes nothing.
    /// Reaching `Delivered` marks delivery and, for cash orders, payment.
    pub fn update_status(&mut self, next: OrderStatus, policy: OrderStatusPolicy, now: DateTime<Utc>) -> Result<StatusChange, OrderError> {
        let from = self.status;
        if from == next { return Ok(StatusChange::Unchanged); }
        let out_of_order = !from.can_transition_to(next);
        if out_of_order && policy == OrderStatusPolicy::ForwardOnly {
            return Err(OrderError::InvalidTransition { from, to: next });
        }

        self.status = next;
        self.status_changed_at = Some(now);
        self.touch();
        self.raise_event(DomainEvent::Order(OrderEvent::StatusChanged { order_id: self.id, from, to: next, at: now }));

        if next == OrderStatus::Delivered {
            self.is_delivered = true;
            self.delivered_at = Some(now);
            self.raise_event(DomainEvent::Order(OrderEvent::Delivered { order_id: self.id, at: now }));
            if self.payment_method == PaymentMethod::Cash {
                let newly_paid = !self.is_paid;
                self.is_paid = true;
                self.paid_at = Some(now);
                if newly_paid { self.raise_event(DomainEvent::Order(OrderEvent::Paid { order_id: self.id, at: now })); }
            }
        }
        Ok(StatusChange::Changed { from, to: next, out_of_order })
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    pub(crate) fn bump_version(&mut self) { self.version += 1; }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    #[error("Cannot move order from {from} to {to}.")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
    #[error("Invalid status value: {0}")]
    UnknownStatus(String),
    #[error("Unknown order status policy: {0}")]
    UnknownPolicy(String),
}
