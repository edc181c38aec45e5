//! OpenSASE Checkout
//!
//! Cart, coupon and order pipeline of the OpenSASE storefront.
//!
//! ## Features
//! - Per-user carts with price snapshots and coupon discounts
//! - Cash checkout with atomic, idempotent stock adjustment
//! - Hosted payment sessions for card checkout
//! - Order status lifecycle with delivery and payment side effects
//! - PostgreSQL or in-memory persistence, NATS event publishing

pub mod config;
pub mod domain;
pub mod http;
pub mod messaging;
pub mod payment;
pub mod services;
pub mod store;

use std::fmt;

use thiserror::Error;

use crate::domain::aggregates::{CartError, OrderError, ProductError};
use crate::domain::value_objects::{OrderId, ProductId, ValueError};
use crate::payment::PaymentError;
use crate::store::StoreError;

// =============================================================================
// Error Types
// =============================================================================

/// Which record a lookup failed to find.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resource {
    Cart,
    CartItem,
    Order,
    Product,
    Coupon,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cart => write!(f, "Cart not found."),
            Self::CartItem => write!(f, "Item not found in cart."),
            Self::Order => write!(f, "Order not found."),
            Self::Product => write!(f, "Product not found."),
            Self::Coupon => write!(f, "Coupon not found."),
        }
    }
}

#[derive(Error, Debug)]
pub enum EcommerceError {
    #[error("{0}")]
    NotFound(Resource),

    #[error("Coupon is invalid or has expired.")]
    InvalidOrExpired,

    #[error("{0}")]
    ValidationFailed(String),

    #[error("Insufficient inventory for product {0}.")]
    InsufficientStock(ProductId),

    #[error(transparent)]
    InvalidTransition(OrderError),

    #[error("Payment service error: {0}")]
    PaymentService(#[from] PaymentError),

    #[error("Stock adjustment failed for order {order_id}: {reason}")]
    StockAdjustmentFailed { order_id: OrderId, reason: String },

    #[error("The record was changed by another request; reload and retry.")]
    ConflictDetected,

    #[error("Storage error: {0}")]
    Storage(StoreError),
}

impl From<StoreError> for EcommerceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict => Self::ConflictDetected,
            other => Self::Storage(other),
        }
    }
}

impl From<ValueError> for EcommerceError {
    fn from(err: ValueError) -> Self { Self::ValidationFailed(err.to_string()) }
}

impl From<ProductError> for EcommerceError {
    fn from(err: ProductError) -> Self { Self::ValidationFailed(err.to_string()) }
}

impl From<CartError> for EcommerceError {
    fn from(err: CartError) -> Self {
        match err {
            CartError::LineNotFound(_) => Self::NotFound(Resource::CartItem),
        }
    }
}

impl From<OrderError> for EcommerceError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::InvalidTransition { .. } => Self::InvalidTransition(err),
            other => Self::ValidationFailed(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, EcommerceError>;
