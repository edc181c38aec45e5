//! Persistence seams for the checkout pipeline.
//!
//! Carts and orders are written with compare-and-swap on their `version`:
//! a save succeeds only if the stored version still equals the version the
//! caller loaded, otherwise [`StoreError::Conflict`] is returned. Version `0`
//! means "not stored yet".

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use thiserror::Error;

use crate::domain::aggregates::{Cart, Coupon, Order, Product, StockAdjustment};
use crate::domain::value_objects::{CartId, CouponCode, CouponId, OrderId, ProductId, UserId};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The record changed since it was read.
    #[error("version conflict")]
    Conflict,

    #[error("{0} must be unique")]
    Duplicate(&'static str),

    /// The store refused a write, e.g. a stock counter would go negative.
    #[error("rejected: {0}")]
    Rejected(String),

    #[error("data corruption: {0}")]
    DataCorruption(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Outcome of a bulk stock adjustment keyed by order id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdjustOutcome {
    Applied,
    /// Adjustments for this order were applied by an earlier call.
    AlreadyApplied,
}

/// Restricts order reads to one owner; `owner: None` sees every order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OrderFilter {
    pub owner: Option<UserId>,
}

impl OrderFilter {
    pub fn all() -> Self { Self { owner: None } }
    pub fn owned_by(owner: UserId) -> Self { Self { owner: Some(owner) } }
    pub fn admits(&self, order: &Order) -> bool { self.owner.map_or(true, |owner| order.owner() == owner) }
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn find_product(&self, id: ProductId) -> Result<Option<Product>, StoreError>;

    async fn insert_product(&self, product: &Product) -> Result<(), StoreError>;

    /// Applies every adjustment or none of them, at most once per `order_id`.
    /// A counter that would drop below zero rejects the whole batch.
    async fn bulk_adjust(&self, order_id: OrderId, adjustments: &[StockAdjustment]) -> Result<AdjustOutcome, StoreError>;
}

#[async_trait]
pub trait CouponStore: Send + Sync {
    /// Looks up a coupon by code whose expiry is still after `now`.
    async fn find_active_by_code(&self, code: &CouponCode, now: DateTime<Utc>) -> Result<Option<Coupon>, StoreError>;

    async fn find_coupon(&self, id: CouponId) -> Result<Option<Coupon>, StoreError>;

    async fn list_coupons(&self) -> Result<Vec<Coupon>, StoreError>;

    async fn insert_coupon(&self, coupon: &Coupon) -> Result<(), StoreError>;

    /// Returns `false` when no coupon has that id.
    async fn update_coupon(&self, coupon: &Coupon) -> Result<bool, StoreError>;

    async fn delete_coupon(&self, id: CouponId) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait CartStore: Send + Sync {
    async fn find_cart(&self, id: CartId) -> Result<Option<Cart>, StoreError>;

    async fn find_cart_by_owner(&self, owner: UserId) -> Result<Option<Cart>, StoreError>;

    /// Compare-and-swap write; returns the stored cart with its new version.
    /// A new cart conflicts when its owner already has one.
    async fn save_cart(&self, cart: &Cart) -> Result<Cart, StoreError>;

    async fn delete_cart(&self, id: CartId) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Compare-and-swap write; returns the stored order with its new version.
    async fn save_order(&self, order: &Order) -> Result<Order, StoreError>;

    /// Inserts a new order and deletes its source cart in one step. The cart is
    /// consumed only while still at the version it was priced from; otherwise
    /// nothing is written and [`StoreError::Conflict`] is returned.
    async fn place_order(&self, order: &Order, cart: &Cart) -> Result<Order, StoreError>;

    async fn find_order(&self, id: OrderId, filter: OrderFilter) -> Result<Option<Order>, StoreError>;

    /// Newest first.
    async fn list_orders(&self, filter: OrderFilter) -> Result<Vec<Order>, StoreError>;
}

/// Handles to every store, shared by the services.
#[derive(Clone)]
pub struct Stores {
    pub catalog: Arc<dyn CatalogStore>,
    pub coupons: Arc<dyn CouponStore>,
    pub carts: Arc<dyn CartStore>,
    pub orders: Arc<dyn OrderStore>,
}

impl Stores {
    pub fn memory() -> Self { Self::from_backend(Arc::new(MemoryStore::default())) }

    pub fn postgres(pool: PgPool) -> Self { Self::from_backend(Arc::new(PgStore::new(pool))) }

    fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: CatalogStore + CouponStore + CartStore + OrderStore + 'static,
    {
        Self { catalog: backend.clone(), coupons: backend.clone(), carts: backend.clone(), orders: backend }
    }
}
