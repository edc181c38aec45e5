//! Application services over the domain aggregates and store seams.

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod coupons;
pub mod orders;

use std::sync::Arc;

pub use cart::{CartService, RemoveOutcome};
pub use catalog::CatalogService;
pub use checkout::{Buyer, CheckoutService};
pub use coupons::CouponService;
pub use orders::OrderService;

use crate::config::{CheckoutConfig, PaymentConfig};
use crate::messaging::EventPublisher;
use crate::payment::PaymentGateway;
use crate::store::Stores;

/// Every service, wired over one set of stores.
#[derive(Clone)]
pub struct Services {
    pub carts: CartService,
    pub checkout: CheckoutService,
    pub orders: OrderService,
    pub coupons: CouponService,
    pub catalog: CatalogService,
}

impl Services {
    #[must_use]
    pub fn new(
        stores: Stores,
        gateway: Arc<dyn PaymentGateway>,
        events: Arc<dyn EventPublisher>,
        checkout: CheckoutConfig,
        payment: PaymentConfig,
    ) -> Self {
        let policy = checkout.status_policy;
        Self {
            carts: CartService::new(stores.clone()),
            checkout: CheckoutService::new(stores.clone(), gateway, events.clone(), checkout, payment),
            orders: OrderService::new(stores.clone(), events, policy),
            coupons: CouponService::new(stores.clone()),
            catalog: CatalogService::new(stores),
        }
    }
}
