//! Checkout orchestration: turns a priced cart into an order or a hosted payment session.
//!
//! A cash or completed card checkout runs in this order:
//!
//! 1. load the cart and check every line against current stock;
//! 2. persist the order and delete the cart in one write, guarded by the cart's
//!    version so a cart turns into at most one order;
//! 3. apply the merged stock adjustment, keyed by order id;
//! 4. publish the order's events.
//!
//! There is no transaction spanning steps 2 and 3. If the adjustment fails the
//! order is kept with `stockAdjusted = false`, the failure is logged and a
//! `StockAdjustmentFailed` event is published; [`CheckoutService::reconcile_stock`]
//! re-applies it later.

use std::sync::Arc;

use chrono::Utc;
use validator::Validate;

use crate::config::{CheckoutConfig, PaymentConfig};
use crate::domain::aggregates::{Cart, Order, PaymentMethod, ShippingAddress, StockAdjustment};
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::pricing;
use crate::domain::value_objects::{to_minor_units, CartId, OrderId};
use crate::messaging::EventPublisher;
use crate::payment::{CheckoutSession, CheckoutSessionRequest, PaymentGateway};
use crate::store::{AdjustOutcome, OrderFilter, Stores};
use crate::{EcommerceError, Resource, Result};

/// The person paying for a hosted session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Buyer {
    pub name: String,
    pub email: Option<String>,
}

#[derive(Clone)]
pub struct CheckoutService {
    stores: Stores,
    gateway: Arc<dyn PaymentGateway>,
    events: Arc<dyn EventPublisher>,
    config: CheckoutConfig,
    payment: PaymentConfig,
}

impl CheckoutService {
    #[must_use]
    pub fn new(
        stores: Stores,
        gateway: Arc<dyn PaymentGateway>,
        events: Arc<dyn EventPublisher>,
        config: CheckoutConfig,
        payment: PaymentConfig,
    ) -> Self {
        Self { stores, gateway, events, config, payment }
    }

    async fn load_cart(&self, cart_id: CartId) -> Result<Cart> {
        self.stores.carts.find_cart(cart_id).await?.ok_or(EcommerceError::NotFound(Resource::Cart))
    }

    /// Fails with `InsufficientStock` if any product cannot cover the merged demand of the cart.
    async fn ensure_stock(&self, cart: &Cart) -> Result<()> {
        for adjustment in StockAdjustment::for_sale(cart.lines()) {
            let product = self
                .stores
                .catalog
                .find_product(adjustment.product_id)
                .await?
                .ok_or(EcommerceError::NotFound(Resource::Product))?;
            if !product.has_stock_for(adjustment.sold_delta) {
                return Err(EcommerceError::InsufficientStock(product.id()));
            }
        }
        Ok(())
    }

    fn validate_address(address: &ShippingAddress) -> Result<()> {
        address.validate().map_err(|e| EcommerceError::ValidationFailed(format!("Invalid shipping address: {e}")))
    }

    /// Creates a cash order from the cart, adjusts stock and deletes the cart.
    /// A second checkout of the same cart fails with `ConflictDetected`.
    #[tracing::instrument(skip(self, shipping_address))]
    pub async fn checkout_cash(&self, cart_id: CartId, shipping_address: ShippingAddress) -> Result<Order> {
        Self::validate_address(&shipping_address)?;
        let cart = self.load_cart(cart_id).await?;
        let order = Order::place(&cart, shipping_address, self.config.charges, PaymentMethod::Cash);
        self.finalize(cart, order).await
    }

    /// Records a card order once the payment provider has confirmed the session for `cart_id`.
    #[tracing::instrument(skip(self, shipping_address))]
    pub async fn complete_card_checkout(&self, cart_id: CartId, shipping_address: ShippingAddress) -> Result<Order> {
        Self::validate_address(&shipping_address)?;
        let cart = self.load_cart(cart_id).await?;
        let mut order = Order::place(&cart, shipping_address, self.config.charges, PaymentMethod::Card);
        order.mark_paid(Utc::now());
        self.finalize(cart, order).await
    }

    async fn finalize(&self, cart: Cart, mut order: Order) -> Result<Order> {
        if cart.is_empty() {
            return Err(EcommerceError::ValidationFailed("Cart has no items.".to_string()));
        }
        self.ensure_stock(&cart).await?;

        let mut events = order.take_events();
        let placed = self.stores.orders.place_order(&order, &cart).await.map_err(|err| {
            tracing::warn!(cart_id = %cart.id(), error = %err, "cart changed or was consumed before the order was placed");
            EcommerceError::from(err)
        })?;
        tracing::info!(
            order_id = %placed.id(),
            cart_id = %cart.id(),
            total = %placed.total_amount(),
            payment_method = ?placed.payment_method(),
            "order placed"
        );

        let order = match self.adjust_stock(&placed).await {
            Ok(()) => {
                let mut adjusted = placed.clone();
                adjusted.mark_stock_adjusted();
                match self.stores.orders.save_order(&adjusted).await {
                    Ok(saved) => saved,
                    Err(err) => {
                        tracing::error!(order_id = %placed.id(), error = %err, "stock moved but the order could not be marked adjusted");
                        placed
                    }
                }
            }
            Err(err) => {
                tracing::error!(order_id = %placed.id(), error = %err, "stock adjustment failed after order creation");
                events.push(DomainEvent::Order(OrderEvent::StockAdjustmentFailed {
                    order_id: placed.id(),
                    reason: err.to_string(),
                }));
                placed
            }
        };

        self.events.publish_all(events).await;
        Ok(order)
    }

    async fn adjust_stock(&self, order: &Order) -> Result<()> {
        let adjustments = StockAdjustment::for_sale(order.lines());
        match self.stores.catalog.bulk_adjust(order.id(), &adjustments).await {
            Ok(AdjustOutcome::Applied) => Ok(()),
            Ok(AdjustOutcome::AlreadyApplied) => {
                tracing::debug!(order_id = %order.id(), "stock adjustment already applied");
                Ok(())
            }
            Err(err) => Err(EcommerceError::StockAdjustmentFailed { order_id: order.id(), reason: err.to_string() }),
        }
    }

    /// Re-applies the stock adjustment of an order whose earlier attempt failed.
    /// Orders already marked as adjusted are returned unchanged.
    #[tracing::instrument(skip(self))]
    pub async fn reconcile_stock(&self, order_id: OrderId) -> Result<Order> {
        let mut order = self
            .stores
            .orders
            .find_order(order_id, OrderFilter::all())
            .await?
            .ok_or(EcommerceError::NotFound(Resource::Order))?;
        if order.stock_adjusted() {
            return Ok(order);
        }

        self.adjust_stock(&order).await?;
        order.mark_stock_adjusted();
        let order = self.stores.orders.save_order(&order).await?;
        tracing::info!(order_id = %order.id(), "stock adjustment reconciled");
        Ok(order)
    }

    /// Opens a hosted payment session for the cart's payable total. No order is created and stock is untouched.
    #[tracing::instrument(skip(self, shipping_address, buyer))]
    pub async fn create_checkout_session(
        &self,
        cart_id: CartId,
        shipping_address: ShippingAddress,
        buyer: Buyer,
    ) -> Result<CheckoutSession> {
        Self::validate_address(&shipping_address)?;
        let cart = self.load_cart(cart_id).await?;
        let total = pricing::order_total(cart.payable_total(), &self.config.charges);

        let request = CheckoutSessionRequest {
            amount_minor_units: to_minor_units(total)?,
            currency: self.payment.currency.clone(),
            description: format!("Order by {}", buyer.name),
            success_url: self.payment.success_url(),
            cancel_url: self.payment.cancel_url(),
            buyer_email: buyer.email,
            correlation_token: cart.id().to_string(),
            metadata: shipping_address.to_metadata().into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
        };

        let session = self.gateway.create_checkout_session(&request).await?;
        tracing::info!(%cart_id, session_id = %session.id, amount = request.amount_minor_units, "checkout session created");
        Ok(session)
    }
}
