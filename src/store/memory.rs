//! In-memory store used by tests and database-less runs.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{AdjustOutcome, CartStore, CatalogStore, CouponStore, OrderFilter, OrderStore, StoreError};
use crate::domain::aggregates::{Cart, Coupon, Order, Product, StockAdjustment};
use crate::domain::value_objects::{CartId, CouponCode, CouponId, OrderId, ProductId, UserId};

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

#[derive(Debug, Default)]
struct State {
    products: HashMap<ProductId, Product>,
    adjusted_orders: HashSet<OrderId>,
    coupons: HashMap<CouponId, Coupon>,
    carts: HashMap<CartId, Cart>,
    orders: HashMap<OrderId, Order>,
}

impl State {
    fn code_taken(&self, coupon: &Coupon) -> bool {
        self.coupons.values().any(|c| c.code() == coupon.code() && c.id() != coupon.id())
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn find_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        Ok(self.state.read().await.products.get(&id).cloned())
    }

    async fn insert_product(&self, product: &Product) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if state.products.contains_key(&product.id()) { return Err(StoreError::Duplicate("product id")); }
        state.products.insert(product.id(), product.clone());
        Ok(())
    }

    async fn bulk_adjust(&self, order_id: OrderId, adjustments: &[StockAdjustment]) -> Result<AdjustOutcome, StoreError> {
        let mut state = self.state.write().await;
        if state.adjusted_orders.contains(&order_id) { return Ok(AdjustOutcome::AlreadyApplied); }

        // Work on copies so a rejected entry leaves every counter untouched.
        let mut updated = Vec::with_capacity(adjustments.len());
        for adjustment in adjustments {
            let mut product = state
                .products
                .get(&adjustment.product_id)
                .cloned()
                .ok_or_else(|| StoreError::Rejected(format!("product {} does not exist", adjustment.product_id)))?;
            product
                .apply(adjustment)
                .map_err(|e| StoreError::Rejected(format!("product {}: {e}", adjustment.product_id)))?;
            updated.push(product);
        }
        for product in updated {
            state.products.insert(product.id(), product);
        }
        state.adjusted_orders.insert(order_id);
        Ok(AdjustOutcome::Applied)
    }
}

#[async_trait]
impl CouponStore for MemoryStore {
    async fn find_active_by_code(&self, code: &CouponCode, now: DateTime<Utc>) -> Result<Option<Coupon>, StoreError> {
        let state = self.state.read().await;
        Ok(state.coupons.values().find(|c| c.code() == code && c.is_active_at(now)).cloned())
    }

    async fn find_coupon(&self, id: CouponId) -> Result<Option<Coupon>, StoreError> {
        Ok(self.state.read().await.coupons.get(&id).cloned())
    }

    async fn list_coupons(&self) -> Result<Vec<Coupon>, StoreError> {
        let mut coupons: Vec<Coupon> = self.state.read().await.coupons.values().cloned().collect();
        coupons.sort_by_key(|c| std::cmp::Reverse(c.created_at()));
        Ok(coupons)
    }

    async fn insert_coupon(&self, coupon: &Coupon) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if state.code_taken(coupon) { return Err(StoreError::Duplicate("Coupon code")); }
        state.coupons.insert(coupon.id(), coupon.clone());
        Ok(())
    }

    async fn update_coupon(&self, coupon: &Coupon) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        if !state.coupons.contains_key(&coupon.id()) { return Ok(false); }
        if state.code_taken(coupon) { return Err(StoreError::Duplicate("Coupon code")); }
        state.coupons.insert(coupon.id(), coupon.clone());
        Ok(true)
    }

    async fn delete_coupon(&self, id: CouponId) -> Result<bool, StoreError> {
        Ok(self.state.write().await.coupons.remove(&id).is_some())
    }
}

#[async_trait]
impl CartStore for MemoryStore {
    async fn find_cart(&self, id: CartId) -> Result<Option<Cart>, StoreError> {
        Ok(self.state.read().await.carts.get(&id).cloned())
    }

    async fn find_cart_by_owner(&self, owner: UserId) -> Result<Option<Cart>, StoreError> {
        Ok(self.state.read().await.carts.values().find(|c| c.owner() == owner).cloned())
    }

    async fn save_cart(&self, cart: &Cart) -> Result<Cart, StoreError> {
        let mut state = self.state.write().await;
        match state.carts.get(&cart.id()).map(Cart::version) {
            Some(stored) if stored == cart.version() => {}
            None if cart.version() == 0 => {
                if state.carts.values().any(|c| c.owner() == cart.owner()) { return Err(StoreError::Conflict); }
            }
            _ => return Err(StoreError::Conflict),
        }
        let mut saved = cart.clone();
        saved.bump_version();
        state.carts.insert(saved.id(), saved.clone());
        Ok(saved)
    }

    async fn delete_cart(&self, id: CartId) -> Result<bool, StoreError> {
        Ok(self.state.write().await.carts.remove(&id).is_some())
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn save_order(&self, order: &Order) -> Result<Order, StoreError> {
        let mut state = self.state.write().await;
        match state.orders.get(&order.id()).map(Order::version) {
            Some(stored) if stored == order.version() => {}
            None if order.version() == 0 => {}
            _ => return Err(StoreError::Conflict),
        }
        let mut saved = order.clone();
        saved.take_events();
        saved.bump_version();
        state.orders.insert(saved.id(), saved.clone());
        Ok(saved)
    }

    async fn place_order(&self, order: &Order, cart: &Cart) -> Result<Order, StoreError> {
        let mut state = self.state.write().await;
        if order.version() != 0 || state.orders.contains_key(&order.id()) { return Err(StoreError::Conflict); }
        if state.carts.get(&cart.id()).map(Cart::version) != Some(cart.version()) { return Err(StoreError::Conflict); }
        state.carts.remove(&cart.id());
        let mut saved = order.clone();
        saved.take_events();
        saved.bump_version();
        state.orders.insert(saved.id(), saved.clone());
        Ok(saved)
    }

    async fn find_order(&self, id: OrderId, filter: OrderFilter) -> Result<Option<Order>, StoreError> {
        let state = self.state.read().await;
        Ok(state.orders.get(&id).filter(|o| filter.admits(o)).cloned())
    }

    async fn list_orders(&self, filter: OrderFilter) -> Result<Vec<Order>, StoreError> {
        let state = self.state.read().await;
        let mut orders: Vec<Order> = state.orders.values().filter(|o| filter.admits(o)).cloned().collect();
        orders.sort_by_key(|o| std::cmp::Reverse(o.created_at()));
        Ok(orders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{PaymentMethod, ShippingAddress};
    use crate::domain::pricing::Charges;
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn test_cart_compare_and_swap() {
        let store = MemoryStore::default();
        let mut cart = Cart::new(UserId::new());
        cart.add_line(ProductId::new(), None, Decimal::ONE);

        let saved = store.save_cart(&cart).await.unwrap();
        assert_eq!(saved.version(), 1);

        // A second writer still holding version 0 loses.
        assert!(matches!(store.save_cart(&cart).await, Err(StoreError::Conflict)));

        let again = store.save_cart(&saved).await.unwrap();
        assert_eq!(again.version(), 2);
        assert!(matches!(store.save_cart(&saved).await, Err(StoreError::Conflict)));
    }

    #[tokio::test]
    async fn test_place_order_consumes_cart_once() {
        let store = MemoryStore::default();
        let mut cart = Cart::new(UserId::new());
        cart.add_line(ProductId::new(), None, Decimal::ONE);
        let saved = store.save_cart(&cart).await.unwrap();

        let stale = Order::place(&cart, ShippingAddress::default(), Charges::default(), PaymentMethod::Cash);
        assert!(matches!(store.place_order(&stale, &cart).await, Err(StoreError::Conflict)));
        assert!(store.find_cart(saved.id()).await.unwrap().is_some());

        let first = Order::place(&saved, ShippingAddress::default(), Charges::default(), PaymentMethod::Cash);
        let second = Order::place(&saved, ShippingAddress::default(), Charges::default(), PaymentMethod::Cash);
        assert_eq!(store.place_order(&first, &saved).await.unwrap().version(), 1);
        assert!(matches!(store.place_order(&second, &saved).await, Err(StoreError::Conflict)));

        assert!(store.find_cart(saved.id()).await.unwrap().is_none());
        assert_eq!(store.list_orders(OrderFilter::all()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_one_cart_per_owner() {
        let store = MemoryStore::default();
        let owner = UserId::new();
        store.save_cart(&Cart::new(owner)).await.unwrap();
        assert!(matches!(store.save_cart(&Cart::new(owner)).await, Err(StoreError::Conflict)));
    }

    #[tokio::test]
    async fn test_bulk_adjust_is_all_or_nothing_and_idempotent() {
        let store = MemoryStore::default();
        let plenty = Product::create("Plenty", Decimal::TEN, 10, vec![]).unwrap();
        let scarce = Product::create("Scarce", Decimal::TEN, 1, vec![]).unwrap();
        store.insert_product(&plenty).await.unwrap();
        store.insert_product(&scarce).await.unwrap();

        let too_many = [
            StockAdjustment { product_id: plenty.id(), quantity_delta: -2, sold_delta: 2 },
            StockAdjustment { product_id: scarce.id(), quantity_delta: -2, sold_delta: 2 },
        ];
        assert!(matches!(store.bulk_adjust(OrderId::new(), &too_many).await, Err(StoreError::Rejected(_))));
        assert_eq!(store.find_product(plenty.id()).await.unwrap().unwrap().quantity(), 10);

        let order_id = OrderId::new();
        let ok = [StockAdjustment { product_id: plenty.id(), quantity_delta: -2, sold_delta: 2 }];
        assert_eq!(store.bulk_adjust(order_id, &ok).await.unwrap(), AdjustOutcome::Applied);
        assert_eq!(store.bulk_adjust(order_id, &ok).await.unwrap(), AdjustOutcome::AlreadyApplied);
        let stored = store.find_product(plenty.id()).await.unwrap().unwrap();
        assert_eq!((stored.quantity(), stored.sold()), (8, 2));
    }

    #[tokio::test]
    async fn test_order_filter() {
        let store = MemoryStore::default();
        let cart = Cart::new(UserId::new());
        let order = Order::place(&cart, ShippingAddress::default(), Charges::default(), PaymentMethod::Cash);
        store.save_order(&order).await.unwrap();

        assert!(store.find_order(order.id(), OrderFilter::owned_by(cart.owner())).await.unwrap().is_some());
        assert!(store.find_order(order.id(), OrderFilter::owned_by(UserId::new())).await.unwrap().is_none());
        assert_eq!(store.list_orders(OrderFilter::all()).await.unwrap().len(), 1);
    }
}
