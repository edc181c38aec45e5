//! Cart service.

use chrono::Utc;

use crate::domain::aggregates::Cart;
use crate::domain::value_objects::{CouponCode, LineId, ProductId, Quantity, UserId};
use crate::store::Stores;
use crate::{EcommerceError, Resource, Result};

/// Result of removing a line: the remaining cart, or nothing when it became empty.
#[derive(Clone, Debug, PartialEq)]
pub enum RemoveOutcome {
    Updated(Cart),
    /// The last line was removed and the cart deleted.
    Deleted,
}

#[derive(Clone)]
pub struct CartService {
    stores: Stores,
}

impl CartService {
    #[must_use]
    pub fn new(stores: Stores) -> Self { Self { stores } }

    async fn owned_cart(&self, owner: UserId) -> Result<Cart> {
        self.stores.carts.find_cart_by_owner(owner).await?.ok_or(EcommerceError::NotFound(Resource::Cart))
    }

    /// Adds one unit of `product_id` in `color` to the owner's cart, creating the cart on first use.
    #[tracing::instrument(skip(self))]
    pub async fn add_line(&self, owner: UserId, product_id: ProductId, color: Option<String>) -> Result<Cart> {
        let product = self
            .stores
            .catalog
            .find_product(product_id)
            .await?
            .ok_or(EcommerceError::NotFound(Resource::Product))?;

        let color = color.map(|c| c.trim().to_string()).filter(|c| !c.is_empty());
        if let Some(color) = &color {
            if !product.offers_color(color) {
                return Err(EcommerceError::ValidationFailed("Invalid product color.".to_string()));
            }
        }

        let mut cart = self.stores.carts.find_cart_by_owner(owner).await?.unwrap_or_else(|| Cart::new(owner));
        let line_id = cart.add_line(product_id, color, product.price());
        let cart = self.stores.carts.save_cart(&cart).await?;

        tracing::info!(cart_id = %cart.id(), %line_id, total = %cart.total_price(), "product added to cart");
        Ok(cart)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_cart(&self, owner: UserId) -> Result<Cart> { self.owned_cart(owner).await }

    #[tracing::instrument(skip(self))]
    pub async fn set_line_quantity(&self, owner: UserId, line_id: LineId, quantity: u32) -> Result<Cart> {
        let quantity = Quantity::new(quantity)?;
        let mut cart = self.owned_cart(owner).await?;
        cart.set_line_quantity(line_id, quantity)?;
        Ok(self.stores.carts.save_cart(&cart).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn remove_line(&self, owner: UserId, line_id: LineId) -> Result<RemoveOutcome> {
        let mut cart = self.owned_cart(owner).await?;
        cart.remove_line(line_id)?;

        if cart.is_empty() {
            self.stores.carts.delete_cart(cart.id()).await?;
            tracing::info!(cart_id = %cart.id(), "cart deleted after its last line was removed");
            return Ok(RemoveOutcome::Deleted);
        }
        Ok(RemoveOutcome::Updated(self.stores.carts.save_cart(&cart).await?))
    }

    #[tracing::instrument(skip(self))]
    pub async fn clear(&self, owner: UserId) -> Result<()> {
        let cart = self.owned_cart(owner).await?;
        if !self.stores.carts.delete_cart(cart.id()).await? {
            return Err(EcommerceError::NotFound(Resource::Cart));
        }
        Ok(())
    }

    /// Prices the cart with an active coupon. An unknown or expired code leaves the cart untouched.
    #[tracing::instrument(skip(self))]
    pub async fn apply_coupon(&self, owner: UserId, code: &str) -> Result<Cart> {
        let code = CouponCode::new(code).map_err(|_| EcommerceError::InvalidOrExpired)?;
        let coupon = self
            .stores
            .coupons
            .find_active_by_code(&code, Utc::now())
            .await?
            .ok_or(EcommerceError::InvalidOrExpired)?;

        let mut cart = self.owned_cart(owner).await?;
        let discounted = cart.apply_discount(coupon.discount());
        let cart = self.stores.carts.save_cart(&cart).await?;

        tracing::info!(cart_id = %cart.id(), coupon = %code, %discounted, "coupon applied");
        Ok(cart)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use rust_decimal::Decimal;

    use super::*;
    use crate::domain::aggregates::{Coupon, Product};
    use crate::domain::value_objects::DiscountPercent;

    async fn setup() -> (CartService, Stores, Product) {
        let stores = Stores::memory();
        let product = Product::create("Lamp", Decimal::new(100, 0), 10, vec!["red".into(), "blue".into()]).unwrap();
        stores.catalog.insert_product(&product).await.unwrap();
        (CartService::new(stores.clone()), stores, product)
    }

    #[tokio::test]
    async fn test_repeated_adds_merge_into_one_line() {
        let (service, _, product) = setup().await;
        let owner = UserId::new();
        for _ in 0..3 {
            service.add_line(owner, product.id(), Some("red".into())).await.unwrap();
        }
        let cart = service.get_cart(owner).await.unwrap();
        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.lines()[0].quantity.value(), 3);
        assert_eq!(cart.total_price(), Decimal::new(300, 0));
    }

    #[tokio::test]
    async fn test_add_rejects_unknown_product_and_color() {
        let (service, _, product) = setup().await;
        let owner = UserId::new();
        assert!(matches!(
            service.add_line(owner, ProductId::new(), None).await,
            Err(EcommerceError::NotFound(Resource::Product))
        ));
        assert!(matches!(
            service.add_line(owner, product.id(), Some("green".into())).await,
            Err(EcommerceError::ValidationFailed(msg)) if msg == "Invalid product color."
        ));
        assert!(matches!(service.get_cart(owner).await, Err(EcommerceError::NotFound(Resource::Cart))));
    }

    #[tokio::test]
    async fn test_zero_quantity_rejected() {
        let (service, _, product) = setup().await;
        let owner = UserId::new();
        let cart = service.add_line(owner, product.id(), None).await.unwrap();
        let line = cart.lines()[0].id;
        assert!(matches!(service.set_line_quantity(owner, line, 0).await, Err(EcommerceError::ValidationFailed(_))));
        let cart = service.set_line_quantity(owner, line, 4).await.unwrap();
        assert_eq!(cart.total_price(), Decimal::new(400, 0));
    }

    #[tokio::test]
    async fn test_removing_last_line_deletes_cart() {
        let (service, _, product) = setup().await;
        let owner = UserId::new();
        let cart = service.add_line(owner, product.id(), None).await.unwrap();
        let outcome = service.remove_line(owner, cart.lines()[0].id).await.unwrap();
        assert_eq!(outcome, RemoveOutcome::Deleted);
        assert!(matches!(service.get_cart(owner).await, Err(EcommerceError::NotFound(Resource::Cart))));
    }

    #[tokio::test]
    async fn test_unknown_line() {
        let (service, _, product) = setup().await;
        let owner = UserId::new();
        service.add_line(owner, product.id(), None).await.unwrap();
        assert!(matches!(
            service.remove_line(owner, LineId::new()).await,
            Err(EcommerceError::NotFound(Resource::CartItem))
        ));
    }

    #[tokio::test]
    async fn test_set_quantity_needs_cart_and_line() {
        let (service, _, product) = setup().await;
        let owner = UserId::new();
        assert!(matches!(
            service.set_line_quantity(owner, LineId::new(), 2).await,
            Err(EcommerceError::NotFound(Resource::Cart))
        ));

        let cart = service.add_line(owner, product.id(), None).await.unwrap();
        assert!(matches!(
            service.set_line_quantity(owner, LineId::new(), 2).await,
            Err(EcommerceError::NotFound(Resource::CartItem))
        ));
        assert_eq!(service.get_cart(owner).await.unwrap().version(), cart.version());
    }

    #[tokio::test]
    async fn test_expired_coupon_leaves_cart_unchanged() {
        let (service, stores, product) = setup().await;
        let owner = UserId::new();
        let expired = Coupon::create(
            CouponCode::new("OLD").unwrap(),
            Utc::now() - Duration::days(1),
            DiscountPercent::new(Decimal::TEN).unwrap(),
        );
        stores.coupons.insert_coupon(&expired).await.unwrap();

        let before = service.add_line(owner, product.id(), None).await.unwrap();
        assert!(matches!(service.apply_coupon(owner, "OLD").await, Err(EcommerceError::InvalidOrExpired)));
        assert!(matches!(service.apply_coupon(owner, "NOPE").await, Err(EcommerceError::InvalidOrExpired)));

        let after = service.get_cart(owner).await.unwrap();
        assert_eq!(after.total_price(), before.total_price());
        assert_eq!(after.total_price_after_discount(), None);
        assert_eq!(after.version(), before.version());
    }

    #[tokio::test]
    async fn test_clear() {
        let (service, _, product) = setup().await;
        let owner = UserId::new();
        service.add_line(owner, product.id(), None).await.unwrap();
        service.clear(owner).await.unwrap();
        assert!(matches!(service.clear(owner).await, Err(EcommerceError::NotFound(Resource::Cart))));
    }
}
