//! Coupon administration.

use chrono::{DateTime, Utc};

use crate::domain::aggregates::{Coupon, CouponChanges};
use crate::domain::value_objects::{CouponCode, CouponId, DiscountPercent};
use crate::store::{StoreError, Stores};
use crate::{EcommerceError, Resource, Result};

fn unique_code(err: StoreError) -> EcommerceError {
    match err {
        StoreError::Duplicate(_) => EcommerceError::ValidationFailed("Coupon code must be unique.".to_string()),
        other => other.into(),
    }
}

#[derive(Clone)]
pub struct CouponService {
    stores: Stores,
}

impl CouponService {
    #[must_use]
    pub fn new(stores: Stores) -> Self { Self { stores } }

    #[tracing::instrument(skip(self))]
    pub async fn create_coupon(&self, code: CouponCode, expires_at: DateTime<Utc>, discount: DiscountPercent) -> Result<Coupon> {
        let coupon = Coupon::create(code, expires_at, discount);
        self.stores.coupons.insert_coupon(&coupon).await.map_err(unique_code)?;
        tracing::info!(coupon_id = %coupon.id(), code = %coupon.code(), "coupon created");
        Ok(coupon)
    }

    pub async fn list_coupons(&self) -> Result<Vec<Coupon>> { Ok(self.stores.coupons.list_coupons().await?) }

    pub async fn get_coupon(&self, id: CouponId) -> Result<Coupon> {
        self.stores.coupons.find_coupon(id).await?.ok_or(EcommerceError::NotFound(Resource::Coupon))
    }

    #[tracing::instrument(skip(self))]
    pub async fn update_coupon(&self, id: CouponId, changes: CouponChanges) -> Result<Coupon> {
        let mut coupon = self.get_coupon(id).await?;
        coupon.update(changes);
        if !self.stores.coupons.update_coupon(&coupon).await.map_err(unique_code)? {
            return Err(EcommerceError::NotFound(Resource::Coupon));
        }
        Ok(coupon)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_coupon(&self, id: CouponId) -> Result<()> {
        if !self.stores.coupons.delete_coupon(id).await? {
            return Err(EcommerceError::NotFound(Resource::Coupon));
        }
        tracing::info!(coupon_id = %id, "coupon deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use rust_decimal::Decimal;

    use super::*;

    fn code(value: &str) -> CouponCode { CouponCode::new(value).unwrap() }
    fn pct(value: i64) -> DiscountPercent { DiscountPercent::new(Decimal::new(value, 0)).unwrap() }

    #[tokio::test]
    async fn test_codes_are_unique() {
        let service = CouponService::new(Stores::memory());
        let expiry = Utc::now() + Duration::days(7);
        service.create_coupon(code("SAVE10"), expiry, pct(10)).await.unwrap();
        assert!(matches!(
            service.create_coupon(code(" SAVE10 "), expiry, pct(20)).await,
            Err(EcommerceError::ValidationFailed(msg)) if msg == "Coupon code must be unique."
        ));
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let service = CouponService::new(Stores::memory());
        let coupon = service.create_coupon(code("SAVE10"), Utc::now() + Duration::days(7), pct(10)).await.unwrap();

        let updated = service
            .update_coupon(coupon.id(), CouponChanges { discount: Some(pct(25)), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(updated.discount(), pct(25));
        assert_eq!(updated.code(), &code("SAVE10"));

        service.delete_coupon(coupon.id()).await.unwrap();
        assert!(matches!(service.get_coupon(coupon.id()).await, Err(EcommerceError::NotFound(Resource::Coupon))));
        assert!(matches!(service.delete_coupon(coupon.id()).await, Err(EcommerceError::NotFound(Resource::Coupon))));
    }
}
