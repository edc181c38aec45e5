//! Coupon Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{CouponCode, CouponId, DiscountPercent};

/// Time-limited percentage discount. Applying a coupon never mutates it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    id: CouponId,
    code: CouponCode,
    #[serde(rename = "expire")]
    expires_at: DateTime<Utc>,
    discount: DiscountPercent,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Partial update; `None` leaves a field unchanged.
#[derive(Clone, Debug, Default)]
pub struct CouponChanges {
    pub code: Option<CouponCode>,
    pub expires_at: Option<DateTime<Utc>>,
    pub discount: Option<DiscountPercent>,
}

impl Coupon {
    pub fn create(code: CouponCode, expires_at: DateTime<Utc>, discount: DiscountPercent) -> Self {
        let now = Utc::now();
        Self { id: CouponId::new(), code, expires_at, discount, created_at: now, updated_at: now }
    }

    pub fn id(&self) -> CouponId { self.id }
    pub fn code(&self) -> &CouponCode { &self.code }
    pub fn expires_at(&self) -> DateTime<Utc> { self.expires_at }
    pub fn discount(&self) -> DiscountPercent { self.discount }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }

    /// A coupon expiring exactly at `now` is already expired.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool { self.expires_at > now }

    pub fn update(&mut self, changes: CouponChanges) {
        if let Some(code) = changes.code { self.code = code; }
        if let Some(expires_at) = changes.expires_at { self.expires_at = expires_at; }
        if let Some(discount) = changes.discount { self.discount = discount; }
        self.updated_at = Utc::now();
    }

    pub(crate) fn restore(
        id: CouponId, code: CouponCode, expires_at: DateTime<Utc>, discount: DiscountPercent,
        created_at: DateTime<Utc>, updated_at: DateTime<Utc>,
    ) -> Self {
        Self { id, code, expires_at, discount, created_at, updated_at }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal::Decimal;

    #[test]
    fn test_expiry_boundary() {
        let now = Utc::now();
        let coupon = Coupon::create(CouponCode::new("EID").unwrap(), now, DiscountPercent::new(Decimal::TEN).unwrap());
        assert!(!coupon.is_active_at(now));
        assert!(coupon.is_active_at(now - Duration::seconds(1)));
    }

    #[test]
    fn test_partial_update() {
        let now = Utc::now();
        let mut coupon = Coupon::create(CouponCode::new("A").unwrap(), now, DiscountPercent::new(Decimal::TEN).unwrap());
        coupon.update(CouponChanges { discount: Some(DiscountPercent::new(Decimal::new(25, 0)).unwrap()), ..Default::default() });
        assert_eq!(coupon.code().as_str(), "A");
        assert_eq!(coupon.discount().value(), Decimal::new(25, 0));
    }
}
