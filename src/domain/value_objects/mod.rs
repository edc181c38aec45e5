//! Value Objects for checkout

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self { Self(Uuid::now_v7()) }
            pub fn from_uuid(id: Uuid) -> Self { Self(id) }
            pub fn as_uuid(&self) -> Uuid { self.0 }
        }

        impl Default for $name { fn default() -> Self { Self::new() } }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
        }

        impl FromStr for $name {
            type Err = uuid::Error;
            fn from_str(s: &str) -> Result<Self, Self::Err> { Uuid::parse_str(s).map(Self) }
        }
    };
}

uuid_id!(
    /// Owner of carts and orders
    UserId
);
uuid_id!(ProductId);
uuid_id!(CartId);
uuid_id!(
    /// Identity of a single cart line, stable across quantity edits
    LineId
);
uuid_id!(OrderId);
uuid_id!(CouponId);

/// Errors raised when constructing value objects from raw input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("Coupon code is required.")]
    EmptyCouponCode,
    #[error("Quantity must be at least 1.")]
    ZeroQuantity,
    #[error("Discount must be between 0 and 100.")]
    DiscountOutOfRange,
    #[error("Amount cannot be negative.")]
    NegativeAmount,
    #[error("Amount is too large to charge.")]
    AmountOverflow,
}

/// Coupon code value object, trimmed on construction
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CouponCode(String);

impl CouponCode {
    pub fn new(value: impl Into<String>) -> Result<Self, ValueError> {
        let value = value.into().trim().to_string();
        if value.is_empty() { return Err(ValueError::EmptyCouponCode); }
        Ok(Self(value))
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl TryFrom<String> for CouponCode {
    type Error = ValueError;
    fn try_from(value: String) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<CouponCode> for String {
    fn from(code: CouponCode) -> Self { code.0 }
}

impl fmt::Display for CouponCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// Line quantity, never zero
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Quantity(u32);

impl Quantity {
    pub const ONE: Quantity = Quantity(1);

    pub fn new(value: u32) -> Result<Self, ValueError> {
        if value == 0 { return Err(ValueError::ZeroQuantity); }
        Ok(Self(value))
    }
    pub fn value(&self) -> u32 { self.0 }
    pub fn increment(&self) -> Self { Self(self.0.saturating_add(1)) }
    pub fn as_decimal(&self) -> Decimal { Decimal::from(self.0) }
}

impl TryFrom<u32> for Quantity {
    type Error = ValueError;
    fn try_from(value: u32) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<Quantity> for u32 {
    fn from(q: Quantity) -> Self { q.0 }
}

/// Percentage discount in `0..=100`
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct DiscountPercent(Decimal);

impl DiscountPercent {
    pub fn new(value: Decimal) -> Result<Self, ValueError> {
        if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
            return Err(ValueError::DiscountOutOfRange);
        }
        Ok(Self(value))
    }
    pub fn value(&self) -> Decimal { self.0 }
}

impl TryFrom<Decimal> for DiscountPercent {
    type Error = ValueError;
    fn try_from(value: Decimal) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<DiscountPercent> for Decimal {
    fn from(p: DiscountPercent) -> Self { p.0 }
}

/// Rounds a monetary amount to cents, half away from zero.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Converts a major-unit amount into minor currency units (cents).
pub fn to_minor_units(amount: Decimal) -> Result<i64, ValueError> {
    if amount.is_sign_negative() && !amount.is_zero() { return Err(ValueError::NegativeAmount); }
    (round_money(amount) * Decimal::ONE_HUNDRED)
        .trunc()
        .to_i64()
        .ok_or(ValueError::AmountOverflow)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coupon_code_trimmed() {
        let code = CouponCode::new("  SAVE10 ").unwrap();
        assert_eq!(code.as_str(), "SAVE10");
        assert_eq!(CouponCode::new("   "), Err(ValueError::EmptyCouponCode));
    }

    #[test]
    fn test_quantity_rejects_zero() {
        assert_eq!(Quantity::new(0), Err(ValueError::ZeroQuantity));
        assert_eq!(Quantity::ONE.increment().value(), 2);
    }

    #[test]
    fn test_discount_bounds() {
        assert!(DiscountPercent::new(Decimal::ZERO).is_ok());
        assert!(DiscountPercent::new(Decimal::ONE_HUNDRED).is_ok());
        assert_eq!(DiscountPercent::new(Decimal::new(1001, 1)), Err(ValueError::DiscountOutOfRange));
        assert_eq!(DiscountPercent::new(Decimal::NEGATIVE_ONE), Err(ValueError::DiscountOutOfRange));
    }

    #[test]
    fn test_minor_units() {
        assert_eq!(to_minor_units(Decimal::new(13000, 2)).unwrap(), 13000);
        assert_eq!(to_minor_units(Decimal::new(19995, 3)).unwrap(), 2000);
        assert_eq!(to_minor_units(Decimal::NEGATIVE_ONE), Err(ValueError::NegativeAmount));
    }

    #[test]
    fn test_quantity_deserialize_rejects_zero() {
        assert!(serde_json::from_str::<Quantity>("0").is_err());
        assert_eq!(serde_json::from_str::<Quantity>("3").unwrap().value(), 3);
    }
}
