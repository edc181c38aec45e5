//! Pricing rules shared by carts and orders.
//!
//! Every function here is pure: no clocks, no stores. Carts call
//! [`cart_total`] after each structural change, coupons go through
//! [`apply_discount`], and checkout adds the configured [`Charges`].

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{round_money, DiscountPercent, Quantity};

/// Flat tax and shipping amounts added on top of the cart price at checkout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Charges {
    pub tax: Decimal,
    pub shipping: Decimal,
}

impl Charges {
    pub fn new(tax: Decimal, shipping: Decimal) -> Self { Self { tax, shipping } }
}

/// Anything priced as `quantity × unit price`.
pub trait PricedLine {
    fn quantity(&self) -> Quantity;
    fn unit_price(&self) -> Decimal;
}

pub fn line_total(quantity: Quantity, unit_price: Decimal) -> Decimal {
    quantity.as_decimal() * unit_price
}

/// Sum of `quantity × unit price` over all lines.
pub fn cart_total<L: PricedLine>(lines: &[L]) -> Decimal {
    lines
        .iter()
        .map(|line| line_total(line.quantity(), line.unit_price()))
        .sum()
}

/// `total - total × percent / 100`, rounded to cents.
pub fn apply_discount(total: Decimal, discount: DiscountPercent) -> Decimal {
    round_money(total - total * discount.value() / Decimal::ONE_HUNDRED)
}

/// Amount charged for an order: the (possibly discounted) cart price plus charges.
pub fn order_total(cart_price: Decimal, charges: &Charges) -> Decimal {
    cart_price + charges.tax + charges.shipping
}
