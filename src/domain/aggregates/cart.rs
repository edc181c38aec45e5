//! Cart Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::pricing::{self, PricedLine};
use crate::domain::value_objects::{CartId, DiscountPercent, LineId, ProductId, Quantity, UserId};

/// One user's pending selection. Totals are derived and only change through
/// the mutating methods below, each of which reprices the cart.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    id: CartId,
    #[serde(rename = "user")]
    owner: UserId,
    #[serde(rename = "cartItems")]
    lines: Vec<CartLine>,
    #[serde(rename = "totalCartPrice")]
    total_price: Decimal,
    total_price_after_discount: Option<Decimal>,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    #[serde(rename = "_id")]
    pub id: LineId,
    #[serde(rename = "product")]
    pub product_id: ProductId,
    pub color: Option<String>,
    pub quantity: Quantity,
    /// Catalog price captured when the line was created.
    #[serde(rename = "price")]
    pub unit_price: Decimal,
}

impl CartLine {
    pub fn line_total(&self) -> Decimal { pricing::line_total(self.quantity, self.unit_price) }
    fn matches(&self, product_id: ProductId, color: Option<&str>) -> bool {
        self.product_id == product_id && self.color.as_deref() == color
    }
}

impl PricedLine for CartLine {
    fn quantity(&self) -> Quantity { self.quantity }
    fn unit_price(&self) -> Decimal { self.unit_price }
}

impl Cart {
    pub fn new(owner: UserId) -> Self {
        let now = Utc::now();
        Self {
            id: CartId::new(), owner, lines: vec![], total_price: Decimal::ZERO,
            total_price_after_discount: None, version: 0, created_at: now, updated_at: now,
        }
    }

    pub fn id(&self) -> CartId { self.id }
    pub fn owner(&self) -> UserId { self.owner }
    pub fn lines(&self) -> &[CartLine] { &self.lines }
    pub fn total_price(&self) -> Decimal { self.total_price }
    pub fn total_price_after_discount(&self) -> Option<Decimal> { self.total_price_after_discount }
    pub fn version(&self) -> u64 { self.version }
    pub fn item_count(&self) -> usize { self.lines.len() }
    pub fn is_empty(&self) -> bool { self.lines.is_empty() }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }

    /// Price the buyer pays: the discounted total when a coupon is applied.
    pub fn payable_total(&self) -> Decimal { self.total_price_after_discount.unwrap_or(self.total_price) }

    /// Adds one unit of `(product, color)`. An existing pair keeps its captured
    /// price and only gains quantity.
    pub fn add_line(&mut self, product_id: ProductId, color: Option<String>, unit_price: Decimal) -> LineId {
        let position = self.lines.iter().position(|l| l.matches(product_id, color.as_deref()));
        let id = match position.and_then(|index| self.lines.get_mut(index)) {
            Some(existing) => {
                existing.quantity = existing.quantity.increment();
                existing.id
            }
            None => {
                let line = CartLine { id: LineId::new(), product_id, color, quantity: Quantity::ONE, unit_price };
                let id = line.id;
                self.lines.push(line);
                id
            }
        };
        self.recalculate();
        id
    }

    pub fn set_line_quantity(&mut self, line_id: LineId, quantity: Quantity) -> Result<(), CartError> {
        let line = self.lines.iter_mut().find(|l| l.id == line_id).ok_or(CartError::LineNotFound(line_id))?;
        line.quantity = quantity;
        self.recalculate();
        Ok(())
    }

    pub fn remove_line(&mut self, line_id: LineId) -> Result<CartLine, CartError> {
        let index = self.lines.iter().position(|l| l.id == line_id).ok_or(CartError::LineNotFound(line_id))?;
        let removed = self.lines.remove(index);
        self.recalculate();
        Ok(removed)
    }

    /// Stores the discounted price; the undiscounted total is left untouched.
    pub fn apply_discount(&mut self, discount: DiscountPercent) -> Decimal {
        let discounted = pricing::apply_discount(self.total_price, discount);
        self.total_price_after_discount = Some(discounted);
        self.touch();
        discounted
    }

    /// Reprices from the lines. Any applied discount is stale afterwards.
    fn recalculate(&mut self) {
        self.total_price = pricing::cart_total(&self.lines);
        self.total_price_after_discount = None;
        self.touch();
    }

    pub(crate) fn bump_version(&mut self) { self.version += 1; }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("Item {0} not found in cart.")]
    LineNotFound(LineId),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn price(units: i64) -> Decimal { Decimal::new(units, 0) }

    #[test]
    fn test_same_pair_merges() {
        let mut cart = Cart::new(UserId::new());
        let product = ProductId::new();
        for _ in 0..4 {
            cart.add_line(product, Some("red".into()), price(10));
        }
        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.lines()[0].quantity.value(), 4);
        assert_eq!(cart.total_price(), price(40));
    }

    #[test]
    fn test_colors_are_distinct_lines() {
        let mut cart = Cart::new(UserId::new());
        let product = ProductId::new();
        cart.add_line(product, Some("red".into()), price(10));
        cart.add_line(product, Some("blue".into()), price(10));
        cart.add_line(product, None, price(10));
        assert_eq!(cart.item_count(), 3);
    }

    #[test]
    fn test_price_snapshot_survives_merge() {
        let mut cart = Cart::new(UserId::new());
        let product = ProductId::new();
        cart.add_line(product, None, price(10));
        cart.add_line(product, None, price(99));
        assert_eq!(cart.lines()[0].unit_price, price(10));
        assert_eq!(cart.total_price(), price(20));
    }

    #[test]
    fn test_mutations_clear_discount() {
        let mut cart = Cart::new(UserId::new());
        let line = cart.add_line(ProductId::new(), None, price(100));
        let ten = DiscountPercent::new(Decimal::TEN).unwrap();

        cart.apply_discount(ten);
        assert_eq!(cart.payable_total(), price(90));
        cart.set_line_quantity(line, Quantity::new(2).unwrap()).unwrap();
        assert_eq!(cart.total_price_after_discount(), None);
        assert_eq!(cart.payable_total(), price(200));

        cart.apply_discount(ten);
        cart.add_line(ProductId::new(), None, price(1));
        assert_eq!(cart.total_price_after_discount(), None);

        cart.apply_discount(ten);
        cart.remove_line(line).unwrap();
        assert_eq!(cart.total_price_after_discount(), None);
        assert_eq!(cart.total_price(), price(1));
    }

    #[test]
    fn test_unknown_line() {
        let mut cart = Cart::new(UserId::new());
        let missing = LineId::new();
        assert_eq!(cart.remove_line(missing), Err(CartError::LineNotFound(missing)));
        assert_eq!(cart.set_line_quantity(missing, Quantity::ONE), Err(CartError::LineNotFound(missing)));
    }

    #[test]
    fn test_serializes_original_field_names() {
        let mut cart = Cart::new(UserId::new());
        cart.add_line(ProductId::new(), Some("red".into()), price(5));
        let json = serde_json::to_value(&cart).unwrap();
        assert!(json.get("cartItems").is_some());
        assert!(json.get("totalCartPrice").is_some());
        assert!(json["cartItems"][0].get("_id").is_some());
        assert_eq!(json["cartItems"][0]["quantity"], 1);
    }
}
