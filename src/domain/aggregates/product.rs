//! Product Aggregate
//!
//! Checkout only reads a product's price and stock and moves its counters
//! through [`StockAdjustment`]s; everything else about the catalog lives
//! outside this service.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::aggregates::cart::CartLine;
use crate::domain::value_objects::ProductId;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    id: ProductId,
    title: String,
    price: Decimal,
    quantity: i64,
    sold: i64,
    colors: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Counter movement for one product: `quantity += quantity_delta`, `sold += sold_delta`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockAdjustment {
    pub product_id: ProductId,
    pub quantity_delta: i64,
    pub sold_delta: i64,
}

impl StockAdjustment {
    /// One entry per product: lines for the same product in different colors
    /// are merged so a bulk update touches each counter once.
    pub fn for_sale(lines: &[CartLine]) -> Vec<StockAdjustment> {
        let mut merged: BTreeMap<ProductId, i64> = BTreeMap::new();
        for line in lines {
            *merged.entry(line.product_id).or_default() += i64::from(line.quantity.value());
        }
        merged
            .into_iter()
            .map(|(product_id, units)| StockAdjustment { product_id, quantity_delta: -units, sold_delta: units })
            .collect()
    }
}

impl Product {
    pub fn create(title: impl Into<String>, price: Decimal, quantity: i64, colors: Vec<String>) -> Result<Self, ProductError> {
        let title = title.into().trim().to_string();
        if title.is_empty() { return Err(ProductError::MissingTitle); }
        if price.is_sign_negative() && !price.is_zero() { return Err(ProductError::NegativePrice); }
        if quantity < 0 { return Err(ProductError::NegativeStock); }
        let now = Utc::now();
        Ok(Self { id: ProductId::new(), title, price, quantity, sold: 0, colors, created_at: now, updated_at: now })
    }

    pub fn id(&self) -> ProductId { self.id }
    pub fn title(&self) -> &str { &self.title }
    pub fn price(&self) -> Decimal { self.price }
    pub fn quantity(&self) -> i64 { self.quantity }
    pub fn sold(&self) -> i64 { self.sold }
    pub fn colors(&self) -> &[String] { &self.colors }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }

    pub fn offers_color(&self, color: &str) -> bool { self.colors.iter().any(|c| c == color) }
    pub fn has_stock_for(&self, units: i64) -> bool { self.quantity >= units }

    pub fn apply(&mut self, adjustment: &StockAdjustment) -> Result<(), ProductError> {
        let quantity = self.quantity + adjustment.quantity_delta;
        if quantity < 0 { return Err(ProductError::InsufficientInventory); }
        self.quantity = quantity;
        self.sold += adjustment.sold_delta;
        self.touch();
        Ok(())
    }

    /// Rebuilds a product from persisted columns.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn restore(
        id: ProductId, title: String, price: Decimal, quantity: i64, sold: i64, colors: Vec<String>,
        created_at: DateTime<Utc>, updated_at: DateTime<Utc>,
    ) -> Self {
        Self { id, title, price, quantity, sold, colors, created_at, updated_at }
    }

    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProductError {
    #[error("Product title is required.")]
    MissingTitle,
    #[error("Product price cannot be negative.")]
    NegativePrice,
    #[error("Product quantity cannot be negative.")]
    NegativeStock,
    #[error("Insufficient inventory")]
    InsufficientInventory,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{LineId, Quantity};

    fn line(product_id: ProductId, color: &str, qty: u32) -> CartLine {
        CartLine {
            id: LineId::new(), product_id, color: Some(color.into()),
            quantity: Quantity::new(qty).unwrap(), unit_price: Decimal::ONE,
        }
    }

    #[test]
    fn test_product_create() {
        let p = Product::create(" Mug ", Decimal::new(1999, 2), 5, vec!["white".into()]).unwrap();
        assert_eq!(p.title(), "Mug");
        assert!(p.offers_color("white"));
        assert!(!p.offers_color("black"));
        assert_eq!(Product::create("", Decimal::ONE, 1, vec![]), Err(ProductError::MissingTitle));
        assert_eq!(Product::create("x", Decimal::NEGATIVE_ONE, 1, vec![]), Err(ProductError::NegativePrice));
    }

    #[test]
    fn test_adjustments_merge_colors() {
        let a = ProductId::new();
        let b = ProductId::new();
        let adjustments = StockAdjustment::for_sale(&[line(a, "red", 2), line(b, "red", 1), line(a, "blue", 3)]);
        assert_eq!(adjustments.len(), 2);
        let for_a = adjustments.iter().find(|adj| adj.product_id == a).unwrap();
        assert_eq!((for_a.quantity_delta, for_a.sold_delta), (-5, 5));
    }

    #[test]
    fn test_apply_refuses_negative_stock() {
        let mut p = Product::create("Lamp", Decimal::TEN, 3, vec![]).unwrap();
        let adj = StockAdjustment { product_id: p.id(), quantity_delta: -2, sold_delta: 2 };
        p.apply(&adj).unwrap();
        assert_eq!((p.quantity(), p.sold()), (1, 2));
        assert_eq!(p.apply(&adj), Err(ProductError::InsufficientInventory));
        assert_eq!((p.quantity(), p.sold()), (1, 2));
    }
}
