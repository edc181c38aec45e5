//! Product catalog entries: create and read, with their stock and sold counters.

use rust_decimal::Decimal;

use crate::domain::aggregates::Product;
use crate::domain::value_objects::ProductId;
use crate::store::Stores;
use crate::{EcommerceError, Resource, Result};

/// Minimal catalog access: enough to stock products and inspect their counters.
#[derive(Clone)]
pub struct CatalogService {
    stores: Stores,
}

impl CatalogService {
    #[must_use]
    pub fn new(stores: Stores) -> Self { Self { stores } }

    #[tracing::instrument(skip(self))]
    pub async fn create_product(&self, title: String, price: Decimal, quantity: i64, colors: Vec<String>) -> Result<Product> {
        let product = Product::create(title, price, quantity, colors)?;
        self.stores.catalog.insert_product(&product).await?;
        tracing::info!(product_id = %product.id(), "product created");
        Ok(product)
    }

    pub async fn get_product(&self, id: ProductId) -> Result<Product> {
        self.stores.catalog.find_product(id).await?.ok_or(EcommerceError::NotFound(Resource::Product))
    }
}
