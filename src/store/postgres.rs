//! PostgreSQL store.
//!
//! Carts and orders are JSONB documents next to the columns used for lookup
//! and compare-and-swap (`owner_id`, `version`). Products and coupons are
//! plain rows so their counters and expiry can be updated in SQL.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use super::{AdjustOutcome, CartStore, CatalogStore, CouponStore, OrderFilter, OrderStore, StoreError};
use crate::domain::aggregates::{Cart, Coupon, Order, Product, StockAdjustment};
use crate::domain::value_objects::{CartId, CouponCode, CouponId, DiscountPercent, OrderId, ProductId, UserId};

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    title: String,
    price: Decimal,
    quantity: i64,
    sold: i64,
    colors: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product::restore(
            ProductId::from_uuid(row.id), row.title, row.price, row.quantity, row.sold, row.colors,
            row.created_at, row.updated_at,
        )
    }
}

#[derive(sqlx::FromRow)]
struct CouponRow {
    id: Uuid,
    code: String,
    expires_at: DateTime<Utc>,
    discount: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CouponRow> for Coupon {
    type Error = StoreError;
    fn try_from(row: CouponRow) -> Result<Self, Self::Error> {
        let code = CouponCode::new(row.code).map_err(|e| StoreError::DataCorruption(format!("coupon {}: {e}", row.id)))?;
        let discount = DiscountPercent::new(row.discount).map_err(|e| StoreError::DataCorruption(format!("coupon {}: {e}", row.id)))?;
        Ok(Coupon::restore(CouponId::from_uuid(row.id), code, row.expires_at, discount, row.created_at, row.updated_at))
    }
}

const COUPON_COLUMNS: &str = "id, code, expires_at, discount, created_at, updated_at";

fn version_column(version: u64) -> Result<i64, StoreError> {
    i64::try_from(version).map_err(|_| StoreError::DataCorruption(format!("version {version} out of range")))
}

fn unique_violation(err: sqlx::Error, what: &'static str) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Duplicate(what),
        _ => StoreError::Database(err),
    }
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn find_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query_as::<_, ProductRow>(
            "SELECT id, title, price, quantity, sold, colors, created_at, updated_at FROM products WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Product::from))
    }

    async fn insert_product(&self, product: &Product) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO products (id, title, price, quantity, sold, colors, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(product.id().as_uuid())
        .bind(product.title())
        .bind(product.price())
        .bind(product.quantity())
        .bind(product.sold())
        .bind(product.colors().to_vec())
        .bind(product.created_at())
        .bind(product.updated_at())
        .execute(&self.pool)
        .await
        .map_err(|e| unique_violation(e, "product id"))?;
        Ok(())
    }

    async fn bulk_adjust(&self, order_id: OrderId, adjustments: &[StockAdjustment]) -> Result<AdjustOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        let claimed = sqlx::query("INSERT INTO stock_adjustments (order_id) VALUES ($1) ON CONFLICT DO NOTHING")
            .bind(order_id.as_uuid())
            .execute(&mut *tx)
            .await?;
        if claimed.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(AdjustOutcome::AlreadyApplied);
        }

        let ids: Vec<Uuid> = adjustments.iter().map(|a| a.product_id.as_uuid()).collect();
        let quantity_deltas: Vec<i64> = adjustments.iter().map(|a| a.quantity_delta).collect();
        let sold_deltas: Vec<i64> = adjustments.iter().map(|a| a.sold_delta).collect();

        let updated = sqlx::query(
            "UPDATE products AS p \
             SET quantity = p.quantity + a.quantity_delta, sold = p.sold + a.sold_delta, updated_at = NOW() \
             FROM UNNEST($1::uuid[], $2::bigint[], $3::bigint[]) AS a(product_id, quantity_delta, sold_delta) \
             WHERE p.id = a.product_id AND p.quantity + a.quantity_delta >= 0",
        )
        .bind(&ids)
        .bind(&quantity_deltas)
        .bind(&sold_deltas)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() != ids.len() as u64 {
            tx.rollback().await?;
            return Err(StoreError::Rejected(format!(
                "{} of {} products missing or out of stock",
                ids.len() as u64 - updated.rows_affected(),
                ids.len()
            )));
        }

        tx.commit().await?;
        Ok(AdjustOutcome::Applied)
    }
}

#[async_trait]
impl CouponStore for PgStore {
    async fn find_active_by_code(&self, code: &CouponCode, now: DateTime<Utc>) -> Result<Option<Coupon>, StoreError> {
        let sql = format!("SELECT {COUPON_COLUMNS} FROM coupons WHERE code = $1 AND expires_at > $2");
        sqlx::query_as::<_, CouponRow>(&sql)
            .bind(code.as_str())
            .bind(now)
            .fetch_optional(&self.pool)
            .await?
            .map(Coupon::try_from)
            .transpose()
    }

    async fn find_coupon(&self, id: CouponId) -> Result<Option<Coupon>, StoreError> {
        let sql = format!("SELECT {COUPON_COLUMNS} FROM coupons WHERE id = $1");
        sqlx::query_as::<_, CouponRow>(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(Coupon::try_from)
            .transpose()
    }

    async fn list_coupons(&self) -> Result<Vec<Coupon>, StoreError> {
        let sql = format!("SELECT {COUPON_COLUMNS} FROM coupons ORDER BY created_at DESC");
        sqlx::query_as::<_, CouponRow>(&sql)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Coupon::try_from)
            .collect()
    }

    async fn insert_coupon(&self, coupon: &Coupon) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO coupons (id, code, expires_at, discount, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(coupon.id().as_uuid())
        .bind(coupon.code().as_str())
        .bind(coupon.expires_at())
        .bind(coupon.discount().value())
        .bind(coupon.created_at())
        .bind(coupon.updated_at())
        .execute(&self.pool)
        .await
        .map_err(|e| unique_violation(e, "Coupon code"))?;
        Ok(())
    }

    async fn update_coupon(&self, coupon: &Coupon) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE coupons SET code = $2, expires_at = $3, discount = $4, updated_at = $5 WHERE id = $1")
            .bind(coupon.id().as_uuid())
            .bind(coupon.code().as_str())
            .bind(coupon.expires_at())
            .bind(coupon.discount().value())
            .bind(coupon.updated_at())
            .execute(&self.pool)
            .await
            .map_err(|e| unique_violation(e, "Coupon code"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_coupon(&self, id: CouponId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM coupons WHERE id = $1").bind(id.as_uuid()).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl CartStore for PgStore {
    async fn find_cart(&self, id: CartId) -> Result<Option<Cart>, StoreError> {
        let doc = sqlx::query_scalar::<_, Json<Cart>>("SELECT document FROM carts WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        Ok(doc.map(|Json(cart)| cart))
    }

    async fn find_cart_by_owner(&self, owner: UserId) -> Result<Option<Cart>, StoreError> {
        let doc = sqlx::query_scalar::<_, Json<Cart>>("SELECT document FROM carts WHERE owner_id = $1")
            .bind(owner.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        Ok(doc.map(|Json(cart)| cart))
    }

    async fn save_cart(&self, cart: &Cart) -> Result<Cart, StoreError> {
        let mut saved = cart.clone();
        saved.bump_version();
        let expected = version_column(cart.version())?;
        let next = version_column(saved.version())?;

        let result = if cart.version() == 0 {
            sqlx::query(
                "INSERT INTO carts (id, owner_id, version, document, updated_at) VALUES ($1, $2, $3, $4, $5) \
                 ON CONFLICT DO NOTHING",
            )
            .bind(saved.id().as_uuid())
            .bind(saved.owner().as_uuid())
            .bind(next)
            .bind(Json(&saved))
            .bind(saved.updated_at())
            .execute(&self.pool)
            .await?
        } else {
            sqlx::query(
                "UPDATE carts SET version = $3, document = $4, updated_at = $5 \
                 WHERE id = $1 AND owner_id = $2 AND version = $6",
            )
            .bind(saved.id().as_uuid())
            .bind(saved.owner().as_uuid())
            .bind(next)
            .bind(Json(&saved))
            .bind(saved.updated_at())
            .bind(expected)
            .execute(&self.pool)
            .await?
        };

        if result.rows_affected() == 0 { return Err(StoreError::Conflict); }
        Ok(saved)
    }

    async fn delete_cart(&self, id: CartId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM carts WHERE id = $1").bind(id.as_uuid()).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl OrderStore for PgStore {
    async fn save_order(&self, order: &Order) -> Result<Order, StoreError> {
        let mut saved = order.clone();
        saved.take_events();
        saved.bump_version();
        let expected = version_column(order.version())?;
        let next = version_column(saved.version())?;

        let result = if order.version() == 0 {
            sqlx::query(
                "INSERT INTO orders (id, owner_id, version, stock_adjusted, document, created_at) \
                 VALUES ($1, $2, $3, $4, $5, $6) ON CONFLICT DO NOTHING",
            )
            .bind(saved.id().as_uuid())
            .bind(saved.owner().as_uuid())
            .bind(next)
            .bind(saved.stock_adjusted())
            .bind(Json(&saved))
            .bind(saved.created_at())
            .execute(&self.pool)
            .await?
        } else {
            sqlx::query(
                "UPDATE orders SET version = $2, stock_adjusted = $3, document = $4 WHERE id = $1 AND version = $5",
            )
            .bind(saved.id().as_uuid())
            .bind(next)
            .bind(saved.stock_adjusted())
            .bind(Json(&saved))
            .bind(expected)
            .execute(&self.pool)
            .await?
        };

        if result.rows_affected() == 0 { return Err(StoreError::Conflict); }
        Ok(saved)
    }

    async fn place_order(&self, order: &Order, cart: &Cart) -> Result<Order, StoreError> {
        if order.version() != 0 { return Err(StoreError::Conflict); }
        let mut saved = order.clone();
        saved.take_events();
        saved.bump_version();

        let mut tx = self.pool.begin().await?;
        let consumed = sqlx::query("DELETE FROM carts WHERE id = $1 AND version = $2")
            .bind(cart.id().as_uuid())
            .bind(version_column(cart.version())?)
            .execute(&mut *tx)
            .await?;
        if consumed.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(StoreError::Conflict);
        }

        let inserted = sqlx::query(
            "INSERT INTO orders (id, owner_id, version, stock_adjusted, document, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6) ON CONFLICT DO NOTHING",
        )
        .bind(saved.id().as_uuid())
        .bind(saved.owner().as_uuid())
        .bind(version_column(saved.version())?)
        .bind(saved.stock_adjusted())
        .bind(Json(&saved))
        .bind(saved.created_at())
        .execute(&mut *tx)
        .await?;
        if inserted.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(StoreError::Conflict);
        }

        tx.commit().await?;
        Ok(saved)
    }

    async fn find_order(&self, id: OrderId, filter: OrderFilter) -> Result<Option<Order>, StoreError> {
        let doc = sqlx::query_scalar::<_, Json<Order>>(
            "SELECT document FROM orders WHERE id = $1 AND ($2::uuid IS NULL OR owner_id = $2)",
        )
        .bind(id.as_uuid())
        .bind(filter.owner.map(|o| o.as_uuid()))
        .fetch_optional(&self.pool)
        .await?;
        Ok(doc.map(|Json(order)| order))
    }

    async fn list_orders(&self, filter: OrderFilter) -> Result<Vec<Order>, StoreError> {
        let docs = sqlx::query_scalar::<_, Json<Order>>(
            "SELECT document FROM orders WHERE ($1::uuid IS NULL OR owner_id = $1) ORDER BY created_at DESC",
        )
        .bind(filter.owner.map(|o| o.as_uuid()))
        .fetch_all(&self.pool)
        .await?;
        Ok(docs.into_iter().map(|Json(order)| order).collect())
    }
}
