//! HTTP surface: routes under `/api/v1` plus a `/health` probe.

pub mod auth;
pub mod cart;
pub mod coupons;
pub mod error;
pub mod extract;
pub mod orders;
pub mod products;

use axum::{
    routing::{get, post, put},
    Json, Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::services::Services;

pub const SERVICE_NAME: &str = "opensase-checkout";

#[derive(Clone)]
pub struct AppState {
    pub services: Services,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": SERVICE_NAME})) }))
        .route("/api/v1/cart", get(cart::get_cart).post(cart::add_to_cart).delete(cart::clear_cart))
        .route("/api/v1/cart/apply-coupon", put(cart::apply_coupon))
        .route("/api/v1/cart/:item_id", put(cart::update_quantity).delete(cart::remove_item))
        .route("/api/v1/orders", get(orders::list_orders))
        .route("/api/v1/orders/:id", get(orders::get_order).post(orders::create_cash_order))
        .route("/api/v1/orders/:id/status", put(orders::update_status))
        .route("/api/v1/orders/:id/stock-adjustment", post(orders::reconcile_stock))
        .route("/api/v1/orders/checkout-session/:cart_id", post(orders::create_checkout_session))
        .route("/api/v1/orders/checkout-session/:cart_id/complete", post(orders::complete_card_checkout))
        .route("/api/v1/coupons", get(coupons::list_coupons).post(coupons::create_coupon))
        .route("/api/v1/coupons/:id", get(coupons::get_coupon).put(coupons::update_coupon).delete(coupons::delete_coupon))
        .route("/api/v1/products", post(products::create_product))
        .route("/api/v1/products/:id", get(products::get_product))
        .layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()).with_state(state)
}
