//! Checkout and order routes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use validator::Validate;

use super::auth::{Actor, CUSTOMERS, EVERYONE, STAFF};
use super::error::ApiError;
use super::extract::ValidJson;
use super::AppState;
use crate::domain::aggregates::{OrderStatus, ShippingAddress};
use crate::domain::value_objects::{CartId, OrderId};
use crate::services::Buyer;

type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    #[validate]
    pub shipping_address: ShippingAddress,
}

#[derive(Debug, Deserialize, Validate)] pub struct UpdateStatusRequest { pub status: OrderStatus }

pub async fn create_cash_order(State(s): State<AppState>, actor: Actor, Path(cart_id): Path<CartId>, ValidJson(r): ValidJson<CheckoutRequest>) -> ApiResult<(StatusCode, Json<Value>)> {
    actor.require(CUSTOMERS)?;
    let order = s.services.checkout.checkout_cash(cart_id, r.shipping_address).await?;
    Ok((StatusCode::CREATED, Json(json!({ "data": order }))))
}

pub async fn create_checkout_session(State(s): State<AppState>, actor: Actor, Path(cart_id): Path<CartId>, ValidJson(r): ValidJson<CheckoutRequest>) -> ApiResult<(StatusCode, Json<Value>)> {
    actor.require(CUSTOMERS)?;
    let buyer = Buyer { name: actor.name, email: actor.email };
    let session = s.services.checkout.create_checkout_session(cart_id, r.shipping_address, buyer).await?;
    Ok((StatusCode::CREATED, Json(json!({ "status": "success", "session": session }))))
}

/// Called by the payment callback receiver once the provider reports the session as paid.
pub async fn complete_card_checkout(State(s): State<AppState>, actor: Actor, Path(cart_id): Path<CartId>, ValidJson(r): ValidJson<CheckoutRequest>) -> ApiResult<(StatusCode, Json<Value>)> {
    actor.require(STAFF)?;
    let order = s.services.checkout.complete_card_checkout(cart_id, r.shipping_address).await?;
    Ok((StatusCode::CREATED, Json(json!({ "data": order }))))
}

pub async fn list_orders(State(s): State<AppState>, actor: Actor) -> ApiResult<Json<Value>> {
    actor.require(EVERYONE)?;
    let orders = s.services.orders.list_orders(actor.order_filter()).await?;
    Ok(Json(json!({ "results": orders.len(), "data": orders })))
}

pub async fn get_order(State(s): State<AppState>, actor: Actor, Path(id): Path<OrderId>) -> ApiResult<Json<Value>> {
    actor.require(EVERYONE)?;
    Ok(Json(json!({ "data": s.services.orders.get_order(id, actor.order_filter()).await? })))
}

pub async fn update_status(State(s): State<AppState>, actor: Actor, Path(id): Path<OrderId>, ValidJson(r): ValidJson<UpdateStatusRequest>) -> ApiResult<Json<Value>> {
    actor.require(STAFF)?;
    let order = s.services.orders.update_status(id, r.status).await?;
    Ok(Json(json!({
        "message": format!("Order status updated to {}", order.status()),
        "status": order.status(),
        "statusChangedAt": order.status_changed_at(),
    })))
}

pub async fn reconcile_stock(State(s): State<AppState>, actor: Actor, Path(id): Path<OrderId>) -> ApiResult<Json<Value>> {
    actor.require(STAFF)?;
    Ok(Json(json!({ "data": s.services.checkout.reconcile_stock(id).await? })))
}
