//! Cart routes for the signed-in customer.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use validator::Validate;

use super::auth::{Actor, CUSTOMERS};
use super::error::ApiError;
use super::extract::ValidJson;
use super::AppState;
use crate::domain::aggregates::Cart;
use crate::domain::value_objects::{LineId, ProductId};
use crate::services::RemoveOutcome;

type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Deserialize, Validate)] pub struct AddToCartRequest { pub product: ProductId, pub color: Option<String> }
#[derive(Debug, Deserialize, Validate)] pub struct UpdateQuantityRequest { #[validate(range(min = 1, message = "must be at least 1"))] pub quantity: u32 }
#[derive(Debug, Deserialize, Validate)] pub struct ApplyCouponRequest { #[validate(length(min = 1, message = "is required"))] pub coupon: String }

fn with_count(cart: &Cart) -> Json<Value> { Json(json!({ "numOfItems": cart.item_count(), "data": cart })) }

pub async fn add_to_cart(State(s): State<AppState>, actor: Actor, ValidJson(r): ValidJson<AddToCartRequest>) -> ApiResult<(StatusCode, Json<Value>)> {
    actor.require(CUSTOMERS)?;
    let cart = s.services.carts.add_line(actor.id, r.product, r.color).await?;
    Ok((StatusCode::CREATED, Json(json!({ "message": "Product added successfully to cart.", "data": cart }))))
}

pub async fn get_cart(State(s): State<AppState>, actor: Actor) -> ApiResult<Json<Value>> {
    actor.require(CUSTOMERS)?;
    Ok(with_count(&s.services.carts.get_cart(actor.id).await?))
}

pub async fn clear_cart(State(s): State<AppState>, actor: Actor) -> ApiResult<Json<Value>> {
    actor.require(CUSTOMERS)?;
    s.services.carts.clear(actor.id).await?;
    Ok(Json(json!({ "message": "Cart deleted successfully." })))
}

pub async fn update_quantity(State(s): State<AppState>, actor: Actor, Path(item_id): Path<LineId>, ValidJson(r): ValidJson<UpdateQuantityRequest>) -> ApiResult<Json<Value>> {
    actor.require(CUSTOMERS)?;
    Ok(with_count(&s.services.carts.set_line_quantity(actor.id, item_id, r.quantity).await?))
}

pub async fn remove_item(State(s): State<AppState>, actor: Actor, Path(item_id): Path<LineId>) -> ApiResult<Json<Value>> {
    actor.require(CUSTOMERS)?;
    match s.services.carts.remove_line(actor.id, item_id).await? {
        RemoveOutcome::Updated(cart) => Ok(with_count(&cart)),
        RemoveOutcome::Deleted => Ok(Json(json!({ "message": "Item removed and cart deleted because it became empty." }))),
    }
}

pub async fn apply_coupon(State(s): State<AppState>, actor: Actor, ValidJson(r): ValidJson<ApplyCouponRequest>) -> ApiResult<Json<Value>> {
    actor.require(CUSTOMERS)?;
    Ok(with_count(&s.services.carts.apply_coupon(actor.id, &r.coupon).await?))
}
