//! Catalog routes: staff create products, anyone can read one.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use validator::Validate;

use super::auth::{Actor, STAFF};
use super::error::ApiError;
use super::extract::ValidJson;
use super::AppState;
use crate::domain::value_objects::ProductId;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, message = "is required"))]
    pub title: String,
    pub price: Decimal,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub quantity: i64,
    #[serde(default)]
    pub colors: Vec<String>,
}

pub async fn create_product(State(s): State<AppState>, actor: Actor, ValidJson(r): ValidJson<CreateProductRequest>) -> Result<(StatusCode, Json<Value>), ApiError> {
    actor.require(STAFF)?;
    let product = s.services.catalog.create_product(r.title, r.price, r.quantity, r.colors).await?;
    Ok((StatusCode::CREATED, Json(json!({ "data": product }))))
}

pub async fn get_product(State(s): State<AppState>, Path(id): Path<ProductId>) -> Result<Json<Value>, ApiError> {
    Ok(Json(json!({ "data": s.services.catalog.get_product(id).await? })))
}
