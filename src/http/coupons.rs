//! Coupon administration routes (admin and manager only).

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use validator::Validate;

use super::auth::{Actor, STAFF};
use super::error::ApiError;
use super::extract::ValidJson;
use super::AppState;
use crate::domain::aggregates::CouponChanges;
use crate::domain::value_objects::{CouponCode, CouponId, DiscountPercent};

type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCouponRequest {
    #[validate(length(min = 1, message = "is required"))]
    pub code: String,
    pub expire: DateTime<Utc>,
    pub discount: Decimal,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCouponRequest {
    pub code: Option<String>,
    pub expire: Option<DateTime<Utc>>,
    pub discount: Option<Decimal>,
}

impl UpdateCouponRequest {
    fn into_changes(self) -> Result<CouponChanges, ApiError> {
        Ok(CouponChanges {
            code: self.code.map(CouponCode::new).transpose()?,
            expires_at: self.expire,
            discount: self.discount.map(DiscountPercent::new).transpose()?,
        })
    }
}

pub async fn create_coupon(State(s): State<AppState>, actor: Actor, ValidJson(r): ValidJson<CreateCouponRequest>) -> ApiResult<(StatusCode, Json<Value>)> {
    actor.require(STAFF)?;
    let coupon = s.services.coupons.create_coupon(CouponCode::new(r.code)?, r.expire, DiscountPercent::new(r.discount)?).await?;
    Ok((StatusCode::CREATED, Json(json!({ "data": coupon }))))
}

pub async fn list_coupons(State(s): State<AppState>, actor: Actor) -> ApiResult<Json<Value>> {
    actor.require(STAFF)?;
    let coupons = s.services.coupons.list_coupons().await?;
    Ok(Json(json!({ "results": coupons.len(), "data": coupons })))
}

pub async fn get_coupon(State(s): State<AppState>, actor: Actor, Path(id): Path<CouponId>) -> ApiResult<Json<Value>> {
    actor.require(STAFF)?;
    Ok(Json(json!({ "data": s.services.coupons.get_coupon(id).await? })))
}

pub async fn update_coupon(State(s): State<AppState>, actor: Actor, Path(id): Path<CouponId>, ValidJson(r): ValidJson<UpdateCouponRequest>) -> ApiResult<Json<Value>> {
    actor.require(STAFF)?;
    Ok(Json(json!({ "data": s.services.coupons.update_coupon(id, r.into_changes()?).await? })))
}

pub async fn delete_coupon(State(s): State<AppState>, actor: Actor, Path(id): Path<CouponId>) -> ApiResult<StatusCode> {
    actor.require(STAFF)?;
    s.services.coupons.delete_coupon(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
