//! HTTP error mapping.
//!
//! Every failure becomes a JSON body `{"status": "fail" | "error", "message": ...}`;
//! `fail` for client errors, `error` for server and upstream errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use validator::{ValidationErrors, ValidationErrorsKind};

use crate::domain::value_objects::ValueError;
use crate::EcommerceError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Domain(#[from] EcommerceError),

    /// Caller identity missing or malformed.
    #[error("You are not logged in. Please log in to get access.")]
    Unauthorized,

    #[error("Access denied.")]
    Forbidden,

    #[error("{0}")]
    BadRequest(String),
}

impl From<ValueError> for ApiError {
    fn from(err: ValueError) -> Self { Self::Domain(err.into()) }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        let mut messages = Vec::new();
        collect_messages("", &errors, &mut messages);
        messages.sort();
        Self::BadRequest(messages.join("; "))
    }
}

/// Flattens nested validation errors into `path message` strings, e.g. `shippingAddress.phone must be ...`.
fn collect_messages(prefix: &str, errors: &ValidationErrors, out: &mut Vec<String>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() { camel_case(field) } else { format!("{prefix}.{}", camel_case(field)) };
        match kind {
            ValidationErrorsKind::Field(errs) => out.extend(errs.iter().map(|e| match &e.message {
                Some(message) => format!("{path} {message}"),
                None => format!("{path} is invalid"),
            })),
            ValidationErrorsKind::Struct(inner) => collect_messages(&path, inner, out),
            ValidationErrorsKind::List(items) => {
                for inner in items.values() {
                    collect_messages(&path, inner, out);
                }
            }
        }
    }
}

fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Domain(err) => match err {
                EcommerceError::NotFound(_) => StatusCode::NOT_FOUND,
                EcommerceError::InvalidOrExpired | EcommerceError::ValidationFailed(_) => StatusCode::BAD_REQUEST,
                EcommerceError::InsufficientStock(_) | EcommerceError::InvalidTransition(_) => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                EcommerceError::ConflictDetected | EcommerceError::StockAdjustmentFailed { .. } => StatusCode::CONFLICT,
                EcommerceError::PaymentService(_) => StatusCode::BAD_GATEWAY,
                EcommerceError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Domain(EcommerceError::Storage(_)) => {
                tracing::error!(error = %self, "request failed");
                "Something went wrong.".to_string()
            }
            Self::Domain(EcommerceError::PaymentService(err)) => {
                tracing::error!(error = %err, "payment service call failed");
                "Payment service is unavailable.".to_string()
            }
            _ => self.to_string(),
        };
        let kind = if status.is_server_error() { "error" } else { "fail" };

        (status, Json(json!({ "status": kind, "message": message }))).into_response()
    }
}
