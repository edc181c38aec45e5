//! Hosted payment sessions.
//!
//! The gateway is a black box: it receives the amount to charge and returns
//! a session whose URL the buyer is redirected to.

pub mod stripe;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

pub use stripe::StripeGateway;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("payment gateway is not configured")]
    NotConfigured,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckoutSessionRequest {
    pub amount_minor_units: i64,
    pub currency: String,
    pub description: String,
    pub success_url: String,
    pub cancel_url: String,
    pub buyer_email: Option<String>,
    /// Cart id, echoed back by the provider when the session completes.
    pub correlation_token: String,
    pub metadata: Vec<(String, String)>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: Option<String>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_checkout_session(&self, request: &CheckoutSessionRequest) -> Result<CheckoutSession, PaymentError>;
}

/// Used when no provider credentials are configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledGateway;

#[async_trait]
impl PaymentGateway for DisabledGateway {
    async fn create_checkout_session(&self, _request: &CheckoutSessionRequest) -> Result<CheckoutSession, PaymentError> {
        Err(PaymentError::NotConfigured)
    }
}
