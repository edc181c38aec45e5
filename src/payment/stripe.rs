//! Stripe Checkout client.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::{CheckoutSession, CheckoutSessionRequest, PaymentError, PaymentGateway};

/// Stripe API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.stripe.com/v1";

#[derive(Clone)]
pub struct StripeGateway {
    client: reqwest::Client,
    api_base: String,
    secret: SecretString,
}

impl std::fmt::Debug for StripeGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeGateway")
            .field("api_base", &self.api_base)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    id: String,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl StripeGateway {
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(secret: SecretString, api_base: impl Into<String>) -> Result<Self, PaymentError> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self { client, api_base: api_base.into().trim_end_matches('/').to_string(), secret })
    }

    /// Form body for `POST /checkout/sessions`: a single line item carrying the whole amount.
    fn session_form(request: &CheckoutSessionRequest) -> Vec<(String, String)> {
        let mut form = vec![
            ("mode".to_string(), "payment".to_string()),
            ("line_items[0][quantity]".to_string(), "1".to_string()),
            ("line_items[0][price_data][currency]".to_string(), request.currency.clone()),
            ("line_items[0][price_data][unit_amount]".to_string(), request.amount_minor_units.to_string()),
            ("line_items[0][price_data][product_data][name]".to_string(), request.description.clone()),
            ("success_url".to_string(), request.success_url.clone()),
            ("cancel_url".to_string(), request.cancel_url.clone()),
            ("client_reference_id".to_string(), request.correlation_token.clone()),
        ];
        if let Some(email) = &request.buyer_email {
            form.push(("customer_email".to_string(), email.clone()));
        }
        for (key, value) in &request.metadata {
            form.push((format!("metadata[{key}]"), value.clone()));
        }
        form
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    #[tracing::instrument(skip(self, request), fields(reference = %request.correlation_token))]
    async fn create_checkout_session(&self, request: &CheckoutSessionRequest) -> Result<CheckoutSession, PaymentError> {
        let url = format!("{}/checkout/sessions", self.api_base);
        let response = self
            .client
            .post(&url)
            .bearer_auth(self.secret.expose_secret())
            .form(&Self::session_form(request))
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .ok()
                .and_then(|e| e.error.message)
                .unwrap_or(body);
            return Err(PaymentError::Api { status: status.as_u16(), message });
        }

        let session: SessionResponse = response.json().await.map_err(|e| PaymentError::Parse(e.to_string()))?;
        tracing::debug!(session_id = %session.id, "checkout session created");
        Ok(CheckoutSession { id: session.id, url: session.url })
    }
}
