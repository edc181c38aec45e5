//! Service configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All optional:
//! - `HOST` - Bind address (default: 0.0.0.0)
//! - `PORT` - Listen port (default: 8083)
//! - `DATABASE_URL` - `PostgreSQL` connection string; in-memory store when unset
//! - `NATS_URL` - NATS server for domain events
//! - `STRIPE_SECRET` - Stripe secret key; card checkout is disabled when unset
//! - `STRIPE_API_BASE` - Stripe API base URL (default: <https://api.stripe.com/v1>)
//! - `PUBLIC_BASE_URL` - Origin used for payment redirect URLs (default: <http://localhost:8083>)
//! - `CURRENCY` - Currency charged in payment sessions (default: egp)
//! - `TAX_PRICE` - Flat tax added to every order (default: 0)
//! - `SHIPPING_PRICE` - Flat shipping added to every order (default: 0)
//! - `ORDER_STATUS_POLICY` - `lenient` or `forward-only` (default: lenient)

use std::net::{IpAddr, SocketAddr};

use rust_decimal::Decimal;
use secrecy::SecretString;
use thiserror::Error;

use crate::domain::aggregates::OrderStatusPolicy;
use crate::domain::pricing::Charges;
use crate::payment::stripe::DEFAULT_API_BASE;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: IpAddr,
    pub port: u16,
    /// `PostgreSQL` connection URL (contains password)
    pub database_url: Option<SecretString>,
    pub nats_url: Option<String>,
    pub checkout: CheckoutConfig,
    pub payment: PaymentConfig,
}

/// Pricing and lifecycle policy applied by the checkout services.
#[derive(Debug, Clone, Default)]
pub struct CheckoutConfig {
    pub charges: Charges,
    pub status_policy: OrderStatusPolicy,
}

#[derive(Debug, Clone)]
pub struct PaymentConfig {
    pub stripe_secret: Option<SecretString>,
    pub api_base: String,
    pub currency: String,
    /// Origin for success (`/orders`) and cancel (`/cart`) redirects.
    pub public_base_url: String,
}

impl PaymentConfig {
    pub fn success_url(&self) -> String { format!("{}/orders", self.public_base_url) }
    pub fn cancel_url(&self) -> String { format!("{}/cart", self.public_base_url) }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            stripe_secret: None,
            api_base: DEFAULT_API_BASE.to_string(),
            currency: "egp".to_string(),
            public_base_url: "http://localhost:8083".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the process environment, reading `.env` first if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`, which returns a variable's value if set.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let host = parse_or(&get, "HOST", IpAddr::from([0, 0, 0, 0]))?;
        let port = parse_or(&get, "PORT", 8083u16)?;
        let tax = parse_or(&get, "TAX_PRICE", Decimal::ZERO)?;
        let shipping = parse_or(&get, "SHIPPING_PRICE", Decimal::ZERO)?;
        if tax.is_sign_negative() || shipping.is_sign_negative() {
            return Err(ConfigError::InvalidEnvVar("TAX_PRICE/SHIPPING_PRICE".to_string(), "must not be negative".to_string()));
        }
        let status_policy = parse_or(&get, "ORDER_STATUS_POLICY", OrderStatusPolicy::Lenient)?;

        let defaults = PaymentConfig::default();
        let payment = PaymentConfig {
            stripe_secret: get("STRIPE_SECRET").map(SecretString::from),
            api_base: get("STRIPE_API_BASE").unwrap_or(defaults.api_base),
            currency: get("CURRENCY").map(|c| c.to_lowercase()).unwrap_or(defaults.currency),
            public_base_url: get("PUBLIC_BASE_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(defaults.public_base_url),
        };

        Ok(Self {
            host,
            port,
            database_url: get("DATABASE_URL").map(SecretString::from),
            nats_url: get("NATS_URL"),
            checkout: CheckoutConfig { charges: Charges::new(tax, shipping), status_policy },
            payment,
        })
    }

    /// Returns the socket address for binding the server.
    pub fn socket_addr(&self) -> SocketAddr { SocketAddr::new(self.host, self.port) }
}

fn parse_or<G, T>(get: &G, key: &str, default: T) -> Result<T, ConfigError>
where
    G: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        Some(raw) => raw.parse::<T>().map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        None => Ok(default),
    }
}
