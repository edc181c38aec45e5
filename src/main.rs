//! OpenSASE Checkout - cart, coupon and order service

use std::sync::Arc;

use anyhow::{Context, Result};
use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use opensase_checkout::config::AppConfig;
use opensase_checkout::http::{self, AppState, SERVICE_NAME};
use opensase_checkout::messaging::{EventPublisher, LogPublisher, NatsPublisher};
use opensase_checkout::payment::{DisabledGateway, PaymentGateway, StripeGateway};
use opensase_checkout::services::Services;
use opensase_checkout::store::Stores;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();
    let config = AppConfig::from_env().context("failed to load configuration")?;

    let stores = match &config.database_url {
        Some(url) => {
            let db = PgPoolOptions::new().max_connections(10).connect(url.expose_secret()).await.context("failed to connect to database")?;
            sqlx::migrate!("./migrations").run(&db).await.context("failed to run migrations")?;
            tracing::info!("using PostgreSQL store");
            Stores::postgres(db)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store");
            Stores::memory()
        }
    };

    let events: Arc<dyn EventPublisher> = match &config.nats_url {
        Some(url) => match NatsPublisher::connect(url).await {
            Ok(publisher) => Arc::new(publisher),
            Err(e) => {
                tracing::warn!(error = %e, "NATS unavailable, events will only be logged");
                Arc::new(LogPublisher)
            }
        },
        None => Arc::new(LogPublisher),
    };

    let gateway: Arc<dyn PaymentGateway> = match &config.payment.stripe_secret {
        Some(secret) => Arc::new(StripeGateway::new(secret.clone(), config.payment.api_base.clone())?),
        None => {
            tracing::warn!("STRIPE_SECRET not set, card checkout is disabled");
            Arc::new(DisabledGateway)
        }
    };

    let services = Services::new(stores, gateway, events, config.checkout.clone(), config.payment.clone());
    let app = http::router(AppState { services });

    let addr = config.socket_addr();
    tracing::info!(policy = ?config.checkout.status_policy, "🚀 {SERVICE_NAME} listening on {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    tracing::info!("server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
