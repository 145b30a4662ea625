//! Remitdesk API composition root.

#![forbid(unsafe_code)]

mod api_config;
mod api_router;
mod api_services;
mod dto;
mod error;
mod handlers;
mod middleware;
mod rate_limit_sweeper;
mod response_capture;
mod state;

#[cfg(test)]
mod test_support;

use std::net::SocketAddr;
use std::time::Duration;

use remitdesk_core::AppError;
use tracing::{info, warn};

use crate::api_config::{ApiConfig, init_tracing};
use crate::api_router::build_router;
use crate::api_services::{build_app_state, build_postgres_session_layer, connect_and_migrate};
use crate::rate_limit_sweeper::spawn_rate_limit_sweeper;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ApiConfig::load()?;
    let pool = connect_and_migrate(&config.database_url).await?;

    if config.migrate_only {
        info!("database migrations applied successfully");
        return Ok(());
    }

    let session_layer = build_postgres_session_layer(pool.clone(), config.cookie_secure).await?;
    let app_state = build_app_state(pool, &config);

    let retention = i64::try_from(config.rate_limits.retention_seconds)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .ok_or_else(|| {
            AppError::Validation("RATE_LIMIT_RETENTION_SECONDS is out of range".to_owned())
        })?;
    let sweeper = spawn_rate_limit_sweeper(
        app_state.rate_limit_service.clone(),
        app_state.idempotency_service.clone(),
        Duration::from_secs(config.rate_limits.sweep_interval_seconds),
        retention,
    );

    let app = build_router(app_state, &config.frontend_url, session_layer)?;
    let address = config.socket_address()?;
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind listener: {error}")))?;

    info!(%address, "remitdesk-api listening");

    let served = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|error| AppError::Internal(format!("api server error: {error}")));

    sweeper.shutdown().await;
    served
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(error = %error, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
