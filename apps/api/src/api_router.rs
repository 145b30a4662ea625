use axum::Router;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderName, HeaderValue, Method};
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post};
use remitdesk_core::AppError;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tower_sessions::SessionManagerLayer;
use tower_sessions_sqlx_store::PostgresStore;

use crate::middleware::{IDEMPOTENCY_KEY_HEADER, SensitiveRouteClass};
use crate::state::AppState;
use crate::{handlers, middleware};


pub fn build_router(
    app_state: AppState,
    frontend_url: &str,
    session_layer: SessionManagerLayer<PostgresStore>,
) -> Result<Router, AppError> {
    let cors_layer = CorsLayer::new()
        .allow_origin(
            HeaderValue::from_str(frontend_url)
                .map_err(|error| AppError::Internal(format!("invalid FRONTEND_URL: {error}")))?,
        )
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            CONTENT_TYPE,
            HeaderName::from_static(IDEMPOTENCY_KEY_HEADER),
        ]);

    Ok(build_api_routes(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .layer(session_layer))
}

/// Route table with the rate limit and idempotency middleware, without
/// transport layers.
pub fn build_api_routes(app_state: AppState) -> Router {
    // Route layers run bottom-up: auth, then budgets, then idempotency.
    let ledger_routes = Router::new()
        .route(
            "/api/transactions",
            get(handlers::transactions::list_transactions_handler)
                .post(handlers::transactions::create_transaction_handler),
        )
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::idempotency,
        ))
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::rate_limit_by_user_and_tenant,
        ))
        .route_layer(from_fn(middleware::require_auth));

    let payment_routes = Router::new()
        .route(
            "/api/payments",
            post(handlers::payments::create_payment_handler),
        )
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::idempotency,
        ))
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::rate_limit_sensitive,
        ))
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::rate_limit_by_user_and_tenant,
        ))
        .route_layer(from_fn(middleware::require_auth))
        .layer(axum::Extension(SensitiveRouteClass::PaymentInitiation));

    let auth_routes = Router::new()
        .route("/auth/logout", post(handlers::auth::logout_handler))
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::rate_limit_sensitive,
        ))
        .layer(axum::Extension(SensitiveRouteClass::Authentication));

    Router::new()
        .route("/health", get(handlers::health::health_handler))
        .merge(ledger_routes)
        .merge(payment_routes)
        .merge(auth_routes)
        .layer(from_fn_with_state(
            app_state.clone(),
            middleware::rate_limit_by_ip,
        ))
        .layer(from_fn(middleware::attach_identity))
        .with_state(app_state)
}
