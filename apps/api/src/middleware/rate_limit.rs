use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Extension, Request, State};
use axum::http::header::USER_AGENT;
use axum::middleware::Next;
use axum::response::Response;
use remitdesk_application::{
    RateLimitRule, SecurityEvent, SecurityEventService, client_ip, ip_identifier,
    sensitive_identifier, tenant_identifier, user_identifier,
};
use remitdesk_core::{AppError, AppResult, UserIdentity};
use tracing::{debug, warn};

use crate::error::ApiResult;
use crate::state::AppState;

use super::route_template;

/// Endpoint families guarded by the stricter sensitive budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensitiveRouteClass {
    Authentication,
    PaymentInitiation,
}

impl SensitiveRouteClass {
    fn as_str(self) -> &'static str {
        match self {
            Self::Authentication => "authentication",
            Self::PaymentInitiation => "payment_initiation",
        }
    }
}

pub async fn rate_limit_by_ip(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    let ip = request_client_ip(&request);
    enforce(&state, &state.rate_limits.ip, ip_identifier(&ip).as_str()).await?;

    Ok(next.run(request).await)
}

/// Applies the per-user and per-tenant budgets. Both must pass.
///
/// Verified tenants get the tenant budget scaled by the configured multiplier.
pub async fn rate_limit_by_user_and_tenant(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    let Some(identity) = request.extensions().get::<UserIdentity>().cloned() else {
        return Ok(next.run(request).await);
    };

    enforce(
        &state,
        &state.rate_limits.user,
        user_identifier(identity.subject()).as_str(),
    )
    .await?;

    if let Some(tenant) = identity.tenant() {
        let rule = if tenant.is_verified() {
            state
                .rate_limits
                .tenant
                .scaled(state.rate_limits.verified_tenant_multiplier)
        } else {
            state.rate_limits.tenant.clone()
        };

        enforce(&state, &rule, tenant_identifier(tenant.tenant_id()).as_str()).await?;
    }

    Ok(next.run(request).await)
}

pub async fn rate_limit_sensitive(
    State(state): State<AppState>,
    Extension(class): Extension<SensitiveRouteClass>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    let ip = request_client_ip(&request);
    let identity = request.extensions().get::<UserIdentity>().cloned();
    let identifier = sensitive_identifier(identity.as_ref().map(UserIdentity::subject), &ip);

    match enforce(&state, &state.rate_limits.sensitive, identifier.as_str()).await {
        Ok(()) => Ok(next.run(request).await),
        Err(error) => {
            if class == SensitiveRouteClass::Authentication
                && matches!(error, AppError::RateLimited(_))
            {
                let user_agent = request
                    .headers()
                    .get(USER_AGENT)
                    .and_then(|value| value.to_str().ok())
                    .filter(|value| !value.is_empty())
                    .map(ToOwned::to_owned);

                spawn_security_event(
                    state.security_event_service.clone(),
                    SecurityEvent::auth_rate_limit_exceeded(
                        identity.as_ref().map(|user| user.subject().to_owned()),
                        identity.as_ref().and_then(UserIdentity::tenant_id),
                        Some(ip),
                        user_agent,
                        route_template(&request).as_str(),
                    ),
                );
            }

            debug!(
                class = class.as_str(),
                identifier = identifier.as_str(),
                "sensitive route throttled"
            );
            Err(error.into())
        }
    }
}

async fn enforce(state: &AppState, rule: &RateLimitRule, identifier: &str) -> AppResult<()> {
    match state
        .rate_limit_service
        .check_rate_limit(rule, identifier)
        .await
    {
        Ok(_) => Ok(()),
        Err(error) => {
            warn!(
                category = rule.category.as_str(),
                identifier,
                limit = rule.max_attempts,
                "rate limit exceeded"
            );
            Err(error)
        }
    }
}

/// Records the event off the request path; failures are only logged.
fn spawn_security_event(service: SecurityEventService, event: SecurityEvent) {
    tokio::spawn(async move {
        if let Err(error) = service.record_event(event).await {
            debug!(error = %error, "failed to record security event");
        }
    });
}

fn request_client_ip(request: &Request) -> String {
    let header = |name: &str| {
        request
            .headers()
            .get(name)
            .and_then(|value| value.to_str().ok())
    };
    let remote_address = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(address)| address.to_string());

    client_ip(
        header("x-forwarded-for"),
        header("x-real-ip"),
        remote_address.as_deref(),
    )
}
