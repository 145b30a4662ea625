use axum::extract::State;
use axum::http::header::USER_AGENT;
use axum::http::{HeaderMap, StatusCode};
use remitdesk_application::SecurityEvent;
use remitdesk_core::{AppError, UserIdentity};
use tower_sessions::Session;
use tracing::warn;

use crate::error::ApiResult;
use crate::middleware::SESSION_USER_KEY;
use crate::state::AppState;

pub async fn logout_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    session: Session,
) -> ApiResult<StatusCode> {
    let identity = session
        .get::<UserIdentity>(SESSION_USER_KEY)
        .await
        .map_err(|error| AppError::Internal(format!("failed to read session identity: {error}")))?;

    session
        .flush()
        .await
        .map_err(|error| AppError::Internal(format!("failed to delete session: {error}")))?;

    let ip_address = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned);
    let user_agent = headers
        .get(USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned);

    let event = SecurityEvent {
        subject: identity.as_ref().map(|user| user.subject().to_owned()),
        tenant_id: identity.as_ref().and_then(UserIdentity::tenant_id),
        event_type: "logout".to_owned(),
        outcome: "success".to_owned(),
        ip_address,
        user_agent,
        detail: None,
    };
    if let Err(error) = state.security_event_service.record_event(event).await {
        warn!(error = %error, "failed to record logout event");
    }

    Ok(StatusCode::NO_CONTENT)
}
