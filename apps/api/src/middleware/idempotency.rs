use axum::Json;
use axum::body::{Body, to_bytes};
use axum::extract::{Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use remitdesk_application::{
    IdempotencyConflict, IdempotencyDecision, IdempotentRequest, StoredResponse,
};
use remitdesk_core::{AppError, UserIdentity};
use remitdesk_domain::{IdempotencyKey, IdempotencyScope, RequestHash};
use tracing::{debug, error, warn};

use crate::error::{ApiResult, IdempotencyErrorResponse};
use crate::response_capture::capture_response;
use crate::state::AppState;

use super::route_template;

/// Header carrying the client idempotency key.
pub const IDEMPOTENCY_KEY_HEADER: &str = "x-idempotency-key";

/// Upper bound for buffered request bodies and for stored response bodies.
const MAX_IDEMPOTENT_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Deduplicates retried POST requests carrying `X-Idempotency-Key`.
///
/// Requests without a usable key or without a tenant pass through untouched.
pub async fn idempotency(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    if request.method() != Method::POST {
        return Ok(next.run(request).await);
    }

    let Some(key) = idempotency_key(request.headers()) else {
        return Ok(next.run(request).await);
    };

    let identity = request.extensions().get::<UserIdentity>();
    let Some(tenant_id) = identity.and_then(UserIdentity::tenant_id) else {
        return Ok(next.run(request).await);
    };
    let user_id = identity.map(|user| user.subject().to_owned());

    let scope = IdempotencyScope {
        tenant_id,
        key,
        route_template: route_template(&request),
        method: request.method().as_str().to_owned(),
    };

    let (parts, body) = request.into_parts();
    let body = to_bytes(body, MAX_IDEMPOTENT_BODY_BYTES)
        .await
        .map_err(|error| {
            AppError::Validation(format!("request body could not be read: {error}"))
        })?;
    let request_hash = RequestHash::of_body(&body);
    let request = Request::from_parts(parts, Body::from(body));

    let decision = state
        .idempotency_service
        .begin(IdempotentRequest {
            scope: scope.clone(),
            request_hash,
            user_id,
        })
        .await?;

    let claim = match decision {
        IdempotencyDecision::Claimed(claim) => claim,
        IdempotencyDecision::Replay(stored) => {
            debug!(
                key = scope.key.as_str(),
                route = scope.route_template.as_str(),
                "replaying stored idempotent response"
            );
            return Ok(replay_response(stored));
        }
        IdempotencyDecision::Conflict(conflict) => {
            debug!(
                key = scope.key.as_str(),
                route = scope.route_template.as_str(),
                reason = conflict.message(),
                "idempotency conflict"
            );
            return Ok(conflict_response(conflict));
        }
    };

    let response = next.run(request).await;
    let handler_status = response.status();
    let (response, capture) = match capture_response(response, MAX_IDEMPOTENT_BODY_BYTES).await {
        Ok(captured) => captured,
        Err(capture_error) => {
            // Only failed outcomes may free the key.
            if handler_status.is_success() {
                warn!(
                    key = scope.key.as_str(),
                    route = scope.route_template.as_str(),
                    "response body unreadable, idempotency key held until expiry"
                );
            } else if let Err(release_error) = state.idempotency_service.release(claim).await {
                warn!(error = %release_error, "failed to release idempotency claim");
            }
            return Err(capture_error.into());
        }
    };

    let status = capture.status();
    if capture.is_overflowed() && status.is_success() {
        warn!(
            key = scope.key.as_str(),
            route = scope.route_template.as_str(),
            limit = MAX_IDEMPOTENT_BODY_BYTES,
            "response too large to store, idempotency key held until expiry"
        );
        return Ok(response);
    }

    debug!(
        key = scope.key.as_str(),
        status = status.as_u16(),
        body_bytes = capture.body().len(),
        "finishing idempotent request"
    );

    // The handler already ran, so its response goes out even if storing it fails.
    if let Err(finish_error) = state
        .idempotency_service
        .finish(claim, status.as_u16(), capture.into_body())
        .await
    {
        error!(
            key = scope.key.as_str(),
            route = scope.route_template.as_str(),
            error = %finish_error,
            "failed to record idempotent outcome"
        );
    }

    Ok(response)
}

/// Trimmed key from the header. Empty, oversized or non-ASCII values count as absent.
fn idempotency_key(headers: &HeaderMap) -> Option<IdempotencyKey> {
    headers
        .get(IDEMPOTENCY_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| IdempotencyKey::new(value).ok())
}

fn replay_response(stored: StoredResponse) -> Response {
    let status = StatusCode::from_u16(stored.status_code).unwrap_or(StatusCode::OK);

    (status, [(CONTENT_TYPE, "application/json")], stored.body).into_response()
}

fn conflict_response(conflict: IdempotencyConflict) -> Response {
    (
        StatusCode::CONFLICT,
        Json(IdempotencyErrorResponse::new(conflict.message())),
    )
        .into_response()
}
