use axum::Json;
use axum::http::header::RETRY_AFTER;
use axum::http::{HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use remitdesk_core::{AppError, RateLimitExceeded};
use tracing::error;

mod types;

pub use types::IdempotencyErrorResponse;
use types::{ErrorResponse, RateLimitErrorResponse};

const X_RATE_LIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
const X_RATE_LIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
const X_RATE_LIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// HTTP API error wrapper around core application errors.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(value: AppError) -> Self {
        Self(value)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::RateLimited(exceeded) => return rate_limited_response(exceeded),
            AppError::Internal(detail) => {
                error!(error = %detail, "request failed with internal error");
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse::new("internal server error".to_owned())),
                )
                    .into_response();
            }
        };

        let payload = Json(ErrorResponse::new(self.0.to_string()));

        (status, payload).into_response()
    }
}

fn rate_limited_response(exceeded: &RateLimitExceeded) -> Response {
    (
        StatusCode::TOO_MANY_REQUESTS,
        [
            (X_RATE_LIMIT_LIMIT, exceeded.limit.to_string()),
            (X_RATE_LIMIT_REMAINING, "0".to_owned()),
            (X_RATE_LIMIT_RESET, exceeded.reset_at_unix.to_string()),
            (RETRY_AFTER, exceeded.retry_after_seconds.max(1).to_string()),
        ],
        Json(RateLimitErrorResponse::new(
            exceeded.message.clone(),
            exceeded.reset_at_unix,
        )),
    )
        .into_response()
}

/// Standard API result type.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use remitdesk_core::{AppError, RateLimitExceeded};
    use serde_json::Value;

    use super::ApiError;

    #[tokio::test]
    async fn rate_limited_error_carries_headers_and_reset_hint() {
        let response = ApiError(AppError::RateLimited(RateLimitExceeded {
            message: "too many requests, please try again in 55 seconds".to_owned(),
            limit: 5,
            reset_at_unix: 1_700_000_060,
            retry_after_seconds: 55,
        }))
        .into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let header = |name: &str| {
            response
                .headers()
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(ToOwned::to_owned)
        };
        assert_eq!(header("x-ratelimit-limit").as_deref(), Some("5"));
        assert_eq!(header("x-ratelimit-remaining").as_deref(), Some("0"));
        assert_eq!(header("x-ratelimit-reset").as_deref(), Some("1700000060"));
        assert_eq!(header("retry-after").as_deref(), Some("55"));

        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap_or_default();
        let payload: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
        assert_eq!(payload["error"], "rate_limit_exceeded");
        assert_eq!(payload["retryAfter"], 1_700_000_060_i64);
        assert!(
            payload["message"]
                .as_str()
                .is_some_and(|message| message.contains("55 seconds"))
        );
    }

    #[tokio::test]
    async fn internal_errors_hide_details() {
        let response =
            ApiError(AppError::Internal("connection refused to 10.0.0.5".to_owned())).into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap_or_default();
        let payload: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
        assert_eq!(payload["message"], "internal server error");
    }
}
