use serde::Serialize;
use ts_rs::TS;

/// API error payload.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/error-response.ts"
)]
pub struct ErrorResponse {
    message: String,
}

impl ErrorResponse {
    pub(super) fn new(message: String) -> Self {
        Self { message }
    }
}

/// Payload of a 429 response.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/rate-limit-error-response.ts"
)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitErrorResponse {
    error: String,
    message: String,
    /// Unix seconds at which the window resets.
    #[ts(type = "number")]
    retry_after: i64,
}

impl RateLimitErrorResponse {
    pub(super) fn new(message: String, retry_after: i64) -> Self {
        Self {
            error: "rate_limit_exceeded".to_owned(),
            message,
            retry_after,
        }
    }
}

/// Payload of an idempotency conflict.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/idempotency-error-response.ts"
)]
pub struct IdempotencyErrorResponse {
    error: String,
}

impl IdempotencyErrorResponse {
    pub(crate) fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
