//! Buffers a handler response so its outcome can be stored for replay while the
//! client still receives it unchanged.

use axum::body::{Body, to_bytes};
use axum::http::StatusCode;
use axum::response::Response;
use remitdesk_core::AppError;

/// Captured status and body of a response.
///
/// With a limit set, a body that grows past it is dropped from the capture and
/// the capture is marked as overflowed. The forwarded response is unaffected.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ResponseCapture {
    status: Option<StatusCode>,
    body: Vec<u8>,
    limit: Option<usize>,
    overflowed: bool,
}

impl ResponseCapture {
    /// Creates an unbounded capture.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a capture that keeps at most `limit` body bytes.
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }

    /// Records the status. Only the first call has an effect.
    pub fn set_status(&mut self, status: StatusCode) {
        if self.status.is_none() {
            self.status = Some(status);
        }
    }

    /// Appends body bytes.
    pub fn write(&mut self, chunk: &[u8]) {
        if self.overflowed {
            return;
        }

        let exceeds = self
            .limit
            .is_some_and(|limit| self.body.len().saturating_add(chunk.len()) > limit);
        if exceeds {
            self.overflowed = true;
            self.body = Vec::new();
            return;
        }

        self.body.extend_from_slice(chunk);
    }

    /// Status sent to the client, 200 when none was set.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    /// True when the body outgrew the limit and was not kept.
    #[must_use]
    pub fn is_overflowed(&self) -> bool {
        self.overflowed
    }

    /// Captured body bytes so far.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Consumes the capture, returning the body bytes.
    #[must_use]
    pub fn into_body(self) -> Vec<u8> {
        self.body
    }
}

/// Reads `response` into a capture and rebuilds an identical response.
///
/// The whole body is always forwarded. Only the capture honours `capture_limit`.
/// Fails when the body stream itself errors.
pub async fn capture_response(
    response: Response,
    capture_limit: usize,
) -> Result<(Response, ResponseCapture), AppError> {
    let (parts, body) = response.into_parts();
    let bytes = to_bytes(body, usize::MAX)
        .await
        .map_err(|error| AppError::Internal(format!("failed to buffer response body: {error}")))?;

    let mut capture = ResponseCapture::with_limit(capture_limit);
    capture.set_status(parts.status);
    capture.write(&bytes);

    Ok((Response::from_parts(parts, Body::from(bytes)), capture))
}

#[cfg(test)]
mod tests {
    use axum::Json;
    use axum::body::to_bytes;
    use axum::http::{StatusCode, header};
    use axum::response::IntoResponse;
    use serde_json::json;

    use super::{ResponseCapture, capture_response};

    #[test]
    fn first_status_wins_and_default_is_ok() {
        let mut capture = ResponseCapture::new();
        assert_eq!(capture.status(), StatusCode::OK);

        capture.write(b"{\"id\":");
        capture.set_status(StatusCode::CREATED);
        capture.set_status(StatusCode::INTERNAL_SERVER_ERROR);
        capture.write(b"\"tx_1\"}");

        assert_eq!(capture.status(), StatusCode::CREATED);
        assert_eq!(capture.body(), b"{\"id\":\"tx_1\"}");
    }

    #[tokio::test]
    async fn captured_response_is_forwarded_unchanged() {
        let original = (StatusCode::CREATED, Json(json!({ "id": "tx_1" }))).into_response();

        let captured = capture_response(original, 1024).await;
        assert!(captured.is_ok());
        let (response, capture) = captured.unwrap_or_else(|_| unreachable!());

        assert_eq!(capture.status(), StatusCode::CREATED);
        assert_eq!(capture.body(), br#"{"id":"tx_1"}"#);
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            response
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|value| value.to_str().ok()),
            Some("application/json")
        );

        let forwarded = to_bytes(response.into_body(), 1024)
            .await
            .unwrap_or_default();
        assert_eq!(forwarded.as_ref(), br#"{"id":"tx_1"}"#);
    }

    #[test]
    fn write_past_limit_drops_the_capture() {
        let mut capture = ResponseCapture::with_limit(8);
        capture.write(b"1234");
        assert!(!capture.is_overflowed());

        capture.write(b"56789");
        capture.write(b"0");

        assert!(capture.is_overflowed());
        assert!(capture.body().is_empty());
    }

    #[tokio::test]
    async fn oversized_body_is_still_forwarded_in_full() {
        let payload = "x".repeat(64);
        let original = (StatusCode::CREATED, payload.clone()).into_response();

        let captured = capture_response(original, 16).await;
        assert!(captured.is_ok());
        let (response, capture) = captured.unwrap_or_else(|_| unreachable!());

        assert!(capture.is_overflowed());
        assert_eq!(capture.status(), StatusCode::CREATED);
        assert_eq!(response.status(), StatusCode::CREATED);
        let forwarded = to_bytes(response.into_body(), 1024)
            .await
            .unwrap_or_default();
        assert_eq!(forwarded.as_ref(), payload.as_bytes());
    }
}
