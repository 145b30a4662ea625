use std::convert::Infallible;
use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, Response};
use remitdesk_application::{
    IdempotencyService, RateLimitRule, RateLimitService, SecurityEvent, SecurityEventRepository,
    SecurityEventService, TransactionService,
};
use remitdesk_core::{AppError, AppResult, TenantId, TenantScope, UserIdentity};
use remitdesk_infrastructure::{
    InMemoryIdempotencyRepository, InMemoryRateLimitRepository, InMemoryTransactionRepository,
};
use tokio::sync::Mutex;
use tower::ServiceExt;

use crate::state::{AppState, RateLimitPolicies};

#[derive(Default)]
pub struct RecordingSecurityEventRepository {
    pub events: Mutex<Vec<SecurityEvent>>,
    pub fail: bool,
}

#[async_trait]
impl SecurityEventRepository for RecordingSecurityEventRepository {
    async fn append_event(&self, event: SecurityEvent) -> AppResult<()> {
        if self.fail {
            return Err(AppError::Internal("security event store offline".to_owned()));
        }

        self.events.lock().await.push(event);
        Ok(())
    }
}

pub struct TestHarness {
    pub state: AppState,
    pub idempotency_repository: Arc<InMemoryIdempotencyRepository>,
    pub security_events: Arc<RecordingSecurityEventRepository>,
}

pub fn generous_policies() -> RateLimitPolicies {
    RateLimitPolicies {
        ip: RateLimitRule::new("ip", 1_000, 60),
        user: RateLimitRule::new("user", 1_000, 60),
        tenant: RateLimitRule::new("tenant", 1_000, 60),
        sensitive: RateLimitRule::new("sensitive", 1_000, 60),
        verified_tenant_multiplier: 1.5,
    }
}

pub fn harness(policies: RateLimitPolicies) -> TestHarness {
    harness_with_events(policies, RecordingSecurityEventRepository::default())
}

pub fn harness_with_events(
    policies: RateLimitPolicies,
    security_events: RecordingSecurityEventRepository,
) -> TestHarness {
    let idempotency_repository = Arc::new(InMemoryIdempotencyRepository::new());
    let security_events = Arc::new(security_events);

    let state = AppState {
        transaction_service: TransactionService::new(Arc::new(
            InMemoryTransactionRepository::new(),
        )),
        idempotency_service: IdempotencyService::new(idempotency_repository.clone(), 0),
        rate_limit_service: RateLimitService::new(Arc::new(InMemoryRateLimitRepository::new())),
        security_event_service: SecurityEventService::new(security_events.clone()),
        rate_limits: policies,
    };

    TestHarness {
        state,
        idempotency_repository,
        security_events,
    }
}

pub fn tenant_user(subject: &str, tenant_id: TenantId, verified: bool) -> UserIdentity {
    UserIdentity::new(
        subject,
        subject,
        None,
        Some(TenantScope::new(tenant_id, verified)),
    )
}

pub fn unscoped_user(subject: &str) -> UserIdentity {
    UserIdentity::new(subject, subject, None, None)
}

/// Builds a request; `identity` stands in for the session-backed sign-in.
pub fn request(
    method: &str,
    uri: &str,
    identity: Option<&UserIdentity>,
    headers: &[(&str, &str)],
    body: &str,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    if let Some(identity) = identity {
        builder = builder.extension(identity.clone());
    }

    builder
        .body(Body::from(body.to_owned()))
        .unwrap_or_else(|_| unreachable!())
}

pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone()
        .oneshot(request)
        .await
        .unwrap_or_else(|error: Infallible| match error {})
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX)
        .await
        .map(|bytes| bytes.to_vec())
        .unwrap_or_default()
}
