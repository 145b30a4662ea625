use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use remitdesk_core::{AppError, AppResult, TenantId};

use crate::clock::ManualClock;

use super::{
    RateLimitDecision, RateLimitRepository, RateLimitRule, RateLimitService, client_ip,
    ip_identifier, sensitive_identifier, tenant_identifier, user_identifier,
};

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

/// Counts every call and denies once `deny_after` calls were seen.
struct CountingRepository {
    calls: Mutex<u32>,
    deny_after: u32,
}

#[async_trait]
impl RateLimitRepository for CountingRepository {
    async fn check_and_record(
        &self,
        _identifier: &str,
        max_attempts: u32,
        window: Duration,
        now: DateTime<Utc>,
    ) -> AppResult<RateLimitDecision> {
        let mut calls = self
            .calls
            .lock()
            .map_err(|error| AppError::Internal(format!("failed to lock calls: {error}")))?;
        *calls += 1;

        Ok(RateLimitDecision {
            allowed: *calls <= self.deny_after,
            count: (*calls).min(max_attempts),
            limit: max_attempts,
            window_started_at: now,
            reset_at: now + window,
        })
    }

    async fn cleanup_expired(&self, _before: DateTime<Utc>) -> AppResult<u64> {
        Ok(0)
    }
}

struct FailingRepository;

#[async_trait]
impl RateLimitRepository for FailingRepository {
    async fn check_and_record(
        &self,
        _identifier: &str,
        _max_attempts: u32,
        _window: Duration,
        _now: DateTime<Utc>,
    ) -> AppResult<RateLimitDecision> {
        Err(AppError::Internal("limiter table unavailable".to_owned()))
    }

    async fn cleanup_expired(&self, _before: DateTime<Utc>) -> AppResult<u64> {
        Err(AppError::Internal("limiter table unavailable".to_owned()))
    }
}

#[tokio::test]
async fn repository_failure_fails_open() {
    let service = RateLimitService::new(Arc::new(FailingRepository));

    let decision = service.check("ip_1.2.3.4", 1, Duration::seconds(60)).await;
    assert!(decision.allowed);

    let rule = RateLimitRule::new("ip", 1, 60);
    assert!(service.check_rate_limit(&rule, "ip_1.2.3.4").await.is_ok());
}

#[tokio::test]
async fn invalid_arguments_fail_open_without_touching_repository() {
    let repository = Arc::new(CountingRepository {
        calls: Mutex::new(0),
        deny_after: 0,
    });
    let service = RateLimitService::new(repository.clone());

    assert!(service.check("", 5, Duration::seconds(60)).await.allowed);
    assert!(service.check("ip_1.2.3.4", 0, Duration::seconds(60)).await.allowed);
    assert!(service.check("ip_1.2.3.4", 5, Duration::zero()).await.allowed);

    let calls = repository.calls.lock().map(|calls| *calls).unwrap_or(u32::MAX);
    assert_eq!(calls, 0);
}

#[tokio::test]
async fn unrepresentable_window_fails_open() {
    let repository = Arc::new(CountingRepository {
        calls: Mutex::new(0),
        deny_after: 0,
    });
    let service = RateLimitService::new(repository.clone());
    let rule = RateLimitRule::new("ip", 5, 10_000_000_000_000);

    for _ in 0..10 {
        let decision = service.check_rate_limit(&rule, "ip_1.2.3.4").await;
        assert!(decision.is_ok_and(|decision| decision.allowed));
    }
    assert!(
        service
            .check("ip_1.2.3.4", 5, Duration::MAX)
            .await
            .allowed
    );

    let calls = repository.calls.lock().map(|calls| *calls).unwrap_or(u32::MAX);
    assert_eq!(calls, 0);
}

#[tokio::test]
async fn cleanup_rejects_unrepresentable_retention() {
    let service = RateLimitService::new(Arc::new(CountingRepository {
        calls: Mutex::new(0),
        deny_after: 0,
    }));

    let result = service.cleanup(Duration::MAX).await;
    assert!(matches!(result, Err(AppError::Validation(_))));
    assert_eq!(service.cleanup(Duration::hours(1)).await.ok(), Some(0));
}

#[tokio::test]
async fn exceeded_budget_reports_reset_hint() {
    let clock = Arc::new(ManualClock::new(start()));
    let service = RateLimitService::new(Arc::new(CountingRepository {
        calls: Mutex::new(0),
        deny_after: 1,
    }))
    .with_clock(clock.clone());
    let rule = RateLimitRule::new("user", 1, 60);

    assert!(service.check_rate_limit(&rule, "user_42").await.is_ok());

    clock.advance(Duration::seconds(15));
    let result = service.check_rate_limit(&rule, "user_42").await;
    match result {
        Err(AppError::RateLimited(exceeded)) => {
            assert_eq!(exceeded.limit, 1);
            assert_eq!(
                exceeded.reset_at_unix,
                (start() + Duration::seconds(75)).timestamp()
            );
            assert_eq!(exceeded.retry_after_seconds, 60);
            assert!(exceeded.message.contains("60 seconds"));
        }
        other => panic!("expected rate limited error, got {other:?}"),
    }
}

#[test]
fn verified_tenant_multiplier_scales_budget() {
    let rule = RateLimitRule::new("tenant", 100, 60);

    assert_eq!(rule.scaled(1.5).max_attempts, 150);
    assert_eq!(rule.scaled(0.001).max_attempts, 1);
    assert_eq!(rule.scaled(f64::NAN).max_attempts, 100);
    assert_eq!(rule.scaled(1.5).window_seconds, 60);
}

#[test]
fn client_ip_prefers_first_forwarded_entry() {
    assert_eq!(
        client_ip(
            Some(" 203.0.113.7 , 10.0.0.1"),
            Some("198.51.100.1"),
            Some("10.0.0.2:5000")
        ),
        "203.0.113.7"
    );
}

#[test]
fn client_ip_falls_back_to_real_ip_then_connection() {
    assert_eq!(
        client_ip(Some("  "), Some("198.51.100.1"), Some("10.0.0.2:5000")),
        "198.51.100.1"
    );
    assert_eq!(client_ip(None, None, Some("10.0.0.2:5000")), "10.0.0.2");
    assert_eq!(client_ip(None, None, Some("[2001:db8::1]:443")), "2001:db8::1");
    assert_eq!(client_ip(None, None, Some("gateway.internal:8080")), "gateway.internal");
    assert_eq!(client_ip(None, None, None), "unknown");
}

#[test]
fn identifiers_are_namespaced_by_policy() {
    let tenant_id = TenantId::new();

    assert_eq!(ip_identifier("1.2.3.4"), "ip_1.2.3.4");
    assert_eq!(user_identifier("42"), "user_42");
    assert_eq!(tenant_identifier(tenant_id), format!("tenant_{tenant_id}"));
    assert_eq!(sensitive_identifier(Some("42"), "1.2.3.4"), "sensitive_user_42");
    assert_eq!(sensitive_identifier(None, "1.2.3.4"), "ip_1.2.3.4");
}

proptest::proptest! {
    #[test]
    fn user_and_ip_buckets_never_collide(subject in "[a-z0-9._-]{1,24}", ip in "[0-9.:a-f]{1,39}") {
        proptest::prop_assert_ne!(user_identifier(&subject), ip_identifier(&ip));
        proptest::prop_assert_ne!(
            sensitive_identifier(Some(&subject), &ip),
            user_identifier(&subject)
        );
    }

    #[test]
    fn forwarded_for_wins_over_other_sources(
        first in "[0-9]{1,3}(\\.[0-9]{1,3}){3}",
        rest in "[0-9]{1,3}(\\.[0-9]{1,3}){3}",
    ) {
        let header = format!(" {first} , {rest}");
        proptest::prop_assert_eq!(
            client_ip(Some(&header), Some("10.0.0.9"), Some("127.0.0.1:8080")),
            first
        );
    }
}
