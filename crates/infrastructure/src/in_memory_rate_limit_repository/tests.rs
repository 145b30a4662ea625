use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use remitdesk_application::{
    ManualClock, RateLimitRepository, RateLimitService, ip_identifier, user_identifier,
};

use super::InMemoryRateLimitRepository;

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 4, 8, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

fn service_at_start() -> (RateLimitService, Arc<InMemoryRateLimitRepository>, Arc<ManualClock>) {
    let repository = Arc::new(InMemoryRateLimitRepository::new());
    let clock = Arc::new(ManualClock::new(start()));
    let service = RateLimitService::new(repository.clone()).with_clock(clock.clone());
    (service, repository, clock)
}

#[tokio::test]
async fn window_boundary_allows_limit_then_denies_then_resets() {
    let (service, _repository, clock) = service_at_start();
    let window = Duration::seconds(60);

    for expected_count in 1..=3 {
        let decision = service.check("user_1", 3, window).await;
        assert!(decision.allowed);
        assert_eq!(decision.count, expected_count);
        assert_eq!(decision.reset_at, start() + window);
        clock.advance(Duration::seconds(10));
    }

    let denied = service.check("user_1", 3, window).await;
    assert!(!denied.allowed);
    assert_eq!(denied.count, 3);
    assert_eq!(denied.remaining(), 0);
    assert_eq!(denied.reset_at, start() + window);

    clock.advance(Duration::seconds(31));
    let reopened = service.check("user_1", 3, window).await;
    assert!(reopened.allowed);
    assert_eq!(reopened.count, 1);
    assert_eq!(reopened.window_started_at, start() + Duration::seconds(61));
}

#[tokio::test]
async fn window_is_still_open_exactly_at_its_length() {
    let (service, _repository, clock) = service_at_start();

    assert!(service.check("ip_1.2.3.4", 1, Duration::seconds(60)).await.allowed);
    clock.advance(Duration::seconds(60));
    assert!(!service.check("ip_1.2.3.4", 1, Duration::seconds(60)).await.allowed);
}

#[tokio::test]
async fn identifiers_never_share_windows() {
    let (service, _repository, _clock) = service_at_start();
    let window = Duration::seconds(60);

    assert!(service.check(&user_identifier("1"), 1, window).await.allowed);
    assert!(!service.check(&user_identifier("1"), 1, window).await.allowed);

    let ip = service.check(&ip_identifier("9.9.9.9"), 1, window).await;
    assert!(ip.allowed);
    assert_eq!(ip.count, 1);
}

#[tokio::test]
async fn sixth_request_from_ip_is_rejected() {
    let (service, _repository, clock) = service_at_start();
    let rule = remitdesk_application::RateLimitRule::new("ip", 5, 60);

    for _ in 0..5 {
        assert!(service.check_rate_limit(&rule, "ip_1.2.3.4").await.is_ok());
        clock.advance(Duration::seconds(1));
    }

    let rejected = service.check_rate_limit(&rule, "ip_1.2.3.4").await;
    match rejected {
        Err(remitdesk_core::AppError::RateLimited(exceeded)) => {
            assert_eq!(exceeded.limit, 5);
            assert_eq!(exceeded.reset_at_unix, (start() + Duration::seconds(60)).timestamp());
            assert_eq!(exceeded.retry_after_seconds, 55);
        }
        other => panic!("expected rate limited error, got {other:?}"),
    }
}

#[tokio::test]
async fn cleanup_evicts_only_stale_windows() {
    let (service, repository, clock) = service_at_start();

    let _ = service.check("ip_old", 10, Duration::seconds(60)).await;
    clock.advance(Duration::minutes(10));
    let _ = service.check("ip_new", 10, Duration::seconds(60)).await;

    let evicted = service.cleanup(Duration::minutes(5)).await;
    assert_eq!(evicted.ok(), Some(1));
    assert_eq!(repository.tracked_identifiers().ok(), Some(1));

    let decision = repository
        .check_and_record("ip_new", 10, Duration::seconds(60), start() + Duration::minutes(10))
        .await;
    assert_eq!(decision.map(|decision| decision.count).ok(), Some(2));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_checks_never_exceed_limit() {
    let repository = Arc::new(InMemoryRateLimitRepository::new());
    let service = RateLimitService::new(repository);

    let mut handles = Vec::new();
    for _ in 0..64 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            service
                .check("tenant_shared", 10, Duration::seconds(60))
                .await
                .allowed
        }));
    }

    let mut allowed = 0;
    for handle in handles {
        if handle.await.unwrap_or(false) {
            allowed += 1;
        }
    }

    assert_eq!(allowed, 10);
}
