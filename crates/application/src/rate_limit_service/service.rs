use std::sync::Arc;

use chrono::Duration;
use tracing::warn;

use remitdesk_core::{AppError, AppResult, RateLimitExceeded};

use crate::clock::{Clock, SystemClock};

use super::config::RateLimitRule;
use super::ports::{RateLimitDecision, RateLimitRepository};

/// Application service for rate limiting.
#[derive(Clone)]
pub struct RateLimitService {
    repository: Arc<dyn RateLimitRepository>,
    clock: Arc<dyn Clock>,
}

impl RateLimitService {
    /// Creates a new rate limit service.
    #[must_use]
    pub fn new(repository: Arc<dyn RateLimitRepository>) -> Self {
        Self {
            repository,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replaces the time source.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Checks and counts one request for `identifier`.
    ///
    /// Invalid arguments and repository failures are logged and allowed so a
    /// limiter fault never blocks traffic.
    pub async fn check(&self, identifier: &str, limit: u32, window: Duration) -> RateLimitDecision {
        let now = self.clock.now();
        let reset_at = now.checked_add_signed(window);
        let allow_open = RateLimitDecision {
            allowed: true,
            count: 0,
            limit,
            window_started_at: now,
            reset_at: reset_at.unwrap_or(now),
        };

        if identifier.trim().is_empty()
            || limit == 0
            || window <= Duration::zero()
            || reset_at.is_none()
        {
            warn!(
                identifier,
                limit,
                window_seconds = window.num_seconds(),
                "ignoring rate limit check with invalid arguments"
            );
            return allow_open;
        }

        match self
            .repository
            .check_and_record(identifier, limit, window, now)
            .await
        {
            Ok(decision) => decision,
            Err(error) => {
                warn!(identifier, error = %error, "rate limit check failed, allowing request");
                allow_open
            }
        }
    }

    /// Checks `identifier` against a rule.
    ///
    /// Returns the decision if allowed, or `Err(AppError::RateLimited)` with
    /// the reset hint when the budget is exhausted.
    pub async fn check_rate_limit(
        &self,
        rule: &RateLimitRule,
        identifier: &str,
    ) -> AppResult<RateLimitDecision> {
        let decision = self
            .check(identifier, rule.max_attempts, rule.window())
            .await;

        if decision.allowed {
            return Ok(decision);
        }

        let retry_after_seconds = u64::try_from(
            decision
                .reset_at
                .signed_duration_since(self.clock.now())
                .num_seconds()
                .max(0),
        )
        .unwrap_or_default();

        Err(AppError::RateLimited(RateLimitExceeded {
            message: format!(
                "too many requests, please try again in {retry_after_seconds} seconds"
            ),
            limit: decision.limit,
            reset_at_unix: decision.reset_at.timestamp(),
            retry_after_seconds,
        }))
    }

    /// Removes windows idle for longer than `retention`.
    pub async fn cleanup(&self, retention: Duration) -> AppResult<u64> {
        let cutoff = self
            .clock
            .now()
            .checked_sub_signed(retention)
            .ok_or_else(|| {
                AppError::Validation(format!(
                    "rate limit retention of {}s is out of range",
                    retention.num_seconds()
                ))
            })?;
        self.repository.cleanup_expired(cutoff).await
    }
}
