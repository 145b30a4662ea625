use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use remitdesk_core::AppResult;

/// Repository port for rate limit windows.
#[async_trait]
pub trait RateLimitRepository: Send + Sync {
    /// Checks the window for `identifier` and counts the request if allowed.
    ///
    /// Opens a fresh window when none exists or the current one started more
    /// than `window` before `now`. Denied requests are not counted. The check
    /// and the update happen in one critical section.
    async fn check_and_record(
        &self,
        identifier: &str,
        max_attempts: u32,
        window: Duration,
        now: DateTime<Utc>,
    ) -> AppResult<RateLimitDecision>;

    /// Removes windows that started before the given cutoff.
    async fn cleanup_expired(&self, before: DateTime<Utc>) -> AppResult<u64>;
}

/// Outcome of a single rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    /// Whether the request fits in the budget.
    pub allowed: bool,
    /// Requests counted in the current window, including this one if allowed.
    pub count: u32,
    /// Budget of the window.
    pub limit: u32,
    /// Start of the current window.
    pub window_started_at: DateTime<Utc>,
    /// When the current window resets.
    pub reset_at: DateTime<Utc>,
}

impl RateLimitDecision {
    /// Returns the remaining budget in the current window.
    #[must_use]
    pub fn remaining(&self) -> u32 {
        self.limit.saturating_sub(self.count)
    }
}
