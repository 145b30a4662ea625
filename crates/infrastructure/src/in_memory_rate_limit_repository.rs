//! Process-local rate limit windows.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use remitdesk_application::{RateLimitDecision, RateLimitRepository};
use remitdesk_core::{AppError, AppResult};
use remitdesk_domain::RateWindow;

#[cfg(test)]
mod tests;

/// In-memory implementation of the rate limit repository port.
///
/// Construct one per process and share it between every rate limit policy.
#[derive(Debug, Default)]
pub struct InMemoryRateLimitRepository {
    windows: Mutex<HashMap<String, RateWindow>>,
}

impl InMemoryRateLimitRepository {
    /// Creates an empty window table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of tracked identifiers.
    pub fn tracked_identifiers(&self) -> AppResult<usize> {
        Ok(self.lock_windows()?.len())
    }

    fn lock_windows(
        &self,
    ) -> AppResult<std::sync::MutexGuard<'_, HashMap<String, RateWindow>>> {
        self.windows
            .lock()
            .map_err(|error| AppError::Internal(format!("rate limit table poisoned: {error}")))
    }
}

#[async_trait]
impl RateLimitRepository for InMemoryRateLimitRepository {
    async fn check_and_record(
        &self,
        identifier: &str,
        max_attempts: u32,
        window: Duration,
        now: DateTime<Utc>,
    ) -> AppResult<RateLimitDecision> {
        let mut windows = self.lock_windows()?;

        if let Some(current) = windows.get_mut(identifier)
            && !current.has_elapsed(now, window)
        {
            let allowed = current.try_admit(max_attempts);
            return Ok(RateLimitDecision {
                allowed,
                count: current.count,
                limit: max_attempts,
                window_started_at: current.window_start,
                reset_at: current.reset_at(window),
            });
        }

        let fresh = RateWindow::fresh(now);
        windows.insert(identifier.to_owned(), fresh);

        Ok(RateLimitDecision {
            allowed: true,
            count: fresh.count,
            limit: max_attempts,
            window_started_at: now,
            reset_at: fresh.reset_at(window),
        })
    }

    async fn cleanup_expired(&self, before: DateTime<Utc>) -> AppResult<u64> {
        let mut windows = self.lock_windows()?;
        let initial = windows.len();
        windows.retain(|_, window| window.window_start >= before);

        Ok(u64::try_from(initial - windows.len()).unwrap_or(u64::MAX))
    }
}
