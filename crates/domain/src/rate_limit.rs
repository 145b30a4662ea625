use chrono::{DateTime, Duration, Utc};

/// Counting window for one rate limit identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateWindow {
    /// Requests admitted in the current window.
    pub count: u32,
    /// Start of the current window.
    pub window_start: DateTime<Utc>,
}

impl RateWindow {
    /// Opens a window that already counts the current request.
    #[must_use]
    pub fn fresh(now: DateTime<Utc>) -> Self {
        Self {
            count: 1,
            window_start: now,
        }
    }

    /// Returns whether more than `window` passed since the window opened.
    #[must_use]
    pub fn has_elapsed(&self, now: DateTime<Utc>, window: Duration) -> bool {
        now.signed_duration_since(self.window_start) > window
    }

    /// Returns when the window resets, saturating at the latest instant.
    #[must_use]
    pub fn reset_at(&self, window: Duration) -> DateTime<Utc> {
        self.window_start
            .checked_add_signed(window)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Counts the request when budget remains.
    ///
    /// Rejected requests leave the count untouched.
    pub fn try_admit(&mut self, limit: u32) -> bool {
        if self.count >= limit {
            return false;
        }

        self.count = self.count.saturating_add(1);
        true
    }
}
