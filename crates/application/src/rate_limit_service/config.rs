use chrono::Duration;

/// Configuration for a rate limit rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitRule {
    /// Policy name used in logs (e.g., "ip", "user", "sensitive").
    pub category: String,
    /// Maximum number of requests allowed in the window.
    pub max_attempts: u32,
    /// Window duration in seconds.
    pub window_seconds: u64,
}

impl RateLimitRule {
    /// Creates a new rate limit rule.
    #[must_use]
    pub fn new(category: impl Into<String>, max_attempts: u32, window_seconds: u64) -> Self {
        Self {
            category: category.into(),
            max_attempts,
            window_seconds,
        }
    }

    /// Returns the window as a duration.
    ///
    /// Unrepresentable windows come back as `Duration::MAX`, which the service
    /// treats as an invalid argument.
    #[must_use]
    pub fn window(&self) -> Duration {
        i64::try_from(self.window_seconds)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX)
    }

    /// Returns a copy with the budget multiplied, rounded down, never below one.
    #[must_use]
    pub fn scaled(&self, multiplier: f64) -> Self {
        let scaled = if multiplier.is_finite() && multiplier > 0.0 {
            (f64::from(self.max_attempts) * multiplier).floor()
        } else {
            f64::from(self.max_attempts)
        };

        let max_attempts = if scaled >= f64::from(u32::MAX) {
            u32::MAX
        } else if scaled < 1.0 {
            1
        } else {
            scaled as u32
        };

        Self {
            category: self.category.clone(),
            max_attempts,
            window_seconds: self.window_seconds,
        }
    }
}
