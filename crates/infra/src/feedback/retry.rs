use std::time::Duration;

/// Fixed-delay retry schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, the first one included.
    pub max_attempts: u32,
    /// Pause between consecutive attempts.
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Delivery of one feedback message: 4 attempts, 500 ms apart.
    pub fn delivery() -> Self {
        Self::fixed(4, Duration::from_millis(500))
    }

    /// Topic provisioning at startup: 1 attempt plus 4 retries, 1 s apart.
    pub fn provisioning() -> Self {
        Self::fixed(5, Duration::from_secs(1))
    }

    /// Whether another attempt may follow attempt number `attempt` (1-indexed).
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::delivery()
    }
}
