//! Reconnect delay policy.

use std::time::Duration;

/// How long to wait before each reconnect attempt, and when to give up.
///
/// Attempt numbers start at 1. The delay for attempt `n` is
/// `base_delay × multiplier^(n-1)`, capped at `max_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: u32,
    /// Stop reconnecting after this many consecutive failed attempts.
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::exponential(Duration::from_secs(1), Duration::from_secs(30))
    }
}

impl ReconnectPolicy {
    /// Same delay before every attempt, retrying forever.
    #[must_use]
    pub const fn fixed(delay: Duration) -> Self {
        Self {
            base_delay: delay,
            max_delay: delay,
            multiplier: 1,
            max_attempts: None,
        }
    }

    /// Doubling delay starting at `base_delay`, never above `max_delay`.
    #[must_use]
    pub const fn exponential(base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            base_delay,
            max_delay,
            multiplier: 2,
            max_attempts: None,
        }
    }

    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: Option<u32>) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Delay before attempt `attempt`, or `None` once attempts are exhausted.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Option<Duration> {
        if self.max_attempts.is_some_and(|max| attempt > max) {
            return None;
        }
        let exponent = attempt.saturating_sub(1);
        let factor = self.multiplier.checked_pow(exponent).unwrap_or(u32::MAX);
        let delay = self
            .base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay);
        Some(delay.min(self.max_delay.max(self.base_delay)))
    }
}
