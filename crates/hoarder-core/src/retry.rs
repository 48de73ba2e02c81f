//! Bounded exponential backoff for the commit protocol's wait loops.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How long to wait between attempts and when to give up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay before the second attempt.
    pub initial_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    /// Total attempts, including the first one.
    pub max_attempts: u32,
}

impl RetryPolicy {
    /// Delays double after each failed attempt.
    pub const MULTIPLIER: u32 = 2;

    /// A policy starting at `initial_delay`.
    pub const fn new(initial_delay: Duration, max_delay: Duration, max_attempts: u32) -> Self {
        Self {
            initial_delay,
            max_delay,
            max_attempts,
        }
    }

    /// Retry immediately; used by tests.
    pub const fn immediate(max_attempts: u32) -> Self {
        Self::new(Duration::ZERO, Duration::ZERO, max_attempts)
    }

    /// Delay to sleep after failed attempt number `attempt` (1-based), or
    /// `None` once the attempt budget is spent.
    pub fn delay_after(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_attempts {
            return None;
        }
        let factor = Self::MULTIPLIER.saturating_pow(attempt.saturating_sub(1));
        let delay = self
            .initial_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay);
        Some(delay.min(self.max_delay))
    }
}

/// Backoff settings as they appear in configuration (`[retry]`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// First wait while the branch tip has not moved past our last commit.
    pub stale_read_delay_ms: u64,
    /// First wait after a rejected ref update.
    pub update_ref_delay_ms: u64,
    /// Cap for any single wait.
    pub max_delay_ms: u64,
    /// Attempts per loop before giving up.
    pub max_attempts: u32,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            stale_read_delay_ms: 2_000,
            update_ref_delay_ms: 5_000,
            max_delay_ms: 60_000,
            max_attempts: 8,
        }
    }
}

impl RetrySettings {
    /// Policy for the stale-read guard.
    pub const fn stale_read(&self) -> RetryPolicy {
        self.policy(self.stale_read_delay_ms)
    }

    /// Policy for the ref update retry.
    pub const fn update_ref(&self) -> RetryPolicy {
        self.policy(self.update_ref_delay_ms)
    }

    const fn policy(&self, initial_ms: u64) -> RetryPolicy {
        RetryPolicy::new(
            Duration::from_millis(initial_ms),
            Duration::from_millis(self.max_delay_ms),
            self.max_attempts,
        )
    }
}
