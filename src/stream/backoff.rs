//! Exponential reconnect backoff.

use std::time::Duration;

/// Reconnect delay policy: `min(initial * 2^(attempt-1), max)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub initial: Duration,
    pub max: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(1000),
            max: Duration::from_millis(15_000),
        }
    }
}

impl BackoffPolicy {
    /// Delay for a 1-based attempt number.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let pow = 2u32.saturating_pow(attempt.saturating_sub(1));
        let millis = self
            .initial
            .as_millis()
            .saturating_mul(pow as u128)
            .min(self.max.as_millis());
        Duration::from_millis(millis as u64)
    }
}

/// Attempt counter driven by the stream loop.
#[derive(Clone, Debug)]
pub struct Backoff {
    policy: BackoffPolicy,
    attempt: u32,
}

impl Backoff {
    pub fn new(policy: BackoffPolicy) -> Self {
        Self { policy, attempt: 0 }
    }

    /// Count one more failure and return the delay before the next try.
    pub fn next_delay(&mut self) -> Duration {
        self.attempt = self.attempt.saturating_add(1);
        self.policy.delay_for(self.attempt)
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}
