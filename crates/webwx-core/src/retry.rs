use std::time::Duration;

/// Bounded retry counter shared by the login flow and the sync loop.
///
/// Replaces the historical unbounded `while` loops: exhaustion is an explicit,
/// observable condition rather than an infinite spin.
#[derive(Debug, Clone, Copy)]
pub struct RetryBudget {
    max: u32,
    remaining: u32,
}

impl RetryBudget {
    pub fn new(max: u32) -> Self {
        Self {
            max,
            remaining: max,
        }
    }

    /// Consume one attempt. Returns `false` when the budget is exhausted.
    pub fn spend(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        true
    }

    /// Restore the full budget after a healthy cycle.
    pub fn reset(&mut self) {
        self.remaining = self.max;
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn exhausted(&self) -> bool {
        self.remaining == 0
    }
}

/// Delay policy applied between retries.
///
/// Delays grow exponentially from `base_delay` up to `max_delay`, and are fully
/// caller-controlled so tests can run with zero waits.
#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    base_delay: Duration,
    max_delay: Duration,
}

impl BackoffPolicy {
    pub fn new(base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            base_delay,
            max_delay,
        }
    }

    /// Fixed-delay policy (every attempt waits the same amount).
    pub fn fixed(delay: Duration) -> Self {
        Self::new(delay, delay)
    }

    /// Delay before retry number `attempt` (0-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let shift = attempt.min(20);
        let multiplier = 1_u64 << shift;
        let millis = (self.base_delay.as_millis() as u64).saturating_mul(multiplier);
        Duration::from_millis(millis).min(self.max_delay)
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(Duration::from_millis(500), Duration::from_secs(30))
    }
}
