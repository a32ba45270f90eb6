//! Delay strategies between acquisition attempts.

use std::time::Duration;

/// How long the adapter waits after a failed attempt before the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay after every attempt.
    Fixed { delay: Duration },
    /// `base * 2^(n-1)` after the n-th failed attempt, capped at `max`.
    Exponential { base: Duration, max: Duration },
}

impl Backoff {
    pub fn fixed(delay: Duration) -> Self {
        Backoff::Fixed { delay }
    }

    pub fn exponential(base: Duration, max: Duration) -> Self {
        Backoff::Exponential { base, max }
    }

    /// Delay to wait after `failed_attempts` attempts (1-based).
    pub fn delay_after(&self, failed_attempts: u32) -> Duration {
        match *self {
            Backoff::Fixed { delay } => delay,
            Backoff::Exponential { base, max } => {
                let factor = 1u32
                    .checked_shl(failed_attempts.saturating_sub(1))
                    .unwrap_or(u32::MAX);
                base.saturating_mul(factor).min(max)
            }
        }
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff::fixed(Duration::from_millis(50))
    }
}
