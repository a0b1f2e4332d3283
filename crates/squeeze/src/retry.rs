// Delay schedule between failed compress/download attempts.
//
// The default retries straight away. `--retry-delay-ms` switches to a doubling delay
// that never exceeds the configured ceiling.

use rand::RngExt;
use std::time::Duration;

/// How long a unit waits before its next compress/download attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Wait before the first retry; zero disables waiting altogether.
    pub base_delay: Duration,
    /// Ceiling for any single wait, jitter included.
    pub max_delay: Duration,
    /// Spread waits of concurrent units by up to half of `base_delay`.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::immediate()
    }
}

impl RetryPolicy {
    /// Retry without waiting.
    pub fn immediate() -> Self {
        Self {
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            jitter: false,
        }
    }

    /// Doubling delay from `base_delay`, with jitter. A ceiling below the base is raised
    /// to the base.
    pub fn exponential(base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            base_delay,
            max_delay: max_delay.max(base_delay),
            jitter: true,
        }
    }

    pub fn is_immediate(&self) -> bool {
        self.base_delay.is_zero()
    }

    /// Wait before retry number `retry`, counting from 0 for the first retry.
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        if self.is_immediate() {
            return Duration::ZERO;
        }

        let doubled = 2u32
            .checked_pow(retry)
            .and_then(|factor| self.base_delay.checked_mul(factor))
            .unwrap_or(Duration::MAX);
        let delay = doubled.min(self.max_delay);
        if !self.jitter {
            return delay;
        }

        let headroom = self.max_delay - delay;
        let spread = (self.base_delay / 2).min(headroom);
        if spread.is_zero() {
            return delay;
        }
        delay + spread.mul_f64(rand::rng().random_range(0.0..1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_retries_straight_away() {
        let policy = RetryPolicy::default();
        assert!(policy.is_immediate());
        assert!((0..5).all(|retry| policy.delay_for_retry(retry).is_zero()));
    }

    #[test]
    fn fixed_schedule_doubles_up_to_ceiling() {
        let policy = RetryPolicy {
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(1),
            jitter: false,
        };
        let schedule: Vec<_> = (0..5).map(|retry| policy.delay_for_retry(retry)).collect();
        assert_eq!(
            schedule,
            [250, 500, 1000, 1000, 1000].map(Duration::from_millis)
        );
    }

    #[test]
    fn large_retry_counts_saturate_at_ceiling() {
        let policy = RetryPolicy {
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            jitter: false,
        };
        assert_eq!(policy.delay_for_retry(u32::MAX), Duration::from_secs(30));
    }

    #[test]
    fn ceiling_below_base_is_raised() {
        let policy = RetryPolicy::exponential(Duration::from_millis(400), Duration::from_millis(100));
        assert_eq!(policy.max_delay, Duration::from_millis(400));
        assert_eq!(policy.delay_for_retry(3), Duration::from_millis(400));
    }

    #[test]
    fn jittered_waits_stay_between_step_and_ceiling() {
        let policy = RetryPolicy::exponential(Duration::from_millis(200), Duration::from_secs(2));
        for _ in 0..50 {
            let first = policy.delay_for_retry(0);
            assert!(first >= Duration::from_millis(200) && first < Duration::from_millis(300));
            assert!(policy.delay_for_retry(8) <= Duration::from_secs(2));
        }
    }
}
