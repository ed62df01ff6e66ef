//! Bounded exponential backoff with jitter for transient upstream failures.

use std::time::Duration;

use rand::Rng;

/// Retry policy for transient failures (rate limiting, 5xx, network).
///
/// Auth failures never pass through here; they are fatal on first sight.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts including the first (so 4 = one call + three retries).
    pub max_attempts: u32,

    /// Delay before the first retry; doubles each retry.
    pub base_delay: Duration,

    /// Upper bound on any single delay.
    pub max_delay: Duration,

    /// Multiplicative jitter range: each delay is scaled by a random factor
    /// in `[1 - jitter, 1 + jitter]`.
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(15),
            jitter: 0.3,
        }
    }
}

impl RetryPolicy {
    /// The jittered delay before retrying after a failed `attempt`
    /// (0-based index of the attempt that just failed).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self.base_delay.saturating_mul(1_u32 << attempt.min(16));
        let capped = exp.min(self.max_delay);
        let factor = rand::thread_rng().gen_range(1.0 - self.jitter..=1.0 + self.jitter);
        capped.mul_f64(factor.max(0.0))
    }

    /// Whether another attempt remains after `attempt` failures.
    #[must_use]
    pub const fn should_retry(&self, attempt: u32) -> bool {
        attempt + 1 < self.max_attempts
    }
}

/// Whether an HTTP status is worth retrying.
#[must_use]
pub const fn is_transient_status(status: u16) -> bool {
    status == 429 || (status >= 500 && status < 600)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_statuses() {
        assert!(is_transient_status(429));
        assert!(is_transient_status(500));
        assert!(is_transient_status(503));
        assert!(!is_transient_status(200));
        assert!(!is_transient_status(401));
        assert!(!is_transient_status(404));
    }

    #[test]
    fn delay_grows_and_stays_bounded() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(1),
            jitter: 0.0,
        };
        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(2), Duration::from_millis(400));
        // Capped at max_delay from here on
        assert_eq!(policy.delay_for(5), Duration::from_secs(1));
        assert_eq!(policy.delay_for(30), Duration::from_secs(1));
    }

    #[test]
    fn jitter_stays_within_band() {
        let policy = RetryPolicy {
            max_attempts: 4,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            jitter: 0.3,
        };
        for _ in 0..100 {
            let delay = policy.delay_for(0).as_secs_f64();
            assert!((0.07..=0.13).contains(&delay), "delay {delay} out of band");
        }
    }

    #[test]
    fn retry_budget() {
        let policy = RetryPolicy::default();
        assert!(policy.should_retry(0));
        assert!(policy.should_retry(2));
        assert!(!policy.should_retry(3));
    }
}
