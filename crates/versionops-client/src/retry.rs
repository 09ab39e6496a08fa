//! Backoff policy and cancellable waits

use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Largest jitter added on top of the exponential delay, as a fraction of it.
///
/// Kept below 1.0 so consecutive uncapped delays still strictly increase.
const JITTER_FRACTION: f64 = 0.25;

/// Exponential backoff with jitter, capped, bounded by an attempt count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Upper bound for any delay
    pub max_delay: Duration,
    /// Total requests per attempt, including the first
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
            max_attempts: 5,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (0-based), with `jitter` in `[0, 1)`
    #[must_use]
    pub fn delay_for(&self, retry: u32, jitter: f64) -> Duration {
        let exponential = self.base_delay.as_secs_f64() * 2f64.powi(retry.min(62) as i32);
        let jittered = exponential * (1.0 + JITTER_FRACTION * jitter.clamp(0.0, 1.0));
        Duration::try_from_secs_f64(jittered)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Delay for retry number `retry` with random jitter
    #[must_use]
    pub fn next_delay(&self, retry: u32) -> Duration {
        self.delay_for(retry, fastrand::f64())
    }
}

/// Sleep for `duration` unless `cancel` fires first.
///
/// Returns `true` if the full duration elapsed, `false` if cancelled.
pub async fn cancellable_sleep(duration: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        () = cancel.cancelled() => false,
        () = tokio::time::sleep(duration) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delays_double_until_cap() {
        let policy = RetryPolicy {
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
            max_attempts: 10,
        };

        let delays: Vec<u64> = (0..7).map(|n| policy.delay_for(n, 0.0).as_secs()).collect();

        assert_eq!(delays, vec![2, 4, 8, 16, 32, 60, 60]);
    }

    #[test]
    fn test_jitter_keeps_delays_increasing() {
        let policy = RetryPolicy {
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(3600),
            max_attempts: 10,
        };

        for n in 0..8 {
            let worst_current = policy.delay_for(n, 0.999);
            let best_next = policy.delay_for(n + 1, 0.0);
            assert!(worst_current < best_next, "retry {n}");
        }
        assert!(policy.delay_for(0, 0.5) <= Duration::from_millis(125));
    }

    #[test]
    fn test_huge_retry_number_is_capped() {
        let policy = RetryPolicy::default();

        assert_eq!(policy.delay_for(u32::MAX, 1.0), policy.max_delay);
    }

    #[tokio::test]
    async fn test_cancellable_sleep_interrupted() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let started = std::time::Instant::now();
        assert!(!cancellable_sleep(Duration::from_secs(60), &cancel).await);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_cancellable_sleep_elapses() {
        assert!(cancellable_sleep(Duration::from_millis(10), &CancellationToken::new()).await);
    }
}
