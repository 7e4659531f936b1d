//! Retry backoff calculation

use std::time::Duration;

/// Backoff calculation utilities
pub struct BackoffCalculator;

impl BackoffCalculator {
    /// Calculate retry delay with exponential backoff
    ///
    /// `retry_count` starts at 1 for the first retry, which waits `base_delay`.
    pub fn calculate_retry_delay(
        retry_count: u32,
        base_delay: Duration,
        max_delay: Duration,
        multiplier: u32,
    ) -> Duration {
        let exponent = retry_count.saturating_sub(1);
        let delay_millis = base_delay.as_millis() as u64;
        let multiplied_delay =
            delay_millis.saturating_mul((multiplier as u64).saturating_pow(exponent));
        let capped_delay = std::cmp::min(multiplied_delay, max_delay.as_millis() as u64);
        Duration::from_millis(capped_delay)
    }

    /// Spread a delay by up to `jitter_percentage` in either direction
    ///
    /// Keeps workers that failed together from retrying in lockstep.
    pub fn with_jitter(delay: Duration, jitter_percentage: f64) -> Duration {
        let millis = delay.as_millis() as u64;
        let jitter_range = (millis as f64 * jitter_percentage) as u64;
        if jitter_range == 0 {
            return delay;
        }
        let offset = fastrand::u64(0..=jitter_range * 2);
        Duration::from_millis((millis + offset).saturating_sub(jitter_range))
    }
}
