use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bounded retry policy for transient transport failures.
///
/// Delays grow exponentially from `base_delay_ms` and are capped at
/// `max_delay_ms`, with optional ±50% jitter to avoid thundering herds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            base_delay_ms: 100,
            max_delay_ms: 30_000,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        // Exponent is clamped so the shift cannot overflow; the cap below
        // dominates long before that.
        let multiplier = 2_u64.pow(attempt.saturating_sub(1).min(20));
        let delay_ms = self
            .base_delay_ms
            .saturating_mul(multiplier)
            .min(self.max_delay_ms);

        if self.jitter {
            apply_jitter(delay_ms)
        } else {
            Duration::from_millis(delay_ms)
        }
    }
}

fn apply_jitter(delay_ms: u64) -> Duration {
    let mut rng = rand::rng();
    let jitter_factor = rng.random_range(0.5..1.5);
    Duration::from_millis((delay_ms as f64 * jitter_factor) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn without_jitter() -> RetryConfig {
        RetryConfig {
            jitter: false,
            ..RetryConfig::default()
        }
    }

    #[test]
    fn test_delay_grows_exponentially() {
        let config = without_jitter();
        assert_eq!(config.delay_for(1), Duration::from_millis(100));
        assert_eq!(config.delay_for(2), Duration::from_millis(200));
        assert_eq!(config.delay_for(3), Duration::from_millis(400));
        assert_eq!(config.delay_for(6), Duration::from_millis(3200));
    }

    #[test]
    fn test_delay_is_capped() {
        let config = without_jitter();
        assert_eq!(config.delay_for(30), Duration::from_millis(30_000));
    }

    #[test]
    fn test_jitter_stays_within_bounds() {
        let config = RetryConfig::default();
        for _ in 0..100 {
            let delay = config.delay_for(3);
            assert!(delay >= Duration::from_millis(200));
            assert!(delay < Duration::from_millis(600));
        }
    }
}
