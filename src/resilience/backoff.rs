//! Exponential backoff with jitter.

use std::time::Duration;

use rand::Rng;

use crate::config::RetryConfig;

/// Fraction of the computed delay added as random jitter at most.
const JITTER_RATIO: f64 = 0.1;

/// Exponential backoff parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
}

impl BackoffPolicy {
    pub fn new(base: Duration, multiplier: f64, max_delay: Duration) -> Self {
        Self {
            base,
            multiplier,
            max_delay,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            Duration::from_millis(config.base_delay_ms),
            config.multiplier,
            Duration::from_millis(config.max_delay_ms),
        )
    }

    /// `base * multiplier^attempt`, capped at `max_delay`, without jitter.
    pub fn nominal(&self, attempt: u32) -> Duration {
        let exp = i32::try_from(attempt).unwrap_or(i32::MAX);
        let raw = self.base.as_secs_f64() * self.multiplier.powi(exp);
        let capped = raw.min(self.max_delay.as_secs_f64());
        if capped.is_finite() && capped > 0.0 {
            Duration::from_secs_f64(capped)
        } else if capped > 0.0 {
            self.max_delay
        } else {
            Duration::ZERO
        }
    }

    /// Delay to wait before the retry following `attempt` (0-indexed).
    ///
    /// Always within `[nominal, nominal * 1.1]`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let nominal = self.nominal(attempt);
        let jitter_range = nominal.mul_f64(JITTER_RATIO);
        if jitter_range.is_zero() {
            return nominal;
        }
        let jitter = rand::thread_rng().gen_range(Duration::ZERO..=jitter_range);
        nominal + jitter
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}
