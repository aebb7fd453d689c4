use crate::config::TrafficConfig;
use std::time::Duration;

/// Pacing between iterations
///
/// Without backoff every iteration waits the base interval. With backoff,
/// `n` consecutive failed iterations wait `min(interval * multiplier^n, max)`.
#[derive(Debug, Clone)]
pub struct Backoff {
    interval: Duration,
    max_delay: Duration,
    multiplier: f64,
    enabled: bool,
    consecutive_failures: u32,
}

impl Backoff {
    pub fn new(interval: Duration, max_delay: Duration, multiplier: f64, enabled: bool) -> Self {
        Self {
            interval,
            max_delay: max_delay.max(interval),
            multiplier: if multiplier.is_finite() { multiplier.max(1.0) } else { 1.0 },
            enabled,
            consecutive_failures: 0,
        }
    }

    pub fn from_config(config: &TrafficConfig) -> Self {
        Self::new(
            config.interval(),
            config.max_backoff(),
            config.backoff.multiplier,
            config.backoff.enabled,
        )
    }

    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
    }

    pub fn record_failure(&mut self) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Delay before the next iteration
    pub fn delay(&self) -> Duration {
        if !self.enabled || self.consecutive_failures == 0 {
            return self.interval;
        }

        let exponent = self.consecutive_failures.min(i32::MAX as u32) as i32;
        let secs = self.interval.as_secs_f64() * self.multiplier.powi(exponent);
        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            self.max_delay
        } else {
            Duration::from_secs_f64(secs)
        }
    }
}
