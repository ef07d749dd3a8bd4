//! Circuit breaker with failure-scaled reopen delay
//!
//! A provider's circuit opens once its consecutive-failure count reaches a
//! threshold. The open duration grows exponentially with further failures
//! but is always bounded by `max_delay`, so no circuit stays open
//! indefinitely. One success closes the circuit and resets the count.

use std::time::{Duration, Instant};

/// Circuit breaker configuration
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before the circuit opens
    pub failure_threshold: u32,

    /// Open duration after the threshold is first crossed
    pub base_delay: Duration,

    /// Upper bound on the open duration regardless of failure count
    pub max_delay: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            base_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(120),
        }
    }
}

/// Per-provider circuit state
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    consecutive_failures: u32,
    open_until: Option<Instant>,
    config: CircuitBreakerConfig,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            consecutive_failures: 0,
            open_until: None,
            config,
        }
    }

    /// Whether a call may be attempted at `now`.
    ///
    /// An elapsed `open_until` closes the gate passively; the failure count
    /// is retained so another failure reopens the circuit immediately with
    /// a longer delay.
    pub fn can_execute(&self, now: Instant) -> bool {
        match self.open_until {
            Some(until) => now >= until,
            None => true,
        }
    }

    pub fn record_success(&mut self) {
        if self.consecutive_failures > 0 {
            tracing::debug!(
                failures = self.consecutive_failures,
                "circuit reset after success"
            );
        }
        self.consecutive_failures = 0;
        self.open_until = None;
    }

    pub fn record_failure(&mut self, now: Instant) {
        self.consecutive_failures += 1;

        if self.consecutive_failures >= self.config.failure_threshold {
            let exponent = self.consecutive_failures - self.config.failure_threshold;
            let delay = self
                .config
                .base_delay
                .checked_mul(1u32 << exponent.min(16))
                .map(|d| d.min(self.config.max_delay))
                .unwrap_or(self.config.max_delay);

            self.open_until = Some(now + delay);
            tracing::warn!(
                failures = self.consecutive_failures,
                delay_ms = delay.as_millis() as u64,
                "circuit opened"
            );
        }
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn open_until(&self) -> Option<Instant> {
        self.open_until
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}
