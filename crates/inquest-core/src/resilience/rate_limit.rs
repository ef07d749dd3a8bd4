//! Sliding-window rate limiter
//!
//! Admits a request if fewer than `max_requests` were dispatched within the
//! trailing `window`; otherwise the caller waits until the oldest timestamp
//! falls out of range or `acquire_timeout` elapses. The timestamp deque is
//! guarded by a parking_lot mutex that is never held across an await.

use crate::error::{ProviderError, ProviderResult};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Rate limit policy for one provider
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum admissions within the trailing window
    pub max_requests: usize,

    /// Trailing window length
    pub window: Duration,

    /// How long a caller will wait for a slot before the attempt fails
    pub acquire_timeout: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 60,
            window: Duration::from_secs(60),
            acquire_timeout: Duration::from_secs(30),
        }
    }
}

/// Sliding-window admission counter for one provider
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    timestamps: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            timestamps: Mutex::new(VecDeque::new()),
        }
    }

    /// Acquire an admission slot, waiting up to `acquire_timeout`.
    ///
    /// The slot is recorded at admission time, so concurrent callers can
    /// never over-admit within a window: the check and the record happen
    /// under one lock.
    pub async fn acquire(&self) -> ProviderResult<()> {
        let deadline = Instant::now() + self.config.acquire_timeout;

        loop {
            let wait = {
                let mut window = self.timestamps.lock();
                let now = Instant::now();
                self.prune(&mut window, now);

                if window.len() < self.config.max_requests {
                    window.push_back(now);
                    return Ok(());
                }

                // Oldest entry decides when the next slot frees up. An
                // empty window here means max_requests is 0 and nothing
                // can ever be admitted.
                let Some(oldest) = window.front().copied() else {
                    return Err(ProviderError::RateLimitTimeout);
                };
                (oldest + self.config.window).saturating_duration_since(now)
            };

            let now = Instant::now();
            if now + wait > deadline {
                tracing::debug!(
                    wait_ms = wait.as_millis() as u64,
                    "rate limit wait would exceed timeout"
                );
                return Err(ProviderError::RateLimitTimeout);
            }

            tracing::debug!(wait_ms = wait.as_millis() as u64, "waiting for rate slot");
            tokio::time::sleep(wait).await;
            // Loop: another caller may have taken the freed slot.
        }
    }

    /// Attempt to acquire without waiting.
    pub fn try_acquire(&self) -> bool {
        let mut window = self.timestamps.lock();
        let now = Instant::now();
        self.prune(&mut window, now);

        if window.len() < self.config.max_requests {
            window.push_back(now);
            true
        } else {
            false
        }
    }

    /// Admissions currently counted in the window
    pub fn in_window(&self) -> usize {
        let mut window = self.timestamps.lock();
        self.prune(&mut window, Instant::now());
        window.len()
    }

    fn prune(&self, window: &mut VecDeque<Instant>, now: Instant) {
        let cutoff = now.checked_sub(self.config.window);
        if let Some(cutoff) = cutoff {
            while let Some(front) = window.front() {
                if *front <= cutoff {
                    window.pop_front();
                } else {
                    break;
                }
            }
        }
    }
}
