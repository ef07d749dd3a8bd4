//! Injectable provider health registry
//!
//! One registry is shared by every concurrent pipeline run; circuit and
//! rate-window mutation is serialized per provider. Lifetime is the
//! process lifetime — nothing here persists across restarts.

use super::circuit::{CircuitBreaker, CircuitBreakerConfig};
use super::rate_limit::{RateLimitConfig, RateLimiter};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Health and admission state for one provider
pub struct ProviderState {
    pub breaker: Mutex<CircuitBreaker>,
    pub limiter: RateLimiter,
}

impl ProviderState {
    fn new(circuit: CircuitBreakerConfig, rate: RateLimitConfig) -> Self {
        Self {
            breaker: Mutex::new(CircuitBreaker::new(circuit)),
            limiter: RateLimiter::new(rate),
        }
    }
}

/// Registry mapping provider name to its shared state
///
/// Cloning is cheap; all clones share the same underlying map.
#[derive(Clone)]
pub struct ProviderRegistry {
    inner: Arc<Mutex<HashMap<String, Arc<ProviderState>>>>,
    default_circuit: CircuitBreakerConfig,
    default_rate: RateLimitConfig,
}

impl ProviderRegistry {
    pub fn new(circuit: CircuitBreakerConfig, rate: RateLimitConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            default_circuit: circuit,
            default_rate: rate,
        }
    }

    /// Register a provider with its own policies, replacing any prior state.
    pub fn register(
        &self,
        name: impl Into<String>,
        circuit: CircuitBreakerConfig,
        rate: RateLimitConfig,
    ) {
        let mut inner = self.inner.lock();
        inner.insert(name.into(), Arc::new(ProviderState::new(circuit, rate)));
    }

    /// Fetch a provider's state, creating it with the default policies on
    /// first use.
    pub fn state(&self, name: &str) -> Arc<ProviderState> {
        let mut inner = self.inner.lock();
        Arc::clone(inner.entry(name.to_string()).or_insert_with(|| {
            Arc::new(ProviderState::new(
                self.default_circuit.clone(),
                self.default_rate.clone(),
            ))
        }))
    }

    /// Providers currently tracked
    pub fn provider_names(&self) -> Vec<String> {
        self.inner.lock().keys().cloned().collect()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default(), RateLimitConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn state_is_created_lazily_and_shared() {
        let registry = ProviderRegistry::default();

        let a = registry.state("openai");
        let b = registry.state("openai");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.provider_names(), vec!["openai".to_string()]);
    }

    #[test]
    fn registries_are_isolated() {
        let first = ProviderRegistry::default();
        let second = ProviderRegistry::default();

        first
            .state("openai")
            .breaker
            .lock()
            .record_failure(Instant::now());

        assert_eq!(
            first.state("openai").breaker.lock().consecutive_failures(),
            1
        );
        assert_eq!(
            second.state("openai").breaker.lock().consecutive_failures(),
            0
        );
    }

    #[test]
    fn register_overrides_policies() {
        let registry = ProviderRegistry::default();
        registry.register(
            "tavily",
            CircuitBreakerConfig {
                failure_threshold: 1,
                ..Default::default()
            },
            RateLimitConfig::default(),
        );

        let state = registry.state("tavily");
        state.breaker.lock().record_failure(Instant::now());
        assert!(!state.breaker.lock().can_execute(Instant::now()));
    }
}
