//! Fallback dispatcher
//!
//! Iterates an ordered candidate list, gating each attempt on the
//! provider's circuit and rate-limiter state. The first healthy candidate
//! to succeed wins; exhaustion yields an aggregated error naming every
//! candidate and why it was skipped or failed.

use super::registry::ProviderRegistry;
use crate::error::{DispatchError, ProviderAttempt, ProviderError, ProviderResult};
use futures::future::BoxFuture;
use std::time::Instant;
use tracing::{debug, warn};

/// Dispatch a logical operation across `candidates` in priority order.
///
/// For each candidate: skip if its circuit is open (no call is made),
/// acquire a rate-limiter slot (a timeout counts as that candidate's
/// failure), then invoke `op`. Success resets the candidate's failure
/// count; failure — transient or rejected alike — records against the
/// circuit and falls through to the next candidate.
pub async fn dispatch<'c, C, T, F>(
    registry: &ProviderRegistry,
    candidates: &'c [C],
    provider_name: impl Fn(&C) -> String,
    op: F,
) -> Result<T, DispatchError>
where
    F: Fn(&'c C) -> BoxFuture<'c, ProviderResult<T>>,
{
    if candidates.is_empty() {
        return Err(DispatchError::NoCandidates);
    }

    let mut attempts = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        let name = provider_name(candidate);
        let state = registry.state(&name);

        if !state.breaker.lock().can_execute(Instant::now()) {
            debug!(provider = %name, "skipping candidate with open circuit");
            attempts.push(ProviderAttempt {
                provider: name,
                error: ProviderError::CircuitOpen,
            });
            continue;
        }

        if let Err(err) = state.limiter.acquire().await {
            warn!(provider = %name, "rate limit wait timed out");
            state.breaker.lock().record_failure(Instant::now());
            attempts.push(ProviderAttempt {
                provider: name,
                error: err,
            });
            continue;
        }

        match op(candidate).await {
            Ok(value) => {
                state.breaker.lock().record_success();
                debug!(provider = %name, "dispatch succeeded");
                return Ok(value);
            }
            Err(err) => {
                warn!(provider = %name, error = %err, "candidate failed, falling back");
                state.breaker.lock().record_failure(Instant::now());
                attempts.push(ProviderAttempt {
                    provider: name,
                    error: err,
                });
            }
        }
    }

    Err(DispatchError::AllProvidersExhausted { attempts })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::{CircuitBreakerConfig, RateLimitConfig};
    use futures::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct Fake {
        name: &'static str,
        fail: bool,
        calls: AtomicUsize,
    }

    impl Fake {
        fn new(name: &'static str, fail: bool) -> Self {
            Self {
                name,
                fail,
                calls: AtomicUsize::new(0),
            }
        }

        async fn call(&self) -> ProviderResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(ProviderError::Transient("simulated outage".to_string()))
            } else {
                Ok(format!("ok from {}", self.name))
            }
        }
    }

    fn quick_registry(failure_threshold: u32) -> ProviderRegistry {
        ProviderRegistry::new(
            CircuitBreakerConfig {
                failure_threshold,
                base_delay: Duration::from_secs(60),
                max_delay: Duration::from_secs(60),
            },
            RateLimitConfig {
                max_requests: 100,
                window: Duration::from_secs(60),
                acquire_timeout: Duration::from_millis(10),
            },
        )
    }

    #[tokio::test]
    async fn falls_back_to_first_healthy_candidate() {
        let registry = quick_registry(5);
        let candidates = vec![
            Fake::new("a", true),
            Fake::new("b", true),
            Fake::new("c", false),
        ];

        let result = dispatch(
            &registry,
            &candidates,
            |c| c.name.to_string(),
            |c| c.call().boxed(),
        )
        .await
        .expect("c should succeed");

        assert_eq!(result, "ok from c");
        assert_eq!(candidates[0].calls.load(Ordering::SeqCst), 1);
        assert_eq!(candidates[1].calls.load(Ordering::SeqCst), 1);
        assert_eq!(candidates[2].calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhaustion_error_names_failed_candidates() {
        let registry = quick_registry(5);
        let candidates = vec![Fake::new("a", true), Fake::new("b", true)];

        let err = dispatch(
            &registry,
            &candidates,
            |c| c.name.to_string(),
            |c| c.call().boxed(),
        )
        .await
        .unwrap_err();

        assert_eq!(err.providers(), vec!["a", "b"]);
        let msg = err.to_string();
        assert!(msg.contains("a: "));
        assert!(msg.contains("simulated outage"));
    }

    #[tokio::test]
    async fn open_circuit_is_skipped_without_a_call() {
        let registry = quick_registry(1);
        let candidates = vec![Fake::new("flaky", true), Fake::new("steady", false)];

        // First dispatch: flaky fails once, crossing the threshold.
        dispatch(
            &registry,
            &candidates,
            |c| c.name.to_string(),
            |c| c.call().boxed(),
        )
        .await
        .expect("steady succeeds");
        assert_eq!(candidates[0].calls.load(Ordering::SeqCst), 1);

        // Second dispatch: flaky's circuit is open — it must not be called.
        dispatch(
            &registry,
            &candidates,
            |c| c.name.to_string(),
            |c| c.call().boxed(),
        )
        .await
        .expect("steady succeeds again");
        assert_eq!(candidates[0].calls.load(Ordering::SeqCst), 1);
        assert_eq!(candidates[1].calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn success_resets_failure_count() {
        let registry = quick_registry(3);
        let flaky = vec![Fake::new("x", false)];

        // Two failures recorded by hand, then a successful dispatch.
        let state = registry.state("x");
        state.breaker.lock().record_failure(Instant::now());
        state.breaker.lock().record_failure(Instant::now());

        dispatch(&registry, &flaky, |c| c.name.to_string(), |c| c.call().boxed())
            .await
            .unwrap();

        assert_eq!(registry.state("x").breaker.lock().consecutive_failures(), 0);
    }

    #[tokio::test]
    async fn rate_limit_timeout_counts_as_candidate_failure() {
        let registry = quick_registry(10);
        registry.register(
            "limited",
            CircuitBreakerConfig::default(),
            RateLimitConfig {
                max_requests: 1,
                window: Duration::from_secs(60),
                acquire_timeout: Duration::from_millis(5),
            },
        );

        let candidates = vec![Fake::new("limited", false)];

        // Consume the only slot.
        registry.state("limited").limiter.acquire().await.unwrap();

        let err = dispatch(
            &registry,
            &candidates,
            |c| c.name.to_string(),
            |c| c.call().boxed(),
        )
        .await
        .unwrap_err();

        match err {
            DispatchError::AllProvidersExhausted { attempts } => {
                assert_eq!(attempts.len(), 1);
                assert!(matches!(attempts[0].error, ProviderError::RateLimitTimeout));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // The operation itself was never invoked.
        assert_eq!(candidates[0].calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_candidates_is_an_error() {
        let registry = quick_registry(3);
        let candidates: Vec<Fake> = Vec::new();

        let err = dispatch(
            &registry,
            &candidates,
            |c| c.name.to_string(),
            |c| c.call().boxed(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, DispatchError::NoCandidates));
    }
}
