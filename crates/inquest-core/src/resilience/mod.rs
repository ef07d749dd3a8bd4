//! Resilience primitives: circuit breaking, rate limiting, and fallback
//! dispatch
//!
//! Provider health state is kept in an injectable [`ProviderRegistry`]
//! rather than process-wide singletons so tests can construct isolated
//! registries per case. All state is in-memory and resets on restart.

pub mod circuit;
pub mod dispatch;
pub mod rate_limit;
pub mod registry;

pub use circuit::{CircuitBreaker, CircuitBreakerConfig};
pub use dispatch::dispatch;
pub use rate_limit::{RateLimitConfig, RateLimiter};
pub use registry::{ProviderRegistry, ProviderState};
