//! Core types and traits for Inquest
//!
//! Inquest sits between application logic and three classes of metered
//! external services (web search, embeddings, text generation) and keeps
//! callers insulated from individual provider outages. This crate defines
//! the shared vocabulary: request/response types, provider traits, the
//! error taxonomy, and the resilience primitives (circuit breaker, sliding
//! window rate limiter, fallback dispatcher) used by every backend.

pub mod error;
pub mod normalize;
pub mod progress;
pub mod resilience;
pub mod run_store;
pub mod traits;
pub mod types;

pub use error::{
    CacheError, CacheResult, DispatchError, EmbeddingError, EmbeddingResult, PipelineError,
    ProviderAttempt, ProviderError, ProviderResult,
};
pub use normalize::{cache_key, normalize_query};
pub use progress::{NullSink, ProgressSink};
pub use resilience::{
    dispatch, CircuitBreaker, CircuitBreakerConfig, ProviderRegistry, RateLimitConfig, RateLimiter,
};
pub use run_store::{InMemoryRunStore, RunRecord, RunRef, RunStore};
pub use traits::{
    cosine_similarity, EmbeddingProvider, SearchProvider, TextGenerationProvider,
};
pub use types::{
    GenerationRequest, SearchDepth, SearchParams, SearchResponse, SearchResult,
};
