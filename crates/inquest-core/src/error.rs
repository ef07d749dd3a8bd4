//! Error taxonomy
//!
//! Cache errors are swallowed at the pipeline boundary (the cache is an
//! optimization, never a correctness dependency). Provider errors are
//! swallowed per-candidate during fallback and only surfaced, aggregated,
//! once every candidate has failed.

use std::fmt;
use thiserror::Error;

/// A single provider call failure
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// Timeout, connection failure, 429, or 5xx — retryable on another
    /// candidate
    #[error("transient provider error: {0}")]
    Transient(String),

    /// Malformed request, auth failure, 4xx — not retryable on this
    /// provider, but fallback to a different backend is still allowed
    #[error("provider rejected request: {0}")]
    Rejected(String),

    /// Rate-limiter slot acquisition timed out for this candidate
    #[error("rate limit wait timed out")]
    RateLimitTimeout,

    /// Candidate skipped because its circuit was open
    #[error("circuit open")]
    CircuitOpen,
}

impl ProviderError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::Transient(_) | ProviderError::RateLimitTimeout)
    }

    /// Map an HTTP status to the taxonomy: 408/429/5xx are transient,
    /// everything else in the 4xx range is a rejection.
    pub fn from_status(status: u16, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        match status {
            408 | 429 => ProviderError::Transient(detail),
            s if s >= 500 => ProviderError::Transient(detail),
            _ => ProviderError::Rejected(detail),
        }
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Record of one candidate's failure during fallback
#[derive(Debug, Clone)]
pub struct ProviderAttempt {
    pub provider: String,
    pub error: ProviderError,
}

impl fmt::Display for ProviderAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.provider, self.error)
    }
}

/// Error from the fallback dispatcher
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    /// Every candidate was skipped or failed
    #[error("all providers exhausted: [{}]", format_attempts(.attempts))]
    AllProvidersExhausted { attempts: Vec<ProviderAttempt> },

    /// The candidate list was empty
    #[error("no provider candidates configured")]
    NoCandidates,
}

fn format_attempts(attempts: &[ProviderAttempt]) -> String {
    attempts
        .iter()
        .map(|a| a.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl DispatchError {
    /// Providers that were actually tried or skipped, in order.
    pub fn providers(&self) -> Vec<&str> {
        match self {
            DispatchError::AllProvidersExhausted { attempts } => {
                attempts.iter().map(|a| a.provider.as_str()).collect()
            }
            DispatchError::NoCandidates => Vec::new(),
        }
    }
}

/// Cache storage error — always non-fatal to callers
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache storage error: {0}")]
    Storage(String),

    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type CacheResult<T> = Result<T, CacheError>;

/// Embedding provider error
///
/// The tiered cache treats any embedding failure as "no embedding" and
/// degrades to exact-only matching.
#[derive(Debug, Clone, Error)]
pub enum EmbeddingError {
    #[error("embedding HTTP error: {0}")]
    Http(String),

    #[error("embedding response invalid: {0}")]
    InvalidResponse(String),

    #[error("embedding configuration error: {0}")]
    Config(String),
}

pub type EmbeddingResult<T> = Result<T, EmbeddingError>;

/// Pipeline-level error surfaced to the caller
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no provider available for {0}")]
    NoProviderAvailable(&'static str),

    #[error("step '{step}' failed: {message}")]
    StepFailed { step: &'static str, message: String },

    #[error("run cancelled")]
    Cancelled,

    #[error("run not found")]
    NotFound,
}

impl PipelineError {
    pub fn step(step: &'static str, source: impl fmt::Display) -> Self {
        PipelineError::StepFailed {
            step,
            message: source.to_string(),
        }
    }
}
