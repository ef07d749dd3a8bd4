//! Configuration for Inquest
//!
//! A single TOML-loadable config struct with serde defaults covering cache
//! TTLs, rate-limit windows, circuit policy, timeouts, and pipeline
//! concurrency. Every field has a sensible default so an empty config file
//! (or none at all) yields a working system.

pub mod keys;

pub use keys::{
    env_var_for_provider, generation_candidates, GenerationBackend, KeySource, Keys,
};

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InquestConfig {
    /// Search-cache entry time-to-live, hours
    pub search_cache_ttl_hours: u64,

    /// Topic-cache result time-to-live, hours
    pub topic_cache_ttl_hours: u64,

    /// Validity window for an in-progress topic marker, minutes
    pub topic_marker_minutes: u64,

    /// Most-recent entries scanned during a semantic cache lookup
    pub semantic_candidate_limit: u32,

    /// Per-call HTTP timeout, seconds
    pub request_timeout_secs: u64,

    /// Maximum concurrently executing pipeline runs
    pub max_concurrent_runs: usize,

    /// Rate limiting
    pub rate_limit: RateLimitSection,

    /// Circuit breaking
    pub circuit: CircuitSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSection {
    /// Requests admitted per provider within the window
    pub max_requests: usize,

    /// Window length, seconds
    pub window_secs: u64,

    /// How long a caller waits for a slot before the candidate fails,
    /// seconds
    pub acquire_timeout_secs: u64,
}

impl Default for RateLimitSection {
    fn default() -> Self {
        Self {
            max_requests: 60,
            window_secs: 60,
            acquire_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitSection {
    /// Consecutive failures before a provider's circuit opens
    pub failure_threshold: u32,

    /// Initial open duration, seconds
    pub base_delay_secs: u64,

    /// Bound on the open duration, seconds
    pub max_delay_secs: u64,
}

impl Default for CircuitSection {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            base_delay_secs: 5,
            max_delay_secs: 120,
        }
    }
}

impl Default for InquestConfig {
    fn default() -> Self {
        Self {
            search_cache_ttl_hours: 24,
            topic_cache_ttl_hours: 24,
            topic_marker_minutes: 15,
            semantic_candidate_limit: 64,
            request_timeout_secs: 120,
            max_concurrent_runs: 2,
            rate_limit: RateLimitSection::default(),
            circuit: CircuitSection::default(),
        }
    }
}

impl InquestConfig {
    /// Load from a TOML file; missing fields fall back to defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn search_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.search_cache_ttl_hours * 3600)
    }

    pub fn topic_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.topic_cache_ttl_hours * 3600)
    }

    pub fn topic_marker_window(&self) -> Duration {
        Duration::from_secs(self.topic_marker_minutes * 60)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
