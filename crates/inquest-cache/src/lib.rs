//! SQLite-backed caches for Inquest
//!
//! Two caches share one connection pool: a tiered search-response cache
//! (exact key match with semantic fallback) and a topic-level result
//! cache for completed research runs. Both expire by wall-clock TTL and
//! treat every storage failure as non-fatal to the caller.

mod pool;
mod schema;
mod search_cache;
mod topic_cache;

pub use pool::SqlitePool;
pub use search_cache::{
    CacheOutcome, CacheStats, MatchKind, SearchCache, DEFAULT_CANDIDATE_LIMIT,
};
pub use topic_cache::{TopicCache, TopicOutcome, DEFAULT_MARKER_WINDOW};

use std::time::Duration;

/// Default entry lifetime for both caches
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Wall-clock seconds since the Unix epoch, fractional
pub(crate) fn now_epoch() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
