//! Topic-level result cache
//!
//! Caches completed research runs by normalized topic and language. An
//! advisory `in_progress` marker keeps concurrent requests for the same
//! topic from duplicating work; markers are only advisory, so duplicate
//! completed rows are tolerated and the newest wins.

use crate::pool::{storage_err, SqlitePool};
use crate::{now_epoch, DEFAULT_TTL};
use inquest_core::{normalize_query, CacheResult, RunRef};
use rusqlite::{params, OptionalExtension};
use std::time::Duration;
use tracing::{debug, warn};

/// Default validity window for an `in_progress` marker
pub const DEFAULT_MARKER_WINDOW: Duration = Duration::from_secs(15 * 60);

/// Result of a topic-cache probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicOutcome {
    /// Completed run in the requested language
    Hit(RunRef),
    /// Completed English run for the same topic; only translation is needed
    PartialHit(RunRef),
    Miss,
}

pub struct TopicCache {
    pool: SqlitePool,
    ttl: Duration,
    marker_window: Duration,
}

impl TopicCache {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            ttl: DEFAULT_TTL,
            marker_window: DEFAULT_MARKER_WINDOW,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_marker_window(mut self, window: Duration) -> Self {
        self.marker_window = window;
        self
    }

    /// Probe for a completed run. Same-language match wins; otherwise a
    /// completed English record for the topic yields a `PartialHit`.
    pub fn find(&self, topic: &str, language: &str) -> CacheResult<TopicOutcome> {
        let normalized = normalize_query(topic);
        let language = normalize_language(language);
        let cutoff = now_epoch() - self.ttl.as_secs_f64();

        if let Some(run_ref) = self.newest_completed(&normalized, &language, cutoff)? {
            debug!(topic = %normalized, %language, "topic cache hit");
            return Ok(TopicOutcome::Hit(run_ref));
        }

        if language != "en" {
            if let Some(run_ref) = self.newest_completed(&normalized, "en", cutoff)? {
                debug!(topic = %normalized, %language, "topic cache partial hit via English record");
                return Ok(TopicOutcome::PartialHit(run_ref));
            }
        }

        Ok(TopicOutcome::Miss)
    }

    /// Claim the topic for writing. Returns `None` when another writer
    /// holds a fresh `in_progress` marker.
    pub fn begin(&self, topic: &str, language: &str) -> CacheResult<Option<i64>> {
        let normalized = normalize_query(topic);
        let language = normalize_language(language);
        let now = now_epoch();
        let marker_cutoff = now - self.marker_window.as_secs_f64();

        self.pool.with_connection(|conn| {
            let active: Option<i64> = conn
                .query_row(
                    "SELECT id FROM topic_cache \
                     WHERE normalized_topic = ?1 AND language = ?2 \
                       AND status = 'in_progress' AND created_at > ?3 \
                     LIMIT 1",
                    params![normalized, language, marker_cutoff],
                    |row| row.get(0),
                )
                .optional()
                .map_err(storage_err)?;
            if let Some(id) = active {
                debug!(topic = %normalized, %language, marker = id, "writer already active");
                return Ok(None);
            }

            conn.execute(
                "INSERT INTO topic_cache (normalized_topic, language, status, created_at) \
                 VALUES (?1, ?2, 'in_progress', ?3)",
                params![normalized, language, now],
            )
            .map_err(storage_err)?;
            Ok(Some(conn.last_insert_rowid()))
        })
    }

    /// Finalize a marker as completed, binding it to the stored run.
    pub fn complete(&self, id: i64, run_ref: &RunRef) -> CacheResult<()> {
        self.pool.with_connection(|conn| {
            conn.execute(
                "UPDATE topic_cache \
                 SET status = 'completed', result_ref = ?2, completed_at = ?3 \
                 WHERE id = ?1",
                params![id, run_ref.to_string(), now_epoch()],
            )
            .map_err(storage_err)?;
            Ok(())
        })
    }

    /// Mark a run as failed. Failed rows are never served as hits.
    pub fn fail(&self, id: i64) -> CacheResult<()> {
        self.pool.with_connection(|conn| {
            conn.execute(
                "UPDATE topic_cache SET status = 'failed', completed_at = ?2 WHERE id = ?1",
                params![id, now_epoch()],
            )
            .map_err(storage_err)?;
            Ok(())
        })
    }

    fn newest_completed(
        &self,
        normalized: &str,
        language: &str,
        cutoff: f64,
    ) -> CacheResult<Option<RunRef>> {
        let result_ref: Option<String> = self.pool.with_connection(|conn| {
            conn.query_row(
                "SELECT result_ref FROM topic_cache \
                 WHERE normalized_topic = ?1 AND language = ?2 \
                   AND status = 'completed' AND result_ref IS NOT NULL \
                   AND completed_at > ?3 \
                 ORDER BY completed_at DESC LIMIT 1",
                params![normalized, language, cutoff],
                |row| row.get(0),
            )
            .optional()
            .map_err(storage_err)
        })?;

        match result_ref {
            Some(raw) => match raw.parse::<RunRef>() {
                Ok(run_ref) => Ok(Some(run_ref)),
                Err(_) => {
                    warn!(result_ref = %raw, "unparseable run reference in topic cache");
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }
}

fn normalize_language(language: &str) -> String {
    let trimmed = language.trim().to_lowercase();
    if trimmed.is_empty() {
        "en".to_string()
    } else {
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> TopicCache {
        TopicCache::new(SqlitePool::memory().unwrap())
    }

    fn completed(cache: &TopicCache, topic: &str, language: &str) -> RunRef {
        let id = cache.begin(topic, language).unwrap().unwrap();
        let run_ref = RunRef::generate();
        cache.complete(id, &run_ref).unwrap();
        run_ref
    }

    #[test]
    fn normalized_topics_are_equivalent() {
        let cache = cache();
        let run_ref = completed(&cache, "quantum computing", "en");

        assert_eq!(
            cache.find("  Quantum   Computing  ", "en").unwrap(),
            TopicOutcome::Hit(run_ref)
        );
    }

    #[test]
    fn english_record_yields_partial_hit_for_other_language() {
        let cache = cache();
        let run_ref = completed(&cache, "quantum computing", "en");

        assert_eq!(
            cache.find("quantum computing", "de").unwrap(),
            TopicOutcome::PartialHit(run_ref)
        );
        // Same-language probe is a full hit, never partial
        assert_eq!(
            cache.find("quantum computing", "en").unwrap(),
            TopicOutcome::Hit(run_ref)
        );
    }

    #[test]
    fn same_language_hit_beats_english_partial() {
        let cache = cache();
        let _english = completed(&cache, "quantum computing", "en");
        let german = completed(&cache, "quantum computing", "de");

        assert_eq!(
            cache.find("quantum computing", "de").unwrap(),
            TopicOutcome::Hit(german)
        );
    }

    #[test]
    fn newest_completed_row_wins() {
        let cache = cache();
        let _old = completed(&cache, "topic", "en");
        std::thread::sleep(Duration::from_millis(5));
        let newer = completed(&cache, "topic", "en");

        assert_eq!(cache.find("topic", "en").unwrap(), TopicOutcome::Hit(newer));
    }

    #[test]
    fn failed_rows_are_never_served() {
        let cache = cache();
        let id = cache.begin("topic", "en").unwrap().unwrap();
        cache.fail(id).unwrap();

        assert_eq!(cache.find("topic", "en").unwrap(), TopicOutcome::Miss);
    }

    #[test]
    fn fresh_marker_blocks_second_writer() {
        let cache = cache();
        assert!(cache.begin("topic", "en").unwrap().is_some());
        assert!(cache.begin("topic", "en").unwrap().is_none());
        // Distinct language is a separate claim
        assert!(cache.begin("topic", "de").unwrap().is_some());
    }

    #[test]
    fn stale_marker_is_ignored_by_writers() {
        let cache = cache().with_marker_window(Duration::ZERO);
        assert!(cache.begin("topic", "en").unwrap().is_some());
        // The first marker is already outside the zero-width window
        assert!(cache.begin("topic", "en").unwrap().is_some());
    }

    #[test]
    fn expired_completed_rows_are_misses() {
        let cache = cache().with_ttl(Duration::ZERO);
        let _run_ref = completed(&cache, "topic", "en");

        assert_eq!(cache.find("topic", "en").unwrap(), TopicOutcome::Miss);
    }
}
