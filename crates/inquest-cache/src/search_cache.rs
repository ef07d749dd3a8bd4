//! Tiered search-response cache
//!
//! Lookup tries an exact key match first, then a semantic pass over a
//! bounded set of recent entries with identical parameters. The semantic
//! tier only exists when an embedder is configured, and any embedding
//! failure quietly degrades the cache to exact-only for that call.

use crate::pool::{storage_err, SqlitePool};
use crate::{now_epoch, DEFAULT_TTL};
use inquest_core::{
    cache_key, cosine_similarity, normalize_query, CacheResult, EmbeddingProvider, SearchParams,
    SearchResponse,
};
use rusqlite::{params, OptionalExtension};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// How a cache hit was matched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Exact,
    Semantic,
}

/// Result of a cache lookup
#[derive(Debug, Clone)]
pub enum CacheOutcome {
    Hit {
        payload: SearchResponse,
        matched_by: MatchKind,
        /// Cosine similarity for semantic matches, `None` for exact
        similarity: Option<f32>,
    },
    Miss,
}

/// Aggregate cache counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: u64,
    pub hits: u64,
    pub misses: u64,
}

/// Default bound on the semantic candidate scan
pub const DEFAULT_CANDIDATE_LIMIT: u32 = 64;

pub struct SearchCache {
    pool: SqlitePool,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    ttl: Duration,
    candidate_limit: u32,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl SearchCache {
    pub fn new(pool: SqlitePool, embedder: Option<Arc<dyn EmbeddingProvider>>) -> Self {
        Self {
            pool,
            embedder,
            ttl: DEFAULT_TTL,
            candidate_limit: DEFAULT_CANDIDATE_LIMIT,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_candidate_limit(mut self, limit: u32) -> Self {
        self.candidate_limit = limit.max(1);
        self
    }

    /// Look up a cached response, exact tier first, semantic second.
    pub async fn lookup(&self, query: &str, params: &SearchParams) -> CacheResult<CacheOutcome> {
        let key = cache_key(query, params);
        let now = now_epoch();

        if let Some(payload) = self.exact_lookup(&key, now)? {
            debug!(%key, "exact cache hit");
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(CacheOutcome::Hit {
                payload,
                matched_by: MatchKind::Exact,
                similarity: None,
            });
        }

        if let Some((payload, similarity)) = self.semantic_lookup(query, params, now).await? {
            debug!(%key, similarity, "semantic cache hit");
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(CacheOutcome::Hit {
                payload,
                matched_by: MatchKind::Semantic,
                similarity: Some(similarity),
            });
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        Ok(CacheOutcome::Miss)
    }

    /// Store a live response under its exact key, embedding it when an
    /// embedder is available. Upserts, so a refreshed entry replaces any
    /// stale row for the same key.
    pub async fn store(
        &self,
        query: &str,
        params: &SearchParams,
        response: &SearchResponse,
    ) -> CacheResult<()> {
        let key = cache_key(query, params);
        let normalized = normalize_query(query);
        let embedding = match &self.embedder {
            Some(embedder) => match embedder.embed(&normalized).await {
                Ok(vector) => Some(vec_to_blob(&vector)),
                Err(e) => {
                    warn!(error = %e, "embedding failed, storing without vector");
                    None
                }
            },
            None => None,
        };

        let json = serde_json::to_string(response)?;
        let now = now_epoch();
        let expires_at = now + self.ttl.as_secs_f64();

        self.pool.with_connection(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO search_cache \
                 (cache_key, query_text, depth, max_results, embedding, response_json, \
                  created_at, expires_at, hit_count) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0)",
                params![
                    key,
                    normalized,
                    params.depth.as_str(),
                    params.max_results,
                    embedding,
                    json,
                    now,
                    expires_at,
                ],
            )
            .map_err(storage_err)?;
            Ok(())
        })
    }

    /// Delete every expired row. Returns the number removed.
    pub fn clear_expired(&self) -> CacheResult<usize> {
        let now = now_epoch();
        self.pool.with_connection(|conn| {
            conn.execute("DELETE FROM search_cache WHERE expires_at <= ?1", params![now])
                .map_err(storage_err)
        })
    }

    pub fn stats(&self) -> CacheResult<CacheStats> {
        let entries: i64 = self.pool.with_connection(|conn| {
            conn.query_row("SELECT COUNT(*) FROM search_cache", [], |row| row.get(0))
                .map_err(storage_err)
        })?;
        Ok(CacheStats {
            entries: entries as u64,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        })
    }

    /// Exact-tier lookup. Expired rows are deleted in passing.
    fn exact_lookup(&self, key: &str, now: f64) -> CacheResult<Option<SearchResponse>> {
        let row: Option<(String, f64)> = self.pool.with_connection(|conn| {
            conn.query_row(
                "SELECT response_json, expires_at FROM search_cache WHERE cache_key = ?1",
                params![key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(storage_err)
        })?;

        let Some((json, expires_at)) = row else {
            return Ok(None);
        };

        if expires_at <= now {
            self.pool.with_connection(|conn| {
                conn.execute("DELETE FROM search_cache WHERE cache_key = ?1", params![key])
                    .map_err(storage_err)
            })?;
            return Ok(None);
        }

        self.bump_hit_count(key)?;
        Ok(Some(serde_json::from_str(&json)?))
    }

    /// Semantic tier: bounded scan over recent entries with identical
    /// parameters, best cosine score above the embedder's threshold wins.
    async fn semantic_lookup(
        &self,
        query: &str,
        search_params: &SearchParams,
        now: f64,
    ) -> CacheResult<Option<(SearchResponse, f32)>> {
        let Some(embedder) = &self.embedder else {
            return Ok(None);
        };

        let query_vector = match embedder.embed(&normalize_query(query)).await {
            Ok(vector) => vector,
            Err(e) => {
                warn!(error = %e, "embedding failed, skipping semantic tier");
                return Ok(None);
            }
        };
        let threshold = embedder.recommended_threshold();

        let candidates: Vec<(String, Vec<u8>, String)> = self.pool.with_connection(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT cache_key, embedding, response_json FROM search_cache \
                     WHERE depth = ?1 AND max_results = ?2 AND expires_at > ?3 \
                       AND embedding IS NOT NULL \
                     ORDER BY created_at DESC LIMIT ?4",
                )
                .map_err(storage_err)?;
            let rows = stmt
                .query_map(
                    params![
                        search_params.depth.as_str(),
                        search_params.max_results,
                        now,
                        self.candidate_limit,
                    ],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )
                .map_err(storage_err)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(storage_err)
        })?;

        let mut best: Option<(f32, &str, &str)> = None;
        for (key, blob, json) in &candidates {
            let similarity = cosine_similarity(&query_vector, &blob_to_vec(blob));
            if similarity >= threshold
                && best.map(|(s, _, _)| similarity > s).unwrap_or(true)
            {
                best = Some((similarity, key, json));
            }
        }

        let Some((similarity, key, json)) = best else {
            return Ok(None);
        };
        self.bump_hit_count(key)?;
        Ok(Some((serde_json::from_str(json)?, similarity)))
    }

    fn bump_hit_count(&self, key: &str) -> CacheResult<()> {
        self.pool.with_connection(|conn| {
            conn.execute(
                "UPDATE search_cache SET hit_count = hit_count + 1 WHERE cache_key = ?1",
                params![key],
            )
            .map_err(storage_err)?;
            Ok(())
        })
    }
}

fn vec_to_blob(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|f| f.to_le_bytes()).collect()
}

fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}
