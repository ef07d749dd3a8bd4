//! Cache table definitions

use rusqlite::Connection;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS search_cache (
    cache_key     TEXT PRIMARY KEY,
    query_text    TEXT NOT NULL,
    depth         TEXT NOT NULL,
    max_results   INTEGER NOT NULL,
    embedding     BLOB,
    response_json TEXT NOT NULL,
    created_at    REAL NOT NULL,
    expires_at    REAL NOT NULL,
    hit_count     INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_search_cache_expires
    ON search_cache (expires_at);

CREATE INDEX IF NOT EXISTS idx_search_cache_params
    ON search_cache (depth, max_results, created_at);

CREATE TABLE IF NOT EXISTS topic_cache (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    normalized_topic TEXT NOT NULL,
    language         TEXT NOT NULL,
    status           TEXT NOT NULL,
    result_ref       TEXT,
    created_at       REAL NOT NULL,
    completed_at     REAL
);

CREATE INDEX IF NOT EXISTS idx_topic_cache_topic
    ON topic_cache (normalized_topic, language);
";

/// Create both cache tables and their indexes if missing
pub fn apply_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA)
}
