//! SQLite connection pool
//!
//! A simple `Arc<Mutex<Connection>>` wrapper rather than a real pool: in
//! WAL mode SQLite allows one writer, and cache operations are short
//! enough that a mutex is adequate.

use inquest_core::{CacheError, CacheResult};
use parking_lot::Mutex;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Thread-safe SQLite connection wrapper shared by both caches
#[derive(Clone)]
pub struct SqlitePool {
    conn: Arc<Mutex<Connection>>,
}

impl SqlitePool {
    /// Open (or create) the database at `path` and apply pragmas + schema
    pub fn open(path: impl AsRef<Path>) -> CacheResult<Self> {
        let path: PathBuf = path.as_ref().to_path_buf();
        info!(path = %path.display(), "opening cache database");

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| CacheError::Storage(format!("failed to create directory: {e}")))?;
        }
        let conn = Connection::open(&path).map_err(storage_err)?;
        Self::from_connection(conn)
    }

    /// In-memory database for tests
    pub fn memory() -> CacheResult<Self> {
        let conn = Connection::open_in_memory().map_err(storage_err)?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> CacheResult<Self> {
        let pool = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        pool.configure_pragmas()?;
        pool.with_connection(|conn| {
            crate::schema::apply_schema(conn).map_err(storage_err)
        })?;
        Ok(pool)
    }

    /// Execute a closure with the connection
    pub fn with_connection<F, T>(&self, f: F) -> CacheResult<T>
    where
        F: FnOnce(&Connection) -> CacheResult<T>,
    {
        let conn = self.conn.lock();
        f(&conn)
    }

    fn configure_pragmas(&self) -> CacheResult<()> {
        debug!("configuring SQLite pragmas");
        self.with_connection(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;\n\
                 PRAGMA synchronous = NORMAL;\n\
                 PRAGMA busy_timeout = 5000;\n\
                 PRAGMA temp_store = MEMORY;",
            )
            .map_err(storage_err)
        })
    }
}

/// Map a rusqlite error into the cache taxonomy
pub(crate) fn storage_err(e: rusqlite::Error) -> CacheError {
    CacheError::Storage(e.to_string())
}
