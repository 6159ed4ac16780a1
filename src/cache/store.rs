//! Cache store trait and SQLite implementation.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{Connection, OptionalExtension};

use super::error::CacheError;
use super::schema;
use super::types::{CacheSummary, FetchRun, FetchRunOutcome};

/// Key under which the HTTP `Last-Modified` validator is persisted.
/// Matches the key the iOS build kept in its user defaults.
const VALIDATOR_KEY: &str = "last-modified";

/// Filename of the raw payload copy, stored exactly as received (it may
/// still be gzip; the decoder sniffs).
const PAYLOAD_FILE: &str = "feed.geojson";

/// How many fetch runs `summary()` reports.
const RECENT_RUNS_LIMIT: usize = 5;

/// Persistent cache for the single feed resource.
///
/// Object-safe so the fetcher and finder can share an `Arc<dyn CacheStore>`.
/// The validator is the conditional-request token; the payload copy is the
/// body of the last fresh response, re-read when a first load is answered
/// with 304.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Current validator, if a fresh fetch ever stored one.
    async fn validator(&self) -> Result<Option<String>, CacheError>;

    /// Replace the validator. There is never more than one.
    async fn set_validator(&self, value: &str) -> Result<(), CacheError>;

    /// Drop the validator so the next fetch is unconditional.
    async fn clear_validator(&self) -> Result<(), CacheError>;

    /// Raw bytes of the last fresh response, if present.
    async fn read_payload(&self) -> Result<Option<Vec<u8>>, CacheError>;

    /// Persist raw response bytes. Must never leave a partial file behind.
    async fn write_payload(&self, bytes: &[u8]) -> Result<(), CacheError>;

    /// Append a fetch attempt to the run log.
    async fn record_fetch(
        &self,
        outcome: FetchRunOutcome,
        detail: Option<&str>,
    ) -> Result<(), CacheError>;

    /// Snapshot for the `status` command.
    async fn summary(&self) -> Result<CacheSummary, CacheError>;

    /// Wipe everything: validator, payload copy and run log.
    async fn clear(&self) -> Result<(), CacheError>;
}

/// SQLite-backed cache store.
///
/// Metadata lives in the database; the payload copy is a plain file next to
/// it, written via temp-then-rename so a crash mid-write cannot corrupt it.
pub struct SqliteCacheStore {
    /// Wrapped in Mutex because rusqlite::Connection is not Sync.
    conn: Mutex<Connection>,
    payload_path: PathBuf,
}

impl std::fmt::Debug for SqliteCacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteCacheStore")
            .field("payload_path", &self.payload_path)
            .finish_non_exhaustive()
    }
}

impl SqliteCacheStore {
    /// Open or create the cache under the given directory.
    pub async fn open(directory: &Path) -> Result<Self, CacheError> {
        let directory = directory.to_path_buf();
        let payload_path = directory.join(PAYLOAD_FILE);

        let conn = tokio::task::spawn_blocking(move || {
            std::fs::create_dir_all(&directory)?;
            let db_path = directory.join("cache.db");
            let conn = Connection::open(&db_path).map_err(|e| CacheError::Open {
                path: db_path.clone(),
                source: e,
            })?;

            // WAL keeps status reads cheap while a fetch writes.
            conn.pragma_update(None, "journal_mode", "WAL")
                .map_err(CacheError::Migration)?;
            conn.pragma_update(None, "synchronous", "NORMAL")
                .map_err(CacheError::Migration)?;

            schema::migrate(&conn)?;

            Ok::<_, CacheError>(conn)
        })
        .await??;

        Ok(Self {
            conn: Mutex::new(conn),
            payload_path,
        })
    }

    /// In-memory database with payloads under the given directory (tests).
    #[cfg(test)]
    pub fn open_in_memory(payload_directory: &Path) -> Result<Self, CacheError> {
        let conn = Connection::open_in_memory().map_err(|e| CacheError::Open {
            path: PathBuf::from(":memory:"),
            source: e,
        })?;
        schema::migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            payload_path: payload_directory.join(PAYLOAD_FILE),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, CacheError> {
        self.conn
            .lock()
            .map_err(|e| CacheError::Query(e.to_string()))
    }
}

#[async_trait]
impl CacheStore for SqliteCacheStore {
    async fn validator(&self) -> Result<Option<String>, CacheError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT value FROM feed_meta WHERE key = ?1",
            [VALIDATOR_KEY],
            |row| row.get(0),
        )
        .optional()
        .map_err(CacheError::query)
    }

    async fn set_validator(&self, value: &str) -> Result<(), CacheError> {
        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT INTO feed_meta (key, value, updated_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
            rusqlite::params![VALIDATOR_KEY, value, Utc::now().timestamp()],
        )
        .map_err(CacheError::query)?;
        Ok(())
    }

    async fn clear_validator(&self) -> Result<(), CacheError> {
        let conn = self.lock()?;
        conn.execute(
            "DELETE FROM feed_meta WHERE key = ?1",
            [VALIDATOR_KEY],
        )
        .map_err(CacheError::query)?;
        Ok(())
    }

    async fn read_payload(&self) -> Result<Option<Vec<u8>>, CacheError> {
        match tokio::fs::read(&self.payload_path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_payload(&self, bytes: &[u8]) -> Result<(), CacheError> {
        let part_path = self.payload_path.with_extension("geojson.part");
        tokio::fs::write(&part_path, bytes).await?;
        tokio::fs::rename(&part_path, &self.payload_path).await?;
        Ok(())
    }

    async fn record_fetch(
        &self,
        outcome: FetchRunOutcome,
        detail: Option<&str>,
    ) -> Result<(), CacheError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO fetch_runs (at, outcome, detail) VALUES (?1, ?2, ?3)",
            rusqlite::params![Utc::now().timestamp(), outcome.as_str(), detail],
        )
        .map_err(CacheError::query)?;
        Ok(())
    }

    async fn summary(&self) -> Result<CacheSummary, CacheError> {
        // Query in a separate scope so the guard is dropped before any await.
        let (validator, validator_updated_at, total_runs, recent_runs) = {
            let conn = self.lock()?;

            let meta: Option<(String, i64)> = conn
                .query_row(
                    "SELECT value, updated_at FROM feed_meta WHERE key = ?1",
                    [VALIDATOR_KEY],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()
                .map_err(CacheError::query)?;

            let total_runs: i64 = conn
                .query_row("SELECT COUNT(*) FROM fetch_runs", [], |row| row.get(0))
                .map_err(CacheError::query)?;

            let mut stmt = conn
                .prepare("SELECT at, outcome, detail FROM fetch_runs ORDER BY at DESC, id DESC LIMIT ?1")
                .map_err(CacheError::query)?;
            let recent_runs: Vec<FetchRun> = stmt
                .query_map([RECENT_RUNS_LIMIT as i64], |row| {
                    let at: i64 = row.get(0)?;
                    let outcome: String = row.get(1)?;
                    let detail: Option<String> = row.get(2)?;
                    Ok((at, outcome, detail))
                })
                .map_err(CacheError::query)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(CacheError::query)?
                .into_iter()
                .map(|(at, outcome, detail)| FetchRun {
                    at: Utc
                        .timestamp_opt(at, 0)
                        .single()
                        .unwrap_or(DateTime::UNIX_EPOCH),
                    outcome,
                    detail,
                })
                .collect();

            let (validator, updated_at) = match meta {
                Some((value, ts)) => (Some(value), Utc.timestamp_opt(ts, 0).single()),
                None => (None, None),
            };
            (validator, updated_at, total_runs, recent_runs)
        };

        let payload_bytes = match tokio::fs::metadata(&self.payload_path).await {
            Ok(meta) => Some(meta.len()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        Ok(CacheSummary {
            validator,
            validator_updated_at,
            payload_bytes,
            total_runs: total_runs as u64,
            recent_runs,
        })
    }

    async fn clear(&self) -> Result<(), CacheError> {
        {
            let conn = self.lock()?;
            conn.execute("DELETE FROM feed_meta", [])
                .map_err(CacheError::query)?;
            conn.execute("DELETE FROM fetch_runs", [])
                .map_err(CacheError::query)?;
        }
        match tokio::fs::remove_file(&self.payload_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
