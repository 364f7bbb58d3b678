// scheduler-store/src/sqlite.rs
// ============================================================================
// Module: Fleet Scheduler SQLite Store
// Description: Durable compare-and-swap store backed by SQLite WAL.
// Purpose: Persist environment/deployment records with crash-safe CAS writes.
// Dependencies: scheduler-core, rusqlite, serde, serde_json, thiserror, tokio
// ============================================================================

//! ## Overview
//! This module implements [`Store`] over a single `SQLite` table keyed by a
//! caller-supplied string key, with a monotonically increasing per-key
//! version column enforcing compare-and-swap. Blocking `SQLite` calls run on
//! [`tokio::task::spawn_blocking`] so the async runtime's worker threads are
//! never blocked on file I/O. Stored values are opaque JSON blobs; callers
//! choose the value type `V`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::marker::PhantomData;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::params;
use scheduler_core::Store;
use scheduler_core::StoreError;
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// Configuration for the `SQLite`-backed store.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
}

const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors, convertible into the store-contract [`StoreError`].
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Stored JSON failed to (de)serialize.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
    /// The validator rejected the current value.
    #[error("sqlite store validation failed: {0}")]
    ValidationFailed(String),
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message) => Self::Io(message),
            SqliteStoreError::Invalid(message) => Self::Corrupt(message),
            SqliteStoreError::ValidationFailed(message) => Self::ValidationFailed(message),
        }
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed store with WAL support and per-key version CAS.
#[derive(Clone)]
pub struct SqliteStore<V> {
    /// Shared `SQLite` connection guarded by a std mutex; all access happens
    /// inside `spawn_blocking`.
    connection: Arc<Mutex<Connection>>,
    /// Marks the value type this store instance is specialized for.
    value_type: PhantomData<fn() -> V>,
}

impl<V> SqliteStore<V>
where
    V: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Opens a `SQLite`-backed store, creating the database file and schema
    /// if necessary.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// initialized.
    pub fn open(config: SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(&config)?;
        initialize_schema(&mut connection)?;
        Ok(Self { connection: Arc::new(Mutex::new(connection)), value_type: PhantomData })
    }
}

impl<V> Store<V> for SqliteStore<V>
where
    V: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> Result<Option<V>, StoreError> {
        let connection = Arc::clone(&self.connection);
        let key = key.to_string();
        tokio::task::spawn_blocking(move || get_blocking::<V>(&connection, &key))
            .await
            .map_err(|err| StoreError::Io(err.to_string()))?
            .map_err(StoreError::from)
    }

    async fn put<F>(&self, key: &str, validate: F) -> Result<V, StoreError>
    where
        F: FnOnce(Option<V>) -> Result<V, String> + Send,
    {
        let connection = Arc::clone(&self.connection);
        let key = key.to_string();
        tokio::task::spawn_blocking(move || put_blocking(&connection, &key, validate))
            .await
            .map_err(|err| StoreError::Io(err.to_string()))?
            .map_err(StoreError::from)
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let connection = Arc::clone(&self.connection);
        let key = key.to_string();
        tokio::task::spawn_blocking(move || delete_blocking(&connection, &key))
            .await
            .map_err(|err| StoreError::Io(err.to_string()))?
            .map_err(StoreError::from)
    }

    async fn list_keys(&self) -> Result<Vec<String>, StoreError> {
        let connection = Arc::clone(&self.connection);
        tokio::task::spawn_blocking(move || list_keys_blocking(&connection))
            .await
            .map_err(|err| StoreError::Io(err.to_string()))?
            .map_err(StoreError::from)
    }
}

// ============================================================================
// SECTION: Blocking Helpers
// ============================================================================

fn get_blocking<V>(
    connection: &Mutex<Connection>,
    key: &str,
) -> Result<Option<V>, SqliteStoreError>
where
    V: DeserializeOwned,
{
    let guard = connection.lock().map_err(|_| SqliteStoreError::Db("mutex poisoned".to_string()))?;
    let bytes: Option<Vec<u8>> = guard
        .query_row("SELECT value_json FROM entries WHERE key = ?1", params![key], |row| row.get(0))
        .optional()
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    bytes
        .map(|bytes| serde_json::from_slice(&bytes).map_err(|err| SqliteStoreError::Invalid(err.to_string())))
        .transpose()
}

fn put_blocking<V, F>(
    connection: &Mutex<Connection>,
    key: &str,
    validate: F,
) -> Result<V, SqliteStoreError>
where
    V: Serialize + DeserializeOwned,
    F: FnOnce(Option<V>) -> Result<V, String>,
{
    let mut guard = connection.lock().map_err(|_| SqliteStoreError::Db("mutex poisoned".to_string()))?;
    let tx = guard.transaction().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    let row: Option<(Vec<u8>, i64)> = tx
        .query_row(
            "SELECT value_json, version FROM entries WHERE key = ?1",
            params![key],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    let (current, next_version) = match row {
        None => (None, 1_i64),
        Some((bytes, version)) => {
            let value: V = serde_json::from_slice(&bytes)
                .map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
            let next_version = version
                .checked_add(1)
                .ok_or_else(|| SqliteStoreError::Invalid("entry version overflow".to_string()))?;
            (Some(value), next_version)
        }
    };
    let next = validate(current).map_err(SqliteStoreError::ValidationFailed)?;
    let next_json =
        serde_json::to_vec(&next).map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
    tx.execute(
        "INSERT INTO entries (key, version, value_json) VALUES (?1, ?2, ?3)
         ON CONFLICT(key) DO UPDATE SET version = excluded.version, value_json = excluded.value_json",
        params![key, next_version, next_json],
    )
    .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    drop(guard);
    Ok(next)
}

fn delete_blocking(connection: &Mutex<Connection>, key: &str) -> Result<(), SqliteStoreError> {
    let guard = connection.lock().map_err(|_| SqliteStoreError::Db("mutex poisoned".to_string()))?;
    guard
        .execute("DELETE FROM entries WHERE key = ?1", params![key])
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}

fn list_keys_blocking(connection: &Mutex<Connection>) -> Result<Vec<String>, SqliteStoreError> {
    let guard = connection.lock().map_err(|_| SqliteStoreError::Db("mutex poisoned".to_string()))?;
    let mut stmt = guard
        .prepare("SELECT key FROM entries ORDER BY key")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    let keys = stmt
        .query_map(params![], |row| row.get(0))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?
        .collect::<Result<Vec<String>, _>>()
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(keys)
}

fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(connection)
}

fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS entries (
                    key TEXT PRIMARY KEY,
                    version INTEGER NOT NULL,
                    value_json BLOB NOT NULL
                );",
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::Invalid(format!("unsupported schema version: {value}")));
        }
    }
    tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, serde::Deserialize)]
    struct Counter(u32);

    fn open_temp() -> (tempfile::TempDir, SqliteStore<Counter>) {
        let dir = tempfile::tempdir().unwrap();
        let config = SqliteStoreConfig {
            path: dir.path().join("store.sqlite3"),
            busy_timeout_ms: default_busy_timeout_ms(),
            journal_mode: SqliteStoreMode::Wal,
        };
        let store = SqliteStore::open(config).unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn round_trips_a_value_through_put_and_get() {
        let (_dir, store) = open_temp();
        store.put("k", |_| Ok(Counter(1))).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(Counter(1)));
    }

    #[tokio::test]
    async fn validator_sees_the_previously_written_value() {
        let (_dir, store) = open_temp();
        store.put("k", |current| Ok(Counter(current.map_or(0, |c| c.0) + 1))).await.unwrap();
        store.put("k", |current| Ok(Counter(current.map_or(0, |c| c.0) + 1))).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(Counter(2)));
    }

    #[tokio::test]
    async fn validator_rejection_leaves_the_row_unchanged() {
        let (_dir, store) = open_temp();
        store.put("k", |_| Ok(Counter(1))).await.unwrap();
        let err = store.put("k", |_| Err("rejected".to_string())).await.unwrap_err();
        assert!(matches!(err, StoreError::ValidationFailed(_)));
        assert_eq!(store.get("k").await.unwrap(), Some(Counter(1)));
    }

    #[tokio::test]
    async fn reopening_the_same_path_preserves_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.sqlite3");
        {
            let store: SqliteStore<Counter> = SqliteStore::open(SqliteStoreConfig {
                path: path.clone(),
                busy_timeout_ms: default_busy_timeout_ms(),
                journal_mode: SqliteStoreMode::Wal,
            })
            .unwrap();
            store.put("k", |_| Ok(Counter(5))).await.unwrap();
        }
        let store: SqliteStore<Counter> = SqliteStore::open(SqliteStoreConfig {
            path,
            busy_timeout_ms: default_busy_timeout_ms(),
            journal_mode: SqliteStoreMode::Wal,
        })
        .unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(Counter(5)));
    }
}
