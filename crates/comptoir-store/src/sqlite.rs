//! # SQLite Store
//!
//! `KeyValueStore` backed by a single-table SQLite database.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Session Database                                   │
//! │                                                                         │
//! │  AppContext::init                                                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  StoreConfig::new(path) ← Configure pool settings                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SqliteStore::open(config).await ← Create pool + run migrations        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌──────────────────────────────────────────────┐                      │
//! │  │ kv_store                                     │                      │
//! │  │ ──────────────────────────────────────────── │                      │
//! │  │ key (PK)  │ value              │ updated_at  │                      │
//! │  │ token     │ eyJhbGciOi...      │ 2024-03-01… │                      │
//! │  │ user      │ {"id":1,"email"…}  │ 2024-03-01… │                      │
//! │  └──────────────────────────────────────────────┘                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## WAL Mode
//! WAL keeps readers from blocking the writer, and a crash mid-write never
//! leaves a half-written `set_many` batch behind.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::kv::KeyValueStore;
use crate::migrations;

const IN_MEMORY_PATH: &str = ":memory:";

const UPSERT_SQL: &str = r#"
    INSERT INTO kv_store (key, value, updated_at)
    VALUES (?1, ?2, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
    ON CONFLICT(key) DO UPDATE SET
        value = excluded.value,
        updated_at = excluded.updated_at
"#;

// =============================================================================
// Configuration
// =============================================================================

/// Store configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = StoreConfig::new("/path/to/session.db").max_connections(2);
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Path to the SQLite database file, or `:memory:`.
    pub database_path: PathBuf,

    /// Maximum number of pooled connections.
    /// Default: 4
    pub max_connections: u32,

    /// Connection acquire timeout.
    /// Default: 10 seconds
    pub connect_timeout: Duration,

    /// Whether to run migrations on open.
    /// Default: true
    pub run_migrations: bool,
}

impl StoreConfig {
    /// Creates a configuration for the database file at `path`.
    /// The file and its parent directory are created if missing.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        StoreConfig {
            database_path: path.into(),
            max_connections: 4,
            connect_timeout: Duration::from_secs(10),
            run_migrations: true,
        }
    }

    /// Creates an in-memory configuration (for testing).
    pub fn in_memory() -> Self {
        StoreConfig {
            database_path: PathBuf::from(IN_MEMORY_PATH),
            // Each connection to :memory: is its own database.
            max_connections: 1,
            connect_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    /// Sets the maximum number of connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets whether to run migrations on open.
    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == IN_MEMORY_PATH
    }
}

// =============================================================================
// Store
// =============================================================================

/// SQLite-backed key-value store.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens (and if needed creates) the session database.
    ///
    /// ## What This Does
    /// 1. Creates the parent directory if it doesn't exist
    /// 2. Configures SQLite: WAL journal, NORMAL synchronous
    /// 3. Creates the connection pool
    /// 4. Runs migrations (if enabled)
    pub async fn open(config: StoreConfig) -> StoreResult<Self> {
        info!(
            path = %config.database_path.display(),
            "Opening session store"
        );

        let in_memory = config.is_in_memory();

        let connect_options = if in_memory {
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?
        } else {
            if let Some(parent) = config.database_path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)
                        .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;
                }
            }
            SqliteConnectOptions::new()
                .filename(&config.database_path)
                .create_if_missing(true)
        }
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal);

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .acquire_timeout(config.connect_timeout);

        if in_memory {
            // Dropping the only connection would drop the database with it.
            pool_options = pool_options
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = pool_options
            .connect_with(connect_options)
            .await
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;

        debug!(
            max_connections = config.max_connections,
            in_memory, "Store pool created"
        );

        let store = SqliteStore { pool };

        if config.run_migrations {
            migrations::run_migrations(&store.pool).await?;
        }

        Ok(store)
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Checks that the database answers queries.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }

    /// Closes the pool. Later operations fail with `ConnectionFailed`.
    pub async fn close(&self) {
        info!("Closing session store");
        self.pool.close().await;
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let value = sqlx::query_scalar::<_, String>("SELECT value FROM kv_store WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        sqlx::query(UPSERT_SQL)
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await?;
        debug!(key = %key, "Stored key");
        Ok(())
    }

    async fn set_many(&self, entries: &[(&str, &str)]) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        for (key, value) in entries {
            sqlx::query(UPSERT_SQL)
                .bind(*key)
                .bind(*value)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        debug!(count = entries.len(), "Stored keys atomically");
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        sqlx::query("DELETE FROM kv_store WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        debug!(key = %key, "Deleted key");
        Ok(())
    }

    async fn delete_many(&self, keys: &[&str]) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        for key in keys {
            sqlx::query("DELETE FROM kv_store WHERE key = ?1")
                .bind(*key)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        debug!(count = keys.len(), "Deleted keys");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::keys;

    async fn memory_store() -> SqliteStore {
        SqliteStore::open(StoreConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_in_memory_store() {
        let store = memory_store().await;
        assert!(store.health_check().await);
        assert_eq!(store.get(keys::TOKEN).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_overwrites() {
        let store = memory_store().await;
        store.set(keys::TOKEN, "first").await.unwrap();
        store.set(keys::TOKEN, "second").await.unwrap();
        assert_eq!(
            store.get(keys::TOKEN).await.unwrap().as_deref(),
            Some("second")
        );
    }

    #[tokio::test]
    async fn test_set_many_then_delete_many() {
        let store = memory_store().await;
        store
            .set_many(&[(keys::TOKEN, "abc"), (keys::USER, r#"{"id":1}"#)])
            .await
            .unwrap();

        assert_eq!(store.get(keys::TOKEN).await.unwrap().as_deref(), Some("abc"));
        assert_eq!(
            store.get(keys::USER).await.unwrap().as_deref(),
            Some(r#"{"id":1}"#)
        );

        store.delete_many(&keys::SESSION).await.unwrap();
        assert_eq!(store.get(keys::TOKEN).await.unwrap(), None);
        assert_eq!(store.get(keys::USER).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_absent_key_succeeds() {
        let store = memory_store().await;
        store.delete("never-written").await.unwrap();
    }

    #[tokio::test]
    async fn test_closed_store_fails() {
        let store = memory_store().await;
        store.close().await;

        let err = store.set(keys::TOKEN, "abc").await.unwrap_err();
        assert!(matches!(err, StoreError::ConnectionFailed(_)));
    }

    #[tokio::test]
    async fn test_values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.db");

        {
            let store = SqliteStore::open(StoreConfig::new(&path)).await.unwrap();
            store
                .set_many(&[(keys::TOKEN, "abc"), (keys::USER, "{}")])
                .await
                .unwrap();
            store.close().await;
        }

        let reopened = SqliteStore::open(StoreConfig::new(&path)).await.unwrap();
        assert_eq!(
            reopened.get(keys::TOKEN).await.unwrap().as_deref(),
            Some("abc")
        );
        assert_eq!(reopened.get(keys::USER).await.unwrap().as_deref(), Some("{}"));
    }

    #[test]
    fn test_config_builder() {
        let config = StoreConfig::new("/tmp/session.db")
            .max_connections(2)
            .run_migrations(false);

        assert_eq!(config.max_connections, 2);
        assert!(!config.run_migrations);
        assert!(!config.is_in_memory());
        assert!(StoreConfig::in_memory().is_in_memory());
    }
}
