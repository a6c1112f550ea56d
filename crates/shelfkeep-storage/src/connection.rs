//! Opening the library database.
//!
//! A [`Database`] owns the SQLite pool that repositories and engine
//! transactions draw from. File databases run in WAL mode with foreign keys
//! enforced, and the embedded schema is applied every time one is opened.

use crate::error::{StorageError, StorageResult};
use sqlx::ConnectOptions;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

/// Pool size used unless the operator asks for another.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 4;

/// How long a statement waits on a locked database file by default.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Where the library file lives and how hard to lean on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// Library file. Missing parent directories are created on open.
    pub path: PathBuf,

    /// Upper bound on pooled connections. Writers still take turns on the
    /// SQLite file lock, so extra connections only help concurrent readers.
    pub max_connections: u32,

    /// Wait applied when another connection holds the write lock.
    pub busy_timeout: Duration,
}

impl DatabaseConfig {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Reject settings SQLite or the pool cannot work with.
    pub fn validate(&self) -> StorageResult<()> {
        if self.path.as_os_str().is_empty() {
            return Err(StorageError::Configuration(
                "database path must not be empty".to_string(),
            ));
        }
        if self.max_connections == 0 {
            return Err(StorageError::Configuration(
                "max_connections must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    fn connect_options(&self) -> SqliteConnectOptions {
        SqliteConnectOptions::new()
            .filename(&self.path)
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(self.busy_timeout)
            .disable_statement_logging()
    }
}

/// Shared handle on the library database.
///
/// Built once at startup and passed to the lending engine. Clones share the
/// same pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if needed) the library file described by `config` and
    /// bring its schema up to date.
    ///
    /// ```no_run
    /// use shelfkeep_storage::{Database, DatabaseConfig};
    /// use std::time::Duration;
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let config = DatabaseConfig::new("data/library.db")
    ///     .max_connections(2)
    ///     .busy_timeout(Duration::from_secs(1));
    /// let db = Database::new(config).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn new(config: DatabaseConfig) -> StorageResult<Self> {
        config.validate()?;

        if let Some(dir) = config.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| {
                StorageError::Configuration(format!(
                    "cannot create directory {}: {e}",
                    dir.display()
                ))
            })?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(config.connect_options())
            .await?;

        let db = Self { pool };
        db.migrate().await?;

        info!(
            path = %config.path.display(),
            max_connections = config.max_connections,
            "Library database opened"
        );
        Ok(db)
    }

    /// Fresh, migrated database that lives as long as the handle.
    ///
    /// Every connection to `:memory:` gets its own database, so the pool is
    /// pinned to one connection that is never recycled.
    pub async fn in_memory() -> StorageResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .max_lifetime(None)
            .idle_timeout(None)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Apply the schema files embedded from the workspace `migrations/`
    /// directory. Already applied files are skipped.
    pub async fn migrate(&self) -> StorageResult<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        debug!("Schema up to date");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Wait for borrowed connections to come back, then close them all.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Run SQLite's quick integrity check over the library file.
    pub async fn health_check(&self) -> StorageResult<()> {
        let verdict: String = sqlx::query_scalar("PRAGMA quick_check")
            .fetch_one(&self.pool)
            .await?;

        if verdict != "ok" {
            return Err(StorageError::CorruptRow(format!(
                "integrity check reported: {verdict}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults_and_overrides() {
        let config = DatabaseConfig::new("library.db");
        assert_eq!(config.path, PathBuf::from("library.db"));
        assert_eq!(config.max_connections, DEFAULT_MAX_CONNECTIONS);
        assert_eq!(config.busy_timeout, DEFAULT_BUSY_TIMEOUT);

        let tuned = config
            .max_connections(1)
            .busy_timeout(Duration::from_millis(250));
        assert_eq!(tuned.max_connections, 1);
        assert_eq!(tuned.busy_timeout, Duration::from_millis(250));
        assert!(tuned.validate().is_ok());
    }

    #[test]
    fn test_config_rejects_unusable_settings() {
        assert!(matches!(
            DatabaseConfig::new("library.db").max_connections(0).validate(),
            Err(StorageError::Configuration(_))
        ));
        assert!(matches!(
            DatabaseConfig::new("").validate(),
            Err(StorageError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_open_rejects_zero_connections() {
        let dir = tempfile::tempdir().unwrap();
        let config = DatabaseConfig::new(dir.path().join("library.db")).max_connections(0);

        assert!(matches!(
            Database::new(config).await,
            Err(StorageError::Configuration(_))
        ));
        assert!(!dir.path().join("library.db").exists());
    }

    #[tokio::test]
    async fn test_in_memory_has_schema() {
        let db = Database::in_memory().await.unwrap();

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name IN ('users', 'books', 'loans') ORDER BY name",
        )
        .fetch_all(db.pool())
        .await
        .unwrap();

        let names: Vec<_> = tables.into_iter().map(|(n,)| n).collect();
        assert_eq!(names, vec!["books", "loans", "users"]);
        db.health_check().await.unwrap();
    }
}
