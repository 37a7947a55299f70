//! Database connection and pool management.

use exn::ResultExt;
use sqlx::SqliteConnection;
use sqlx::pool::PoolConnectionMetadata;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::instrument;

use crate::error::{ErrorKind, Result};

/// Embedded migrations that are run automatically on connect.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
/// Name of the database file inside the cache directory, unless configured
/// otherwise.
pub const DEFAULT_DATABASE_FILE: &str = "image_cache.db";
// A handful of readers while one writer holds the lock.
const MAX_CONNECTIONS: u32 = 4;
// Another process adding an image holds the write lock for a single INSERT.
const BUSY_TIMEOUT: Duration = Duration::from_millis(1500);

/// Database connection pool for the metadata store.
///
/// Several processes may open the same database file at once; WAL journaling
/// and the busy timeout let them take turns writing without failing.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    path: Option<PathBuf>,
}

impl Database {
    async fn new(options: SqliteConnectOptions, max: Option<u32>, path: Option<PathBuf>) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            // Query-based PRAGMAs must be applied to every pooled connection,
            // not just the first.
            .after_connect(|conn, meta| Box::pin(async move { Self::apply_pragmas(conn, meta).await }))
            .max_connections(max.unwrap_or(MAX_CONNECTIONS))
            .connect_with(options)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let db = Self { pool, path };
        db.migrate().await?;
        Ok(db)
    }

    /// Open the metadata store inside the cache directory, creating the
    /// database file if it doesn't exist yet.
    ///
    /// Idempotent: opening an existing store applies any pending migrations
    /// and leaves existing entries untouched. The directory itself must
    /// already exist.
    #[instrument(level = "debug", skip_all, fields(directory = %directory.as_ref().display(), file = %file_name.as_ref()))]
    pub async fn initialize(directory: impl AsRef<Path>, file_name: impl AsRef<str>) -> Result<Self> {
        Self::connect(directory.as_ref().join(file_name.as_ref())).await
    }

    /// Connect to the database at the given path.
    ///
    /// Creates the database file if it doesn't exist and runs migrations.
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let options = Self::base_options().filename(path).create_if_missing(true);
        Self::new(options, None, Some(path.to_path_buf())).await
    }

    /// Connect to an in-memory database (useful for testing).
    ///
    /// Note:
    /// - In-memory databases are destroyed when the connection closes.
    /// - Do NOT apply `#[cfg(test)]` so that other crates can also use this in their tests.
    pub async fn connect_in_memory() -> Result<Self> {
        let options = Self::base_options().filename(":memory:");
        // Each connection to ":memory:" is its own database, so the pool
        // must never open a second one.
        Self::new(options, Some(1), None).await
    }

    /// Base connection options shared between file and in-memory databases.
    fn base_options() -> SqliteConnectOptions {
        SqliteConnectOptions::new()
            // WAL lets readers in other processes carry on while one writes.
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(BUSY_TIMEOUT)
    }

    /// Apply additional PRAGMA settings that aren't exposed via SqliteConnectOptions.
    async fn apply_pragmas(conn: &mut SqliteConnection, _meta: PoolConnectionMetadata) -> sqlx::Result<()> {
        sqlx::query(
            r#"
                PRAGMA locking_mode = NORMAL;
                PRAGMA temp_store = MEMORY;
                PRAGMA analysis_limit = 1000;
            "#,
        )
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Run database migrations.
    ///
    /// This is called automatically by `connect` and `connect_in_memory`.
    #[instrument("performing database migrations", skip(self))]
    async fn migrate(&self) -> Result<()> {
        MIGRATOR.run(&self.pool).await.or_raise(|| ErrorKind::Migration)
    }

    /// Get a reference to the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Location of the database file, or `None` for in-memory databases.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Close the database connection pool.
    ///
    /// This waits for all connections to be returned to the pool and then
    /// closes them. After calling this, the Database instance should not
    /// be used.
    pub async fn close(&self) {
        // Let SQLite update query planner statistics
        _ = sqlx::query("PRAGMA optimize").execute(&self.pool).await;
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_in_memory() {
        let db = Database::connect_in_memory().await.unwrap();
        assert!(!db.pool().is_closed());
        assert!(db.path().is_none());
        db.close().await;
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let db = Database::connect_in_memory().await.unwrap();
        db.migrate().await.unwrap();
        db.close().await;
    }

    #[tokio::test]
    async fn test_initialize_creates_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db = Database::initialize(temp_dir.path(), DEFAULT_DATABASE_FILE).await.unwrap();
        let expected = temp_dir.path().join("image_cache.db");
        assert_eq!(db.path(), Some(expected.as_path()));
        assert!(expected.is_file());
        db.close().await;
    }

    #[tokio::test]
    async fn test_initialize_twice() {
        let temp_dir = tempfile::tempdir().unwrap();
        let first = Database::initialize(temp_dir.path(), DEFAULT_DATABASE_FILE).await.unwrap();
        first.close().await;
        let second = Database::initialize(temp_dir.path(), DEFAULT_DATABASE_FILE).await.unwrap();
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM image_cache").fetch_one(second.pool()).await.unwrap();
        assert_eq!(row.0, 0);
        second.close().await;
    }

    #[tokio::test]
    async fn test_pragmas_are_applied() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db = Database::initialize(temp_dir.path(), DEFAULT_DATABASE_FILE).await.unwrap();
        let row: (String,) = sqlx::query_as("PRAGMA journal_mode").fetch_one(db.pool()).await.unwrap();
        assert_eq!(row.0.to_lowercase(), "wal");
        let row: (i64,) = sqlx::query_as("PRAGMA busy_timeout").fetch_one(db.pool()).await.unwrap();
        assert_eq!(row.0, 1500);
        // Set by after_connect().
        let row: (i64,) = sqlx::query_as("PRAGMA temp_store").fetch_one(db.pool()).await.unwrap();
        assert_eq!(row.0, 2, "temp_store should be MEMORY");
        db.close().await;
    }
}
