//! Repository for cache entries.

use crate::Database;
use crate::error::{ErrorKind, Result};
use crate::models::{CacheEntry, EntryId, EntryRow};
use apod_content::ContentDigest;
use exn::{OptionExt, ResultExt};
use sqlx::SqlitePool;
use std::path::Path;
use tracing::instrument;

/// Queries and inserts against the `image_cache` table.
///
/// Cheap to clone: it only holds a handle to the connection pool.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}
impl From<&Database> for Repository {
    fn from(db: &Database) -> Self {
        Self { pool: db.pool().clone() }
    }
}
impl Repository {
    fn sqlx_hates_paths(path: &Path) -> Result<&str> {
        path.to_str().ok_or_raise(|| ErrorKind::InvalidData("file path is not valid UTF-8"))
    }

    /// Look up the entry that holds content with this digest.
    pub async fn find_by_digest(&self, sha256: &ContentDigest) -> Result<Option<EntryId>> {
        let row: Option<(i64,)> = sqlx::query_as(include_str!("../queries/find_by_digest.sql"))
            .bind(sha256.as_str())
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(row.map(|(id,)| EntryId::from(id)))
    }

    /// Record a newly stored image and return the id assigned to it.
    ///
    /// Fails with [`ErrorKind::DuplicateDigest`] when another entry already
    /// holds `sha256`. The check is the database's own `UNIQUE` constraint, so
    /// of two concurrent inserts for the same content exactly one succeeds.
    ///
    /// Fails with [`ErrorKind::InvalidData`] for an empty title or a relative
    /// file path; neither is ever written.
    #[instrument(level = "debug", skip_all, fields(title = %title, sha256 = %sha256, file_path = %file_path.display()))]
    pub async fn insert(
        &self,
        title: &str,
        explanation: &str,
        file_path: &Path,
        sha256: &ContentDigest,
    ) -> Result<EntryId> {
        if title.is_empty() {
            exn::bail!(ErrorKind::InvalidData("title must not be empty"));
        }
        if !file_path.is_absolute() {
            exn::bail!(ErrorKind::InvalidData("file path must be absolute"));
        }
        let result = sqlx::query(include_str!("../queries/insert_entry.sql"))
            .bind(title)
            .bind(explanation)
            .bind(Self::sqlx_hates_paths(file_path)?)
            .bind(sha256.as_str())
            .execute(&self.pool)
            .await;
        match result {
            Ok(done) => Ok(EntryId::from(done.last_insert_rowid())),
            Err(e) if e.as_database_error().is_some_and(|db| db.is_unique_violation()) => {
                exn::bail!(ErrorKind::DuplicateDigest(sha256.to_string()))
            },
            Err(e) => Err(e).or_raise(|| ErrorKind::Database),
        }
    }

    /// Fetch a single entry by id.
    pub async fn get_by_id(&self, id: EntryId) -> Result<Option<CacheEntry>> {
        let row: Option<EntryRow> = sqlx::query_as(include_str!("../queries/get_by_id.sql"))
            .bind(i64::from(id))
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(CacheEntry::try_from).transpose()
    }

    /// Titles of every entry, oldest first.
    pub async fn list_titles(&self) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(include_str!("../queries/list_titles.sql"))
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(rows.into_iter().map(|(title,)| title).collect())
    }

    /// Every entry, oldest first.
    pub async fn list_entries(&self) -> Result<Vec<CacheEntry>> {
        let rows: Vec<EntryRow> = sqlx::query_as(include_str!("../queries/list_entries.sql"))
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(CacheEntry::try_from).collect()
    }

    /// Number of entries.
    pub async fn count(&self) -> Result<u64> {
        let (count,): (i64,) = sqlx::query_as(include_str!("../queries/count_entries.sql"))
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        u64::try_from(count).or_raise(|| ErrorKind::InvalidData("negative row count"))
    }
}
