//! Storage backend trait and implementations.
//!
//! This module defines the `StorageBackend` trait, the interface the cache
//! orchestrator uses to place and inspect image files. `LocalBackend` is the
//! filesystem implementation.

mod local;

pub use self::local::{LocalBackend, TEMPORARY_PREFIX, ensure_directory};
use crate::error::Result;
use crate::models::FileInfo;
use async_trait::async_trait;
use futures::{Stream, TryStreamExt};
use std::path::{Path, PathBuf};
use std::pin::Pin;

pub(crate) type FileInfoStream<'a> = Pin<Box<dyn Stream<Item = Result<FileInfo>> + Send + 'a>>;

/// Unified interface for the cache directory.
///
/// All operations are asynchronous so they can be awaited from the
/// orchestrator without blocking the runtime.
///
/// # Naming
/// Every name is relative to the cache directory and must be a single path
/// component, validated with [`validate_name`](crate::validate_name).
/// Implementations enforce this.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use apod_storage::{StorageBackend, error::Result};
///
/// async fn cached_image(backend: &dyn StorageBackend) -> Result<Vec<u8>> {
///     backend.read(Path::new("Galaxy_in_a_Bubble.jpg")).await
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Name of the configured backend, used for logging only.
    fn name(&self) -> &str;

    /// Absolute path of the cache directory itself.
    fn root(&self) -> &Path;

    /// Resolve a file name to its absolute location in the cache directory.
    ///
    /// Returns [`InvalidPath`](crate::error::ErrorKind::InvalidPath) if the
    /// name is not a single plain component.
    fn absolute_path(&self, name: &Path) -> Result<PathBuf>;

    /// List every file directly inside the cache directory.
    ///
    /// Default implementation of this method is to collect all the results
    /// from [`list_stream()`](Self::list_stream) into a [`Vec`] before
    /// returning.
    async fn list(&self) -> Result<Vec<FileInfo>> {
        self.list_stream().try_collect().await
    }

    /// Stream metadata for every file directly inside the cache directory.
    ///
    /// Subdirectories and anything that isn't a regular file are skipped.
    /// Ordering is whatever the filesystem yields.
    ///
    /// # Examples
    ///
    /// ```
    /// use futures::TryStreamExt;
    /// # use apod_storage::{StorageBackend, error::Result};
    /// # async fn example(backend: &dyn StorageBackend) -> Result<()> {
    /// let mut stream = backend.list_stream();
    /// while let Some(info) = stream.try_next().await? {
    ///     println!("{}: {} bytes", info.path.display(), info.size);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    fn list_stream(&self) -> FileInfoStream<'_>;

    /// Read file contents.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    async fn read(&self, name: &Path) -> Result<Vec<u8>>;

    /// Create a new file with the given contents.
    ///
    /// The bytes are written to a temporary file inside the cache directory,
    /// flushed to disk, and then moved to `name` without replacing anything
    /// already there. Readers therefore either see the complete file or no
    /// file at all.
    ///
    /// Returns [`AlreadyExists`](crate::error::ErrorKind::AlreadyExists) if
    /// `name` is already taken, in which case nothing is left behind.
    ///
    /// ```no_run
    /// use std::path::Path;
    /// # use apod_storage::{StorageBackend, error::Result};
    /// # async fn example(backend: &dyn StorageBackend) -> Result<()> {
    /// let stored_at = backend.write_new(Path::new("Moon.jpg"), b"...").await?;
    /// assert!(stored_at.is_absolute());
    /// # Ok(())
    /// # }
    /// ```
    async fn write_new(&self, name: &Path, data: &[u8]) -> Result<PathBuf>;

    /// Delete a file.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    async fn delete(&self, name: &Path) -> Result<()>;
}
