//! Local filesystem storage backend.
//!
//! Files are stored flat in a configured directory and accessed via
//! `tokio::fs`. Writes of new files go through `tempfile` on a blocking
//! thread so the final rename can refuse to clobber an existing file.

use crate::backend::FileInfoStream;
use crate::error::ErrorKind;
use crate::{FileInfo, StorageBackend, error::Result, path::validate as validate_name};
use async_stream::stream;
use async_trait::async_trait;
use exn::ResultExt;
use std::fs::create_dir_all as sync_create_dir;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::fs::{self, DirEntry};
use tracing::instrument;

/// Prefix of the temporary files [`write_new()`](StorageBackend::write_new)
/// creates next to their destination. Anything in the cache directory
/// starting with this prefix is left over from an interrupted write.
pub const TEMPORARY_PREFIX: &str = ".tmp";

/// Make sure `path` is a usable cache directory, creating it (and any
/// missing parents) if necessary.
///
/// Calling this on a directory that already exists does nothing. Fails with
/// [`DirectoryAccess`](ErrorKind::DirectoryAccess) if `path` is relative,
/// if something other than a directory already exists there, if the
/// directory cannot be created, or if it is read-only.
///
/// ```no_run
/// let root = apod_storage::ensure_directory("/var/cache/apod/images").unwrap();
/// assert!(root.is_dir());
/// ```
#[instrument(level = "debug", skip_all, fields(path = %path.as_ref().display()))]
pub fn ensure_directory(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    let access_error = || ErrorKind::DirectoryAccess(path.to_path_buf());
    if !path.is_absolute() {
        exn::bail!(access_error());
    }
    // Runs once per handle; not worth making every constructor async for.
    sync_create_dir(path).or_raise(access_error)?;
    let metadata = std::fs::metadata(path).or_raise(access_error)?;
    if !metadata.is_dir() || metadata.permissions().readonly() {
        exn::bail!(access_error());
    }
    Ok(path.to_path_buf())
}

enum WalkEntry {
    File(FileInfo),
    Skip,
}

/// Local filesystem storage backend.
///
/// Stores files directly in a directory on the local filesystem. All names
/// are relative to the configured root directory.
///
/// # Examples
///
/// ```no_run
/// use apod_storage::LocalBackend;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = LocalBackend::new("images", "/var/cache/apod/images")?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct LocalBackend {
    name: String,
    /// Root directory of the cache
    root: PathBuf,
}
impl LocalBackend {
    /// Create a new local filesystem backend, creating the root directory if
    /// it doesn't exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryAccess`](ErrorKind::DirectoryAccess) under the same
    /// conditions as [`ensure_directory()`].
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = ensure_directory(root)?;
        Ok(Self { name: name.into(), root })
    }

    fn map_io_error(e: std::io::Error, path: &Path) -> ErrorKind {
        match e.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied(path.to_path_buf()),
            std::io::ErrorKind::AlreadyExists => ErrorKind::AlreadyExists(path.to_path_buf()),
            _ => ErrorKind::Io(e),
        }
    }

    /// Keeps the error conversion out of the `stream!` body, where `?` can't
    /// be used.
    async fn process_entry(entry: DirEntry) -> Result<WalkEntry> {
        let path = entry.path();
        let metadata = entry.metadata().await.map_err(|e| Self::map_io_error(e, &path))?;
        if !metadata.is_file() {
            // Subdirectories and (most likely broken) symlinks are not part of the cache.
            return Ok(WalkEntry::Skip);
        }
        Ok(WalkEntry::File(FileInfo::new(entry.file_name(), metadata.len())))
    }

    /// Blocking half of [`write_new()`](StorageBackend::write_new).
    fn write_new_blocking(root: &Path, target: &Path, data: &[u8]) -> Result<()> {
        let mut temporary = tempfile::Builder::new()
            .prefix(TEMPORARY_PREFIX)
            .tempfile_in(root)
            .map_err(|e| Self::map_io_error(e, root))?;
        temporary.write_all(data).map_err(ErrorKind::Io)?;
        temporary.as_file().sync_all().map_err(ErrorKind::Io)?;
        // On failure the PersistError still owns the temporary file, which
        // is removed when it's dropped.
        temporary
            .persist_noclobber(target)
            .map_err(|e| Self::map_io_error(e.error, target))?;
        #[cfg(unix)]
        std::fs::File::open(root)
            .and_then(|dir| dir.sync_all())
            .map_err(ErrorKind::Io)?;
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn root(&self) -> &Path {
        &self.root
    }

    fn absolute_path(&self, name: &Path) -> Result<PathBuf> {
        let validated = validate_name(name)?;
        Ok(self.root.join(validated))
    }

    fn list_stream(&self) -> FileInfoStream<'_> {
        Box::pin(stream! {
            let mut entries = match fs::read_dir(&self.root).await {
                Ok(entries) => Some(entries),
                Err(err) => {
                    yield Err(exn::Exn::from(Self::map_io_error(err, &self.root)));
                    None
                }
            };
            while let Some(entries) = entries.as_mut() {
                let entry = match entries.next_entry().await {
                    Ok(Some(entry)) => entry,
                    Ok(None) => break,
                    Err(e) => { yield Err(exn::Exn::from(Self::map_io_error(e, &self.root))); continue; },
                };
                match Self::process_entry(entry).await {
                    Ok(WalkEntry::File(f)) => yield Ok(f),
                    Ok(WalkEntry::Skip) => {},
                    Err(e) => yield Err(e),
                };
            }
        })
    }

    async fn read(&self, name: &Path) -> Result<Vec<u8>> {
        let abs_path = self.absolute_path(name)?;
        Ok(fs::read(&abs_path).await.map_err(|e| Self::map_io_error(e, &abs_path))?)
    }

    #[instrument(level = "debug", skip_all, fields(backend = %self.name, name = %name.display(), bytes = data.len()))]
    async fn write_new(&self, name: &Path, data: &[u8]) -> Result<PathBuf> {
        let target = self.absolute_path(name)?;
        let (root, destination, data) = (self.root.clone(), target.clone(), data.to_vec());
        let outcome = tokio::task::spawn_blocking(move || Self::write_new_blocking(&root, &destination, &data)).await;
        match outcome {
            Ok(result) => result?,
            Err(join_error) => exn::bail!(ErrorKind::Io(std::io::Error::other(join_error))),
        }
        tracing::debug!(path = %target.display(), "placed new file in cache directory");
        Ok(target)
    }

    async fn delete(&self, name: &Path) -> Result<()> {
        let abs_path = self.absolute_path(name)?;
        Ok(fs::remove_file(&abs_path).await.map_err(|e| Self::map_io_error(e, &abs_path))?)
    }
}
