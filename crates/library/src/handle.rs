use crate::error::{ErrorKind, Result};
use apod_cache::{Database, Repository};
use apod_storage::{BackendHandle, LocalBackend, StorageBackend, validate_name};
use exn::ResultExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::instrument;

/// An opened image cache: the directory images are stored in, plus the
/// metadata store that indexes them.
///
/// Cloning is cheap and every clone refers to the same cache.
#[derive(Clone)]
pub struct CacheHandle {
    backend: BackendHandle,
    database: Database,
    repository: Repository,
}
impl CacheHandle {
    /// Open the cache in `directory`, creating the directory and the
    /// metadata store (`database_file`, inside the directory) as needed.
    ///
    /// Safe to call on an already initialized cache; existing entries are
    /// left untouched.
    ///
    /// ```no_run
    /// # async fn example() -> apod_library::error::Result<()> {
    /// let handle = apod_library::CacheHandle::initialize("/var/cache/apod/images", "image_cache.db").await?;
    /// println!("{} images cached", apod_library::list_titles(&handle).await?.len());
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(skip_all, fields(directory = %directory.as_ref().display()))]
    pub async fn initialize(directory: impl AsRef<Path>, database_file: impl AsRef<str>) -> Result<Self> {
        let database_file = database_file.as_ref();
        validate_name(database_file).or_raise(|| ErrorKind::Initialize)?;
        let backend = LocalBackend::new("images", directory).or_raise(|| ErrorKind::Initialize)?;
        let database = Database::initialize(backend.root(), database_file)
            .await
            .or_raise(|| ErrorKind::Initialize)?;
        tracing::info!(directory = %backend.root().display(), database = %database_file, "image cache ready");
        Ok(Self::new(Arc::new(backend), database))
    }

    /// Assemble a handle from an already opened backend and database.
    pub fn new(backend: BackendHandle, database: Database) -> Self {
        let repository = Repository::from(&database);
        Self { backend, database, repository }
    }

    /// Absolute path of the cache directory.
    pub fn directory(&self) -> &Path {
        self.backend.root()
    }

    /// Location of the metadata store, if it's backed by a file.
    pub fn database_path(&self) -> Option<PathBuf> {
        self.database.path().map(Path::to_path_buf)
    }

    pub fn backend(&self) -> &BackendHandle {
        &self.backend
    }

    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    /// Close the metadata store. The handle (and its clones) must not be used
    /// afterwards.
    pub async fn close(&self) {
        self.database.close().await;
    }
}
