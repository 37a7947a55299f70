use crate::add::error::{ErrorKind as AddErrorKind, Result as AddResult};
use apod_content::{CacheFilename, ContentDigest};
use apod_storage::BackendHandle;
use apod_storage::error::ErrorKind as StorageErrorKind;
use exn::ResultExt;
use std::ops::Deref;
use std::path::PathBuf;

/// Where a new image ended up in the cache directory.
#[derive(Debug)]
pub(crate) struct Placement {
    /// Name relative to the cache directory.
    pub(crate) name: PathBuf,
    /// Absolute path, as recorded in the metadata store.
    pub(crate) path: PathBuf,
}

/// Writes `bytes` under `filename`, or, if that name is taken, under
/// `filename` suffixed with the short form of `digest`.
///
/// Two different images with the same title sanitize to the same filename.
/// Suffixing the digest keeps both, and since the suffix is derived from the
/// content, the fallback name for a given image is always the same. Only if
/// the fallback is taken as well does this give up with
/// [`NameCollision`](AddErrorKind::NameCollision).
pub(crate) async fn place(
    backend: &BackendHandle,
    filename: &CacheFilename,
    digest: &ContentDigest,
    bytes: &[u8],
) -> AddResult<Placement> {
    let preferred = PathBuf::from(filename);
    match backend.write_new(&preferred, bytes).await {
        Ok(path) => return Ok(Placement { name: preferred, path }),
        Err(e) if matches!(e.deref(), StorageErrorKind::AlreadyExists(_)) => {
            tracing::info!(name = %filename, sha256 = %digest, "filename taken, retrying with digest suffix");
        },
        Err(e) => return Err(e).or_raise(|| AddErrorKind::Storage),
    }

    let suffixed = fallback_name(filename, digest);
    let fallback = PathBuf::from(&suffixed);
    match backend.write_new(&fallback, bytes).await {
        Ok(path) => Ok(Placement { name: fallback, path }),
        Err(e) if matches!(e.deref(), StorageErrorKind::AlreadyExists(_)) => {
            Err(e).or_raise(|| AddErrorKind::NameCollision(suffixed.to_string()))
        },
        Err(e) => Err(e).or_raise(|| AddErrorKind::Storage),
    }
}

/// The name an image is stored under when its sanitized filename is taken.
pub(crate) fn fallback_name(filename: &CacheFilename, digest: &ContentDigest) -> CacheFilename {
    filename.with_suffix(digest.short())
}

/// Whether the fallback name for `digest` is (or just was) held by a
/// concurrent writer of the same bytes.
///
/// A file that vanished since the collision was most likely discarded by a
/// writer that lost the race to record it, which also counts.
pub(crate) async fn held_by_same_content(
    backend: &BackendHandle,
    filename: &CacheFilename,
    digest: &ContentDigest,
) -> bool {
    let name = PathBuf::from(&fallback_name(filename, digest));
    match backend.read(&name).await {
        Ok(existing) => apod_content::digest(&existing) == *digest,
        Err(e) => matches!(e.deref(), StorageErrorKind::NotFound(_)),
    }
}
