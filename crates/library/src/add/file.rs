use crate::CacheHandle;
use crate::add::collision::{held_by_same_content, place};
use crate::add::error::{ErrorKind as AddErrorKind, Result as AddResult};
use crate::error::{ErrorKind as LibraryErrorKind, Result as LibraryResult};
use apod_cache::EntryId;
use apod_cache::error::ErrorKind as CacheErrorKind;
use apod_content::models::ApodMetadata;
use apod_content::{CacheFilename, ContentDigest, digest, extension_of, sanitize};
use apod_storage::BackendHandle;
use derive_more::Display;
use exn::{OptionExt, ResultExt};
use std::ops::Deref;
use std::path::Path;
use std::time::Duration;
use tracing::instrument;

/// How long to wait for a concurrent writer of the same image to record it
/// before treating a name collision as irreconcilable. Doubles per attempt.
const RECORD_POLL_START: Duration = Duration::from_millis(5);
const RECORD_POLL_ATTEMPTS: u32 = 10;

/// The outcome of (successfully) adding an image.
///
/// Either way the caller gets the id of the one entry that holds these bytes.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Addition {
    /// The bytes were new: a file was written and an entry recorded.
    #[display("stored as {_0}")]
    Stored(EntryId),
    /// Identical bytes were already cached under this id; nothing was written.
    #[display("already cached as {_0}")]
    AlreadyCached(EntryId),
}
impl Addition {
    pub fn id(&self) -> EntryId {
        match self {
            Self::Stored(id) | Self::AlreadyCached(id) => *id,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, Self::Stored(_))
    }
}

/// Cache the raw bytes of an APOD image, unless identical bytes are already
/// cached.
///
/// The image is identified by the SHA-256 digest of `bytes`, so the same
/// picture published on two dates, or under two titles, is stored once. New
/// images are written to `{sanitized title}.{extension of the image URL}` in
/// the cache directory; if a different image already occupies that name, the
/// first eight hex digits of the digest are appended to the stem.
///
/// - **[`Addition::AlreadyCached`]**: the digest is known (possibly because a
///   concurrent writer recorded it first). No file is left behind.
/// - **[`Addition::Stored`]**: the file was written and the entry recorded.
///
/// # Errors
/// Returns [`Exn<LibraryErrorKind::InvalidTitle>`](LibraryErrorKind::InvalidTitle)
/// if the title sanitizes to nothing, and
/// [`Exn<LibraryErrorKind::Add>`](LibraryErrorKind::Add) for everything else,
/// both raised from an inner [`Exn<AddErrorKind>`](AddErrorKind). On failure
/// no file written by this call remains in the cache directory.
pub async fn add_or_get(
    handle: &CacheHandle,
    metadata: &ApodMetadata,
    bytes: impl AsRef<[u8]>,
) -> LibraryResult<Addition> {
    match add_or_get_inner(handle, metadata, bytes.as_ref()).await {
        Ok(addition) => Ok(addition),
        Err(e) if matches!(e.deref(), AddErrorKind::InvalidTitle) => Err(e).or_raise(|| LibraryErrorKind::InvalidTitle),
        Err(e) => Err(e).or_raise(|| LibraryErrorKind::Add),
    }
}

#[instrument(skip_all, fields(date = %metadata.date, title = %metadata.title, media = %metadata.media_kind))]
pub(crate) async fn add_or_get_inner(
    handle: &CacheHandle,
    metadata: &ApodMetadata,
    bytes: &[u8],
) -> AddResult<Addition> {
    let digest = digest(bytes);
    if let Some(id) = handle.repository().find_by_digest(&digest).await.or_raise(|| AddErrorKind::Cache)? {
        tracing::debug!(%id, sha256 = %digest, "content already cached");
        return Ok(Addition::AlreadyCached(id));
    }
    let extension = extension_of(&metadata.image_url).or_raise(|| AddErrorKind::InvalidUrl)?;
    let filename = sanitize(&metadata.title, &extension).or_raise(|| AddErrorKind::InvalidTitle)?;
    store_new(handle, metadata, &filename, &digest, bytes).await
}

/// Writes the file and records it, assuming the digest wasn't known a moment
/// ago. Another writer may have recorded it since; that race is resolved here.
pub(crate) async fn store_new(
    handle: &CacheHandle,
    metadata: &ApodMetadata,
    filename: &CacheFilename,
    digest: &ContentDigest,
    bytes: &[u8],
) -> AddResult<Addition> {
    let placement = match place(handle.backend(), filename, digest, bytes).await {
        Ok(placement) => placement,
        Err(e) if matches!(e.deref(), AddErrorKind::NameCollision(_)) => {
            // Identical bytes under the digest-suffixed name mean a concurrent
            // writer got there first; its record shows up once it's done.
            if held_by_same_content(handle.backend(), filename, digest).await
                && let Some(id) = await_record(handle, digest).await?
            {
                tracing::info!(%id, sha256 = %digest, "concurrent writer stored the same content, using its entry");
                return Ok(Addition::AlreadyCached(id));
            }
            return Err(e);
        },
        Err(e) => return Err(e),
    };
    let inserted = handle
        .repository()
        .insert(&metadata.title, &metadata.explanation, &placement.path, digest)
        .await;
    match inserted {
        Ok(id) => {
            tracing::info!(%id, path = %placement.path.display(), sha256 = %digest, "stored new image");
            Ok(Addition::Stored(id))
        },
        Err(e) if matches!(e.deref(), CacheErrorKind::DuplicateDigest(_)) => {
            // A concurrent writer recorded the same content first; theirs stands.
            discard(handle.backend(), &placement.name).await;
            let id = handle
                .repository()
                .find_by_digest(digest)
                .await
                .or_raise(|| AddErrorKind::Cache)?
                .ok_or_raise(|| AddErrorKind::Cache)?;
            tracing::info!(%id, sha256 = %digest, "lost race to concurrent writer, using existing entry");
            Ok(Addition::AlreadyCached(id))
        },
        Err(e) => {
            discard(handle.backend(), &placement.name).await;
            Err(e).or_raise(|| AddErrorKind::Cache)
        },
    }
}

/// Polls the metadata store for `digest`, backing off between attempts.
async fn await_record(handle: &CacheHandle, digest: &ContentDigest) -> AddResult<Option<EntryId>> {
    let mut delay = RECORD_POLL_START;
    for attempt in 0..=RECORD_POLL_ATTEMPTS {
        if attempt > 0 {
            tokio::time::sleep(delay).await;
            delay *= 2;
        }
        let found = handle.repository().find_by_digest(digest).await.or_raise(|| AddErrorKind::Cache)?;
        if found.is_some() {
            return Ok(found);
        }
    }
    Ok(None)
}

/// Best-effort removal of a file that never got (or never will get) a record.
/// A failure leaves an orphan that [`verify()`](crate::verify) reports.
async fn discard(backend: &BackendHandle, name: &Path) {
    if let Err(e) = backend.delete(name).await {
        tracing::warn!(name = %name.display(), error = ?e, "could not remove unrecorded file");
    }
}
