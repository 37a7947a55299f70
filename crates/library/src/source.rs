//! The remote side: whoever knows what the picture of the day is and can
//! hand over its bytes.
//!
//! This crate doesn't speak HTTP. Callers plug in their own [`ApodSource`]
//! (an API client, a local mirror, a test double) and
//! [`fetch_and_cache()`] takes care of the rest.

use crate::CacheHandle;
use crate::add::{Addition, add_or_get};
use crate::error::{ErrorKind as LibraryErrorKind, Result as LibraryResult};
use apod_content::models::{ApodDate, ApodMetadata};
use async_trait::async_trait;
use derive_more::{Display, Error};
use exn::ResultExt;
use tracing::instrument;

/// A source error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for source operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// There is no picture for this date (yet).
    #[display("no APOD published for {_0}")]
    NotPublished(#[error(not(source))] ApodDate),
    /// The source could not be reached or gave an unusable answer.
    #[display("remote source failed: {_0}")]
    Remote(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Remote(_))
    }
}

/// Supplies APOD metadata and image bytes.
///
/// For video entries, implementations are expected to put the URL of the
/// video's thumbnail in [`ApodMetadata::image_url`]; whatever bytes
/// [`image()`](Self::image) returns for it are cached like any other image.
#[async_trait]
pub trait ApodSource: Send + Sync {
    /// Metadata of the picture published on `date`.
    async fn metadata(&self, date: ApodDate) -> Result<ApodMetadata>;

    /// Raw bytes behind `url`, exactly as served.
    async fn image(&self, url: &str) -> Result<Vec<u8>>;
}

/// Fetch the picture for `date` from `source` and cache it.
///
/// The bytes are always fetched: identity is the content digest, which isn't
/// known until the image has been downloaded.
#[instrument(skip_all, fields(date = %date))]
pub async fn fetch_and_cache<S>(handle: &CacheHandle, source: &S, date: ApodDate) -> LibraryResult<Addition>
where
    S: ApodSource + ?Sized,
{
    let metadata = source.metadata(date).await.or_raise(|| LibraryErrorKind::Fetch)?;
    let bytes = source.image(&metadata.image_url).await.or_raise(|| LibraryErrorKind::Fetch)?;
    tracing::debug!(title = %metadata.title, url = %metadata.image_url, bytes = bytes.len(), "fetched APOD");
    add_or_get(handle, &metadata, bytes).await
}
