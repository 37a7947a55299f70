use crate::CacheHandle;
use crate::error::{ErrorKind, Result};
use apod_cache::{CacheEntry, EntryId};
use exn::ResultExt;

/// Fetch a cache entry by id; `None` if no entry has that id.
pub async fn get_by_id(handle: &CacheHandle, id: EntryId) -> Result<Option<CacheEntry>> {
    handle.repository().get_by_id(id).await.or_raise(|| ErrorKind::Lookup)
}

/// Titles of every cached image, in the order they were added.
pub async fn list_titles(handle: &CacheHandle) -> Result<Vec<String>> {
    handle.repository().list_titles().await.or_raise(|| ErrorKind::Lookup)
}
