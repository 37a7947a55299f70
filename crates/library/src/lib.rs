//! Cache orchestration: turns "here are the bytes of today's picture" into a
//! durable, deduplicated cache entry.
//!
//! Everything goes through an explicit [`CacheHandle`], which ties together
//! the cache directory ([`apod_storage`]) and the metadata store
//! ([`apod_cache`]). There is no global state, so any number of handles for
//! different directories can coexist in one process.

pub mod add;
pub mod error;
mod handle;
mod lookup;
pub mod source;
pub mod verify;

pub use crate::add::{Addition, add_or_get};
pub use crate::handle::CacheHandle;
pub use crate::lookup::{get_by_id, list_titles};
pub use crate::source::{ApodSource, fetch_and_cache};
pub use crate::verify::{Report, verify};
pub use apod_cache::{CacheEntry, EntryId};
