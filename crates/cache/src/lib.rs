//! SQLite metadata store for the image cache.
//!
//! Every distinct image in the cache directory has exactly one row here,
//! keyed by its SHA-256 content digest. The `UNIQUE` constraint on the digest
//! column is the single point of synchronization between writers: whoever
//! inserts first wins, and everyone else gets
//! [`DuplicateDigest`](error::ErrorKind::DuplicateDigest) and can look up the
//! winner's id.
//!
//! Rows are only ever inserted. Nothing in this crate updates or deletes an
//! entry, so an [`EntryId`] stays valid for the lifetime of the cache.

mod db;
pub mod error;
mod models;
mod repo;

pub use crate::db::{DEFAULT_DATABASE_FILE, Database};
pub use crate::models::{CacheEntry, EntryId};
pub use crate::repo::Repository;
