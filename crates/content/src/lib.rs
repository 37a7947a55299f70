//! Content primitives for the APOD image cache.
//!
//! Everything in this crate is pure: no I/O, no database, no filesystem.
//!
//! - [`digest`] turns raw image bytes into a [`ContentDigest`] (SHA-256, 64
//!   lowercase hex characters). The digest is both the deduplication key and
//!   the integrity check for stored files.
//! - [`sanitize`] turns an APOD title and an image extension into a
//!   deterministic, filesystem-safe [`CacheFilename`].
//! - [`models`] describes what the remote APOD source hands over: the
//!   [`ApodMetadata`](models::ApodMetadata) for a validated
//!   [`ApodDate`](models::ApodDate).

pub mod digest;
pub mod error;
pub mod models;
mod sanitize;

pub use crate::digest::{ContentDigest, digest};
pub use crate::sanitize::{CacheFilename, extension_of, sanitize};
