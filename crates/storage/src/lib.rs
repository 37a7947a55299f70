//! The cache directory: where image files physically live.
//!
//! Every file in the cache directory sits directly under its root, so the
//! backend deals in single-component names rather than nested paths. New
//! files are only ever created through
//! [`write_new()`](StorageBackend::write_new), which never overwrites and
//! never exposes a partially written file under its final name.

pub mod backend;
pub mod error;
mod models;
mod path;

pub use crate::backend::{LocalBackend, StorageBackend, TEMPORARY_PREFIX, ensure_directory};
pub use crate::models::FileInfo;
pub use crate::path::validate as validate_name;
use std::sync::Arc;

pub type BackendHandle = Arc<dyn StorageBackend + Send + Sync>;
