//! Name validation for files in the cache directory.
//!
//! The cache directory is flat: every stored file sits directly under the
//! root. A name is therefore exactly one normal path component, and anything
//! that could address a different location is rejected.

use std::path::{Component, Path, PathBuf};

use crate::error::{ErrorKind, Result};

/// Validates a file name inside the cache directory.
///
/// Accepts exactly one [`Normal`](Component::Normal) component. Separators,
/// `..`, absolute paths and null bytes are all rejected. A leading `./` or a
/// trailing slash is tolerated since [`Path::components`] normalizes them away.
///
/// # Returns
/// Returns the normalized name if valid, or
/// [`InvalidPath`](crate::error::ErrorKind::InvalidPath) if invalid.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use apod_storage::validate_name;
/// // Valid names
/// assert!(validate_name("Galaxy_in_a_Bubble.jpg").is_ok());
/// assert_eq!(validate_name("./Moon.png").unwrap(), Path::new("Moon.png"));
/// // Invalid names
/// assert!(validate_name("sub/dir.jpg").is_err());
/// assert!(validate_name("../escape.jpg").is_err());
/// assert!(validate_name("/etc/passwd").is_err());
/// assert!(validate_name("a\0b").is_err());
/// ```
pub fn validate(name: impl AsRef<Path>) -> Result<PathBuf> {
    let name = name.as_ref();
    let mut normal = None;
    for component in name.components() {
        match component {
            Component::CurDir => {},
            // Null bytes pass through Path::components() on Unix but cause
            // truncation in C-based syscalls.
            Component::Normal(s) if normal.is_none() && !s.as_encoded_bytes().contains(&0) => normal = Some(s),
            _ => exn::bail!(ErrorKind::InvalidPath(name.to_path_buf())),
        }
    }
    match normal {
        Some(s) => Ok(PathBuf::from(s)),
        None => exn::bail!(ErrorKind::InvalidPath(name.to_path_buf())),
    }
}
