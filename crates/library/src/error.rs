//! Library Error Types
//!
//! Each public operation raises one of these on top of its own, more
//! specific error tree (see [`add::error`](crate::add::error)).

use derive_more::{Display, Error};

/// A library error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The cache directory or metadata store could not be opened.
    #[display("could not initialize image cache")]
    Initialize,
    /// Nothing of the title survives sanitizing. Callers that want the
    /// image anyway can retry with a title of their own.
    #[display("title cannot be used as a cache filename")]
    InvalidTitle,
    /// An image could not be added to the cache.
    #[display("could not add image to cache")]
    Add,
    /// Reading from the metadata store failed.
    #[display("could not look up cache entries")]
    Lookup,
    /// The consistency check could not run to completion.
    #[display("could not verify image cache")]
    Verify,
    /// The remote source could not provide metadata or image bytes.
    #[display("could not fetch APOD from remote source")]
    Fetch,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Fetch)
    }
}
