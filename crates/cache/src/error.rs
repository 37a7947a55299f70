//! Cache Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};

/// A cache error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("database error")]
    Database,
    #[display("database migration error")]
    Migration,
    /// An entry with this digest is already recorded. Look it up with
    /// [`find_by_digest()`](crate::Repository::find_by_digest) instead.
    #[display("content digest already recorded: {_0}")]
    DuplicateDigest(#[error(not(source))] String),
    /// A value can't be written to, or read back from, the database.
    #[display("invalid cache data: {_0}")]
    InvalidData(#[error(not(source))] &'static str),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // SQLITE_BUSY past the busy timeout is the only transient failure,
        // and it surfaces as a generic database error.
        matches!(self, Self::Database)
    }
}
