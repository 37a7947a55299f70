//! Content Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction. Callers further up the stack raise their own kinds on
//! top of these, so the full chain survives into the final report.

use derive_more::{Display, Error};

/// A content error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for content operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Sanitizing the title left nothing to build a filename from. The caller
    /// decides on a fallback name.
    #[display("title does not produce a usable filename: {_0:?}")]
    InvalidTitle(#[error(not(source))] String),
    /// The image URL has no file extension, or one with unsafe characters.
    #[display("image URL has no usable file extension: {_0}")]
    InvalidExtension(#[error(not(source))] String),
    /// A string is not a 64 character hexadecimal SHA-256 digest.
    #[display("invalid content digest: {_0:?}")]
    InvalidDigest(#[error(not(source))] String),
    /// A date is malformed, before the first APOD, or in the future.
    #[display("invalid APOD date: {_0}")]
    InvalidDate(#[error(not(source))] String),
    /// Media kind is neither `image` nor `video`.
    #[display("unknown media kind: {_0}")]
    UnknownMediaKind(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Everything in this crate is a pure function of its input.
        false
    }
}
