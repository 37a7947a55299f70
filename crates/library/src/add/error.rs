//! Error types for the [`add`](super) module.

use derive_more::{Display, Error};

/// An add error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for add operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies the origin of an add failure.
///
/// ### Input Errors
/// - [`ErrorKind::InvalidTitle`]
/// - [`ErrorKind::InvalidUrl`]
///
/// ### Operational Errors
/// - [`ErrorKind::NameCollision`]
///
/// ### Dependency Errors
/// - [`ErrorKind::Storage`]
/// - [`ErrorKind::Cache`]
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Nothing of the title survives sanitizing, so there is no filename to
    /// store the image under.
    #[display("title cannot be turned into a filename")]
    InvalidTitle,
    /// The image URL carries no usable file extension.
    #[display("image URL has no usable file extension")]
    InvalidUrl,
    /// Both the sanitized filename and its digest-suffixed fallback are
    /// already taken by other files.
    #[display("irreconcilable filename collision: {_0}")]
    NameCollision(#[error(not(source))] String),
    /// A cache directory operation failed.
    #[display("cache directory operation failed")]
    Storage,
    /// A metadata store lookup or insert failed.
    #[display("metadata store operation failed")]
    Cache,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
