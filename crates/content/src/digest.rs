//! SHA-256 content digests.

use crate::error::{Error, ErrorKind, Result};
use sha2::{Digest, Sha256};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Number of hex characters in a rendered SHA-256 digest.
pub const DIGEST_LENGTH: usize = 64;
/// Number of hex characters used to disambiguate colliding filenames.
pub const SHORT_LENGTH: usize = 8;

/// A SHA-256 digest of raw content, stored as 64 lowercase hex characters.
///
/// Identical byte sequences always produce identical digests, so this is the
/// identity of an image for deduplication purposes. It is also used to check
/// that a stored file still holds the bytes it was recorded with.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentDigest(String);

/// Hash raw bytes into a [`ContentDigest`].
///
/// ```
/// let digest = apod_content::digest(b"abc");
/// assert_eq!(
///     digest.as_str(),
///     "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
/// );
/// ```
pub fn digest(bytes: impl AsRef<[u8]>) -> ContentDigest {
    ContentDigest(format!("{:x}", Sha256::digest(bytes.as_ref())))
}

impl ContentDigest {
    /// The first [`SHORT_LENGTH`] hex characters, used as a filename suffix
    /// when two different images sanitize to the same name.
    pub fn short(&self) -> &str {
        &self.0[..SHORT_LENGTH]
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl FromStr for ContentDigest {
    type Err = Error;

    /// Parses a previously rendered digest. Uppercase hex is accepted and
    /// normalized to lowercase.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.len() != DIGEST_LENGTH || !s.chars().all(|c| c.is_ascii_hexdigit()) {
            exn::bail!(ErrorKind::InvalidDigest(s.to_string()));
        }
        Ok(Self(s.to_ascii_lowercase()))
    }
}
impl TryFrom<String> for ContentDigest {
    type Error = Error;
    fn try_from(value: String) -> Result<Self> {
        value.as_str().parse()
    }
}

impl Display for ContentDigest {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ContentDigest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
