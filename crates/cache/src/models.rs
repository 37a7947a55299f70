use crate::error::{Error, ErrorKind};
use apod_content::ContentDigest;
use derive_more::{Display, From, Into};
use exn::ResultExt;
use std::path::PathBuf;
use std::str::FromStr;

/// Identifier of a cache entry, assigned by the database on insertion.
///
/// Ids increase monotonically and are never reused.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, From, Into)]
pub struct EntryId(i64);
impl FromStr for EntryId {
    type Err = std::num::ParseIntError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<i64>().map(Self)
    }
}

/// One stored image and the metadata it was recorded with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub id: EntryId,
    /// Title as supplied by the remote source, unsanitized.
    pub title: String,
    pub explanation: String,
    /// Absolute path of the image file.
    pub file_path: PathBuf,
    pub sha256: ContentDigest,
}

#[derive(sqlx::FromRow)]
pub(crate) struct EntryRow {
    pub(crate) id: i64,
    pub(crate) title: String,
    pub(crate) explanation: String,
    pub(crate) file_path: String,
    pub(crate) sha256: String,
}
impl TryFrom<EntryRow> for CacheEntry {
    type Error = Error;
    fn try_from(row: EntryRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: EntryId(row.id),
            title: row.title,
            explanation: row.explanation,
            file_path: PathBuf::from(row.file_path),
            sha256: row.sha256.parse::<ContentDigest>().or_raise(|| ErrorKind::InvalidData("sha256"))?,
        })
    }
}
