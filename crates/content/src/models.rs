//! What the remote APOD source hands over to the cache.

use crate::error::{Error, ErrorKind, Result};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use time::macros::{date, format_description};
use time::{Date, OffsetDateTime};

/// The kind of media an APOD entry refers to.
///
/// The cache itself treats every payload the same way; for videos the remote
/// source is expected to hand over the bytes of the video's thumbnail.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum MediaKind {
    #[default]
    Image,
    Video,
}
impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
        }
    }
}
impl FromStr for MediaKind {
    type Err = Error;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "image" => Self::Image,
            "video" => Self::Video,
            _ => exn::bail!(ErrorKind::UnknownMediaKind(s.to_string())),
        })
    }
}
impl Display for MediaKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// A date for which an APOD can exist.
///
/// The archive starts on 1995-06-16 and there is no picture for a day that
/// hasn't happened yet (in UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ApodDate(Date);
impl ApodDate {
    /// The date of the very first Astronomy Picture of the Day.
    pub const FIRST: Date = date!(1995 - 06 - 16);

    /// Validates `date` against the archive range, using the current UTC date
    /// as the upper bound.
    pub fn new(date: Date) -> Result<Self> {
        Self::new_relative_to(date, OffsetDateTime::now_utc().date())
    }

    /// Validates `date` against the archive range ending at `today`.
    pub fn new_relative_to(date: Date, today: Date) -> Result<Self> {
        if date < Self::FIRST {
            exn::bail!(ErrorKind::InvalidDate(format!("{} is before the first APOD ({})", Self(date), Self(Self::FIRST))));
        }
        if date > today {
            exn::bail!(ErrorKind::InvalidDate(format!("{} is in the future", Self(date))));
        }
        Ok(Self(date))
    }

    /// Today's date in UTC, which is always a valid APOD date.
    pub fn today() -> Self {
        Self(OffsetDateTime::now_utc().date())
    }

    pub fn date(&self) -> Date {
        self.0
    }
}
impl FromStr for ApodDate {
    type Err = Error;
    /// Parses a `YYYY-MM-DD` date and validates it.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let date = match Date::parse(s.trim(), format_description!("[year]-[month]-[day]")) {
            Ok(date) => date,
            Err(_) => exn::bail!(ErrorKind::InvalidDate(format!("{s:?} is not formatted as YYYY-MM-DD"))),
        };
        Self::new(date)
    }
}
impl Display for ApodDate {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{:04}-{:02}-{:02}", self.0.year(), u8::from(self.0.month()), self.0.day())
    }
}

/// Metadata for one APOD, as supplied by the remote source.
///
/// `image_url` points at the bytes that will be cached: the HD image for
/// photos, or the thumbnail for videos. Choosing between them is the
/// source's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApodMetadata {
    pub date: ApodDate,
    pub title: String,
    pub explanation: String,
    pub image_url: String,
    pub media_kind: MediaKind,
}
