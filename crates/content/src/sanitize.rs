//! Deterministic, filesystem-safe filenames from APOD titles.
//!
//! The rules are fixed so that the same title always lands at the same name:
//!
//! 1. leading and trailing whitespace is stripped,
//! 2. every interior whitespace run becomes a single `_`,
//! 3. anything that isn't `[A-Za-z0-9_]` is deleted (not replaced).
//!
//! Punctuation is removed *after* whitespace has been collapsed, so
//! `"NGC #3521: Galaxy"` becomes `"NGC_3521_Galaxy"`.

use crate::error::{ErrorKind, Result};
use regex::Regex;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::PathBuf;
use std::sync::LazyLock;
use tracing::instrument;

static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static DISALLOWED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_]").unwrap());

/// A sanitized `{stem}.{extension}` filename for the cache directory.
///
/// Always a single path component: the stem only ever contains
/// `[A-Za-z0-9_]` and the extension only `[A-Za-z0-9]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheFilename {
    stem: String,
    extension: String,
}
impl CacheFilename {
    pub fn stem(&self) -> &str {
        &self.stem
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Appends `_{suffix}` to the stem, keeping the extension.
    ///
    /// ```
    /// let name = apod_content::sanitize("Bubble", "jpg").unwrap();
    /// assert_eq!(name.with_suffix("ba7816bf").to_string(), "Bubble_ba7816bf.jpg");
    /// ```
    pub fn with_suffix(&self, suffix: impl AsRef<str>) -> Self {
        Self {
            stem: format!("{}_{}", self.stem, suffix.as_ref()),
            extension: self.extension.clone(),
        }
    }
}
impl Display for CacheFilename {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}.{}", self.stem, self.extension)
    }
}
impl From<&CacheFilename> for PathBuf {
    fn from(name: &CacheFilename) -> Self {
        PathBuf::from(name.to_string())
    }
}

/// Derives the cache filename for an image from its title and extension.
///
/// Fails with [`ErrorKind::InvalidTitle`] if nothing of the title survives
/// sanitizing, and with [`ErrorKind::InvalidExtension`] if the extension is
/// empty or contains anything other than ASCII letters and digits.
///
/// ```
/// let name = apod_content::sanitize(" NGC #3521: Galaxy in a Bubble ", "jpg").unwrap();
/// assert_eq!(name.to_string(), "NGC_3521_Galaxy_in_a_Bubble.jpg");
/// ```
#[instrument(level = "trace")]
pub fn sanitize(title: &str, extension: &str) -> Result<CacheFilename> {
    let collapsed = WHITESPACE_RUN.replace_all(title.trim(), "_");
    let stem = DISALLOWED.replace_all(&collapsed, "").into_owned();
    if stem.is_empty() {
        exn::bail!(ErrorKind::InvalidTitle(title.to_string()));
    }
    if !is_valid_extension(extension) {
        exn::bail!(ErrorKind::InvalidExtension(extension.to_string()));
    }
    Ok(CacheFilename {
        stem,
        extension: extension.to_string(),
    })
}

/// Extracts the file extension from an image URL, verbatim.
///
/// Takes the final segment of the URL path (query string and fragment are
/// ignored) and returns whatever follows its last `.`. Case is preserved.
///
/// ```
/// let url = "https://apod.nasa.gov/apod/image/2205/NGC3521LRGBHaAPOD-20.jpg";
/// assert_eq!(apod_content::extension_of(url).unwrap(), "jpg");
/// ```
pub fn extension_of(image_url: &str) -> Result<String> {
    let path = match image_url.split_once("://") {
        // Everything before the first slash after the scheme is the host.
        Some((_, rest)) => rest.split_once('/').map_or("", |(_, path)| path),
        None => image_url,
    };
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let segment = path.rsplit('/').next().unwrap_or_default();
    match segment.rsplit_once('.') {
        // A leading dot (".jpg") is a hidden file without an extension.
        Some((stem, extension)) if !stem.is_empty() && is_valid_extension(extension) => Ok(extension.to_string()),
        _ => exn::bail!(ErrorKind::InvalidExtension(image_url.to_string())),
    }
}

fn is_valid_extension(extension: &str) -> bool {
    !extension.is_empty() && extension.chars().all(|c| c.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(" NGC #3521: Galaxy in a Bubble ", "jpg", "NGC_3521_Galaxy_in_a_Bubble.jpg")]
    #[case("Mayan Milky Way", "jpg", "Mayan_Milky_Way.jpg")]
    #[case("Tabs\tand\n\nnewlines", "png", "Tabs_and_newlines.png")]
    #[case("Already_Underscored", "gif", "Already_Underscored.gif")]
    #[case("M1: The Crab Nebula", "JPG", "M1_The_Crab_Nebula.JPG")]
    #[case("Comet C/2022 E3 (ZTF)", "jpeg", "Comet_C2022_E3_ZTF.jpeg")]
    fn test_sanitize(#[case] title: &str, #[case] extension: &str, #[case] expected: &str) {
        assert_eq!(sanitize(title, extension).unwrap().to_string(), expected);
    }

    #[test]
    fn test_sanitize_punctuation_between_words_leaves_both_separators() {
        // The whitespace around " - " collapses first, the dash is removed after.
        assert_eq!(sanitize("Moon - Rise", "jpg").unwrap().to_string(), "Moon__Rise.jpg");
    }

    #[test]
    fn test_sanitize_non_ascii_letters_are_removed() {
        assert_eq!(sanitize("Ōmura's Comet", "jpg").unwrap().stem(), "muras_Comet");
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case(" ?!: ")]
    #[case("★★★")]
    fn test_sanitize_empty_stem(#[case] title: &str) {
        let err = sanitize(title, "jpg").unwrap_err();
        assert_eq!(*err, ErrorKind::InvalidTitle(title.to_string()));
    }

    #[rstest]
    #[case("")]
    #[case("jp g")]
    #[case("../jpg")]
    fn test_sanitize_invalid_extension(#[case] extension: &str) {
        let err = sanitize("Title", extension).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidExtension(_)));
    }

    #[test]
    fn test_with_suffix() {
        let name = sanitize("Galaxy", "png").unwrap().with_suffix("0123abcd");
        assert_eq!(name.stem(), "Galaxy_0123abcd");
        assert_eq!(name.extension(), "png");
        assert_eq!(PathBuf::from(&name), PathBuf::from("Galaxy_0123abcd.png"));
    }

    #[rstest]
    #[case("https://apod.nasa.gov/apod/image/2205/NGC3521LRGBHaAPOD-20.jpg", "jpg")]
    #[case("https://apod.nasa.gov/apod/image/2303/MayanMilkyWay_Fernandez_1600.jpg", "jpg")]
    #[case("https://img.youtube.com/vi/abc/0.JPG?size=large#top", "JPG")]
    #[case("https://example.com/archive.tar.gz", "gz")]
    #[case("image/local.png", "png")]
    fn test_extension_of(#[case] url: &str, #[case] expected: &str) {
        assert_eq!(extension_of(url).unwrap(), expected);
    }

    #[rstest]
    #[case("https://example.com")]
    #[case("https://example.com/")]
    #[case("https://example.com/image")]
    #[case("https://example.com/.jpg")]
    #[case("https://example.com/image.")]
    #[case("https://example.com/dir.v2/image")]
    #[case("https://example.com/embed?file=a.jpg")]
    fn test_extension_of_invalid(#[case] url: &str) {
        let err = extension_of(url).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidExtension(_)));
    }
}
