//! Consistency check between the metadata store and the cache directory.
//!
//! Only ever reports; nothing is repaired, moved or deleted.

use crate::CacheHandle;
use crate::error::{ErrorKind, Result};
use apod_cache::CacheEntry;
use apod_storage::TEMPORARY_PREFIX;
use apod_storage::error::ErrorKind as StorageErrorKind;
use exn::ResultExt;
use std::collections::HashSet;
use std::ffi::OsString;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Suffixes SQLite appends to the database file name for its side files.
const DATABASE_SIDE_FILES: [&str; 3] = ["-wal", "-shm", "-journal"];

/// Everything [`verify()`] found wrong with a cache.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Report {
    /// Number of entries that were checked.
    pub entries: u64,
    /// Entries whose file is gone.
    pub missing: Vec<CacheEntry>,
    /// Entries whose file no longer hashes to the recorded digest.
    pub corrupted: Vec<CacheEntry>,
    /// Files in the cache directory that no entry refers to, sorted by name.
    pub orphans: Vec<PathBuf>,
    /// Leftovers of interrupted writes, sorted by name.
    pub stale_temporaries: Vec<PathBuf>,
    /// Disk space taken up by orphans and stale temporaries.
    pub unreferenced_bytes: u64,
}
impl Report {
    /// `true` when every entry has its intact file and every file has an
    /// entry.
    pub fn is_consistent(&self) -> bool {
        self.missing.is_empty()
            && self.corrupted.is_empty()
            && self.orphans.is_empty()
            && self.stale_temporaries.is_empty()
    }
}

/// Check every entry against its file, and every file against the entries.
///
/// Reads (and hashes) every cached image, so this is proportional to the
/// size of the cache.
#[instrument(skip_all, fields(directory = %handle.directory().display()))]
pub async fn verify(handle: &CacheHandle) -> Result<Report> {
    let backend = handle.backend();
    let entries = handle.repository().list_entries().await.or_raise(|| ErrorKind::Verify)?;
    let mut report = Report {
        entries: entries.len() as u64,
        ..Report::default()
    };

    let mut referenced = HashSet::new();
    for entry in entries {
        // Anything recorded outside the cache directory can't be there anymore.
        let Some(name) = name_within(handle.directory(), &entry.file_path) else {
            tracing::warn!(id = %entry.id, path = %entry.file_path.display(), "entry points outside cache directory");
            report.missing.push(entry);
            continue;
        };
        referenced.insert(name.clone());
        match backend.read(&name).await {
            Ok(bytes) if apod_content::digest(&bytes) == entry.sha256 => {},
            Ok(_) => {
                tracing::warn!(id = %entry.id, path = %entry.file_path.display(), "file content does not match digest");
                report.corrupted.push(entry);
            },
            Err(e) if matches!(e.deref(), StorageErrorKind::NotFound(_)) => {
                tracing::warn!(id = %entry.id, path = %entry.file_path.display(), "file is missing");
                report.missing.push(entry);
            },
            Err(e) => return Err(e).or_raise(|| ErrorKind::Verify),
        }
    }

    let ignored = database_files(handle.database_path().as_deref());
    for file in backend.list().await.or_raise(|| ErrorKind::Verify)? {
        let name = file.path.as_os_str();
        if ignored.iter().any(|ignored| ignored == name) || referenced.contains(&file.path) {
            continue;
        }
        report.unreferenced_bytes += file.size;
        if name.as_encoded_bytes().starts_with(TEMPORARY_PREFIX.as_bytes()) {
            report.stale_temporaries.push(file.path);
        } else {
            tracing::warn!(name = %file.path.display(), "file is not referenced by any entry");
            report.orphans.push(file.path);
        }
    }
    report.orphans.sort();
    report.stale_temporaries.sort();
    tracing::info!(
        entries = report.entries,
        missing = report.missing.len(),
        corrupted = report.corrupted.len(),
        orphans = report.orphans.len(),
        stale_temporaries = report.stale_temporaries.len(),
        unreferenced_bytes = report.unreferenced_bytes,
        "verified image cache"
    );
    Ok(report)
}

/// The name of `path` relative to `directory`, if it sits directly inside it.
fn name_within(directory: &Path, path: &Path) -> Option<PathBuf> {
    match path.parent() {
        Some(parent) if parent == directory => path.file_name().map(PathBuf::from),
        _ => None,
    }
}

/// The metadata store's own files, which live in the cache directory too.
fn database_files(database: Option<&Path>) -> Vec<OsString> {
    let Some(file_name) = database.and_then(Path::file_name) else {
        return Vec::new();
    };
    let mut names = vec![file_name.to_os_string()];
    for suffix in DATABASE_SIDE_FILES {
        let mut name = file_name.to_os_string();
        name.push(suffix);
        names.push(name);
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use apod_content::models::{ApodDate, ApodMetadata, MediaKind};

    async fn handle() -> (tempfile::TempDir, CacheHandle) {
        let temp_dir = tempfile::tempdir().unwrap();
        let handle = CacheHandle::initialize(temp_dir.path(), "image_cache.db").await.unwrap();
        (temp_dir, handle)
    }

    fn metadata(title: &str) -> ApodMetadata {
        ApodMetadata {
            date: "2023-03-01".parse::<ApodDate>().unwrap(),
            title: title.to_string(),
            explanation: String::new(),
            image_url: format!("https://apod.nasa.gov/apod/image/2303/{title}.jpg"),
            media_kind: MediaKind::Image,
        }
    }

    #[test]
    fn test_database_files() {
        let names = database_files(Some(Path::new("/cache/image_cache.db")));
        assert_eq!(
            names,
            vec![
                OsString::from("image_cache.db"),
                OsString::from("image_cache.db-wal"),
                OsString::from("image_cache.db-shm"),
                OsString::from("image_cache.db-journal"),
            ]
        );
        assert!(database_files(None).is_empty());
    }

    #[test]
    fn test_name_within() {
        let directory = Path::new("/cache");
        assert_eq!(name_within(directory, Path::new("/cache/a.jpg")), Some(PathBuf::from("a.jpg")));
        assert_eq!(name_within(directory, Path::new("/elsewhere/a.jpg")), None);
        assert_eq!(name_within(directory, Path::new("/cache/sub/a.jpg")), None);
    }

    #[tokio::test]
    async fn test_empty_cache_is_consistent() {
        let (_temp_dir, handle) = handle().await;
        let report = verify(&handle).await.unwrap();
        assert!(report.is_consistent(), "{report:?}");
        assert_eq!(report.entries, 0);
        assert_eq!(report.unreferenced_bytes, 0);
        handle.close().await;
    }

    #[tokio::test]
    async fn test_detects_every_kind_of_drift() {
        let (temp_dir, handle) = handle().await;
        let kept = crate::add_or_get(&handle, &metadata("Kept"), b"kept").await.unwrap();
        let gone = crate::add_or_get(&handle, &metadata("Gone"), b"gone").await.unwrap();
        let changed = crate::add_or_get(&handle, &metadata("Changed"), b"changed").await.unwrap();
        assert!(verify(&handle).await.unwrap().is_consistent());

        std::fs::remove_file(temp_dir.path().join("Gone.jpg")).unwrap();
        std::fs::write(temp_dir.path().join("Changed.jpg"), b"tampered").unwrap();
        std::fs::write(temp_dir.path().join("Stray.png"), b"stray").unwrap();
        std::fs::write(temp_dir.path().join(".tmpAbC123"), b"half").unwrap();

        let report = verify(&handle).await.unwrap();
        assert!(!report.is_consistent());
        assert_eq!(report.entries, 3);
        assert_eq!(report.missing.iter().map(|e| e.id).collect::<Vec<_>>(), vec![gone.id()]);
        assert_eq!(report.corrupted.iter().map(|e| e.id).collect::<Vec<_>>(), vec![changed.id()]);
        assert_eq!(report.orphans, vec![PathBuf::from("Stray.png")]);
        assert_eq!(report.stale_temporaries, vec![PathBuf::from(".tmpAbC123")]);
        assert_eq!(report.unreferenced_bytes, (b"stray".len() + b"half".len()) as u64);
        assert!(!report.missing.iter().chain(&report.corrupted).any(|e| e.id == kept.id()));
        // Verification never repairs anything.
        assert!(temp_dir.path().join("Stray.png").exists());
        handle.close().await;
    }
}
