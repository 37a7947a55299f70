//! End-to-end behaviour of the image cache, from a fake remote source down to
//! the files on disk.

use apod_content::models::{ApodDate, ApodMetadata, MediaKind};
use apod_library::error::ErrorKind as LibraryErrorKind;
use apod_library::source::{ApodSource, ErrorKind as SourceErrorKind, Result as SourceResult};
use apod_library::{Addition, CacheHandle, EntryId, add_or_get, fetch_and_cache, get_by_id, list_titles, verify};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use tempfile::TempDir;

const DATABASE_FILE: &str = "image_cache.db";

async fn open() -> (TempDir, CacheHandle) {
    let temp_dir = tempfile::tempdir().unwrap();
    let handle = CacheHandle::initialize(temp_dir.path(), DATABASE_FILE).await.unwrap();
    (temp_dir, handle)
}

fn date(s: &str) -> ApodDate {
    s.parse().unwrap()
}

fn metadata(day: &str, title: &str, url: &str) -> ApodMetadata {
    ApodMetadata {
        date: date(day),
        title: title.to_string(),
        explanation: format!("What happened on {day}."),
        image_url: url.to_string(),
        media_kind: MediaKind::Image,
    }
}

/// Image files in the directory, i.e. everything except the metadata store.
fn image_files(directory: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(directory)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| !name.starts_with(DATABASE_FILE))
        .collect();
    names.sort();
    names
}

/// A remote source serving a fixed archive.
#[derive(Default)]
struct Archive {
    entries: HashMap<ApodDate, ApodMetadata>,
    images: HashMap<String, Vec<u8>>,
}
impl Archive {
    fn publish(mut self, metadata: ApodMetadata, bytes: &[u8]) -> Self {
        self.images.insert(metadata.image_url.clone(), bytes.to_vec());
        self.entries.insert(metadata.date, metadata);
        self
    }
}
#[async_trait]
impl ApodSource for Archive {
    async fn metadata(&self, date: ApodDate) -> SourceResult<ApodMetadata> {
        match self.entries.get(&date) {
            Some(metadata) => Ok(metadata.clone()),
            None => exn::bail!(SourceErrorKind::NotPublished(date)),
        }
    }

    async fn image(&self, url: &str) -> SourceResult<Vec<u8>> {
        match self.images.get(url) {
            Some(bytes) => Ok(bytes.clone()),
            None => exn::bail!(SourceErrorKind::Remote(format!("404 for {url}"))),
        }
    }
}

#[tokio::test]
async fn test_add_is_idempotent() {
    let (temp_dir, handle) = open().await;
    let meta = metadata("2022-05-09", "NGC 3521: Galaxy in a Bubble", "https://apod.nasa.gov/a/NGC3521.jpg");
    let first = add_or_get(&handle, &meta, b"bubble").await.unwrap();
    let second = add_or_get(&handle, &meta, b"bubble").await.unwrap();
    assert_eq!(first, Addition::Stored(first.id()));
    assert_eq!(second, Addition::AlreadyCached(first.id()));
    assert_eq!(handle.repository().count().await.unwrap(), 1);
    assert_eq!(image_files(temp_dir.path()), vec!["NGC_3521_Galaxy_in_a_Bubble.jpg"]);
    handle.close().await;
}

#[tokio::test]
async fn test_same_image_on_two_dates_is_stored_once() {
    let (temp_dir, handle) = open().await;
    let original = metadata("2023-03-01", "Mayan Milky Way", "https://apod.nasa.gov/a/Mayan.jpg");
    let rerun = metadata("2024-03-01", "Mayan Milky Way (Rerun)", "https://apod.nasa.gov/b/Mayan.png");
    let first = add_or_get(&handle, &original, b"milky way").await.unwrap();
    let second = add_or_get(&handle, &rerun, b"milky way").await.unwrap();
    assert_eq!(second, Addition::AlreadyCached(first.id()));
    // The first title wins; the rerun's title is never recorded.
    assert_eq!(list_titles(&handle).await.unwrap(), vec!["Mayan Milky Way"]);
    assert_eq!(image_files(temp_dir.path()), vec!["Mayan_Milky_Way.jpg"]);
    handle.close().await;
}

#[tokio::test]
async fn test_colliding_titles_keep_both_images() {
    let (temp_dir, handle) = open().await;
    let monday = metadata("2024-01-01", "The Moon", "https://example.com/moon.jpg");
    let tuesday = metadata("2024-01-02", "The  Moon", "https://example.com/other-moon.jpg");
    let first = add_or_get(&handle, &monday, b"full moon").await.unwrap();
    let second = add_or_get(&handle, &tuesday, b"new moon").await.unwrap();
    assert!(first.is_new() && second.is_new());
    assert_ne!(first.id(), second.id());

    let suffixed = format!("The_Moon_{}.jpg", apod_content::digest(b"new moon").short());
    let entry = get_by_id(&handle, second.id()).await.unwrap().unwrap();
    assert_eq!(entry.file_path, temp_dir.path().join(&suffixed));
    assert_eq!(std::fs::read(&entry.file_path).unwrap(), b"new moon");
    assert_eq!(image_files(temp_dir.path()), vec!["The_Moon.jpg".to_string(), suffixed]);
    handle.close().await;
}

#[tokio::test]
async fn test_irreconcilable_collision_leaves_nothing_behind() {
    let (temp_dir, handle) = open().await;
    let digest = apod_content::digest(b"third moon");
    std::fs::write(temp_dir.path().join("Moon.jpg"), b"somebody else's").unwrap();
    std::fs::write(temp_dir.path().join(format!("Moon_{}.jpg", digest.short())), b"also taken").unwrap();

    let meta = metadata("2024-01-03", "Moon", "https://example.com/moon.jpg");
    let err = add_or_get(&handle, &meta, b"third moon").await.unwrap_err();
    assert!(matches!(&*err, LibraryErrorKind::Add));
    assert_eq!(handle.repository().count().await.unwrap(), 0);
    assert_eq!(image_files(temp_dir.path()).len(), 2);
    handle.close().await;
}

#[tokio::test]
async fn test_titles_are_listed_in_insertion_order() {
    let (_temp_dir, handle) = open().await;
    for (day, title) in [("2024-02-01", "Zodiacal Light"), ("2024-02-02", "Aurora"), ("2024-02-03", "Mars")] {
        let url = format!("https://example.com/{day}.jpg");
        add_or_get(&handle, &metadata(day, title, &url), title.as_bytes()).await.unwrap();
    }
    assert_eq!(list_titles(&handle).await.unwrap(), vec!["Zodiacal Light", "Aurora", "Mars"]);
    handle.close().await;
}

#[tokio::test]
async fn test_initialize_twice_keeps_entries() {
    let temp_dir = tempfile::tempdir().unwrap();
    let directory = temp_dir.path().join("images");
    let handle = CacheHandle::initialize(&directory, DATABASE_FILE).await.unwrap();
    let meta = metadata("2022-05-09", "Galaxy", "https://example.com/galaxy.jpg");
    let stored = add_or_get(&handle, &meta, b"galaxy").await.unwrap();
    handle.close().await;

    let reopened = CacheHandle::initialize(&directory, DATABASE_FILE).await.unwrap();
    assert_eq!(list_titles(&reopened).await.unwrap(), vec!["Galaxy"]);
    let again = add_or_get(&reopened, &meta, b"galaxy").await.unwrap();
    assert_eq!(again, Addition::AlreadyCached(stored.id()));
    assert!(verify(&reopened).await.unwrap().is_consistent());
    reopened.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_adds_of_same_content() {
    const WRITERS: usize = 4;
    for _ in 0..10 {
        let (temp_dir, handle) = open().await;
        let meta = metadata("2022-05-09", "Galaxy", "https://example.com/galaxy.jpg");
        let tasks: Vec<_> = (0..WRITERS)
            .map(|_| {
                let (handle, meta) = (handle.clone(), meta.clone());
                tokio::spawn(async move { add_or_get(&handle, &meta, b"galaxy".to_vec()).await })
            })
            .collect();
        let mut outcomes = Vec::with_capacity(WRITERS);
        for task in tasks {
            outcomes.push(task.await.unwrap().unwrap());
        }
        assert!(outcomes.iter().all(|o| o.id() == outcomes[0].id()));
        assert_eq!(outcomes.iter().filter(|o| o.is_new()).count(), 1);
        assert_eq!(handle.repository().count().await.unwrap(), 1);
        // Every writer that lost the race removed its file again.
        assert_eq!(image_files(temp_dir.path()).len(), 1);
        assert!(verify(&handle).await.unwrap().is_consistent());
        handle.close().await;
    }
}

#[tokio::test]
async fn test_every_entry_matches_its_file() {
    let (_temp_dir, handle) = open().await;
    let images: [(&str, &str, &[u8]); 3] = [
        ("2021-07-04", "Fireworks", b"boom"),
        ("2021-07-05", "Fireworks", b"bang"),
        ("2021-07-06", "Saturn's Rings", b"rings"),
    ];
    for (day, title, bytes) in images {
        let url = format!("https://example.com/{day}.png");
        add_or_get(&handle, &metadata(day, title, &url), bytes).await.unwrap();
    }
    for entry in handle.repository().list_entries().await.unwrap() {
        let bytes = std::fs::read(&entry.file_path).unwrap();
        assert_eq!(apod_content::digest(&bytes), entry.sha256);
        assert!(entry.file_path.is_absolute());
    }
    assert!(verify(&handle).await.unwrap().is_consistent());
    handle.close().await;
}

#[tokio::test]
async fn test_fetch_and_cache_from_source() {
    let (_temp_dir, handle) = open().await;
    let video = ApodMetadata {
        media_kind: MediaKind::Video,
        ..metadata("2024-04-08", "Total Solar Eclipse", "https://img.youtube.com/vi/xyz/0.jpg")
    };
    let archive = Archive::default()
        .publish(metadata("2024-04-07", "Comet Pons-Brooks", "https://example.com/comet.jpg"), b"comet")
        .publish(video, b"thumbnail");

    let comet = fetch_and_cache(&handle, &archive, date("2024-04-07")).await.unwrap();
    let eclipse = fetch_and_cache(&handle, &archive, date("2024-04-08")).await.unwrap();
    assert!(comet.is_new() && eclipse.is_new());
    let entry = get_by_id(&handle, eclipse.id()).await.unwrap().unwrap();
    assert!(entry.file_path.ends_with("Total_Solar_Eclipse.jpg"));

    let err = fetch_and_cache(&handle, &archive, date("2024-04-09")).await.unwrap_err();
    assert!(matches!(&*err, LibraryErrorKind::Fetch));
    handle.close().await;
}

#[tokio::test]
async fn test_unknown_id_is_none() {
    let (_temp_dir, handle) = open().await;
    assert_eq!(get_by_id(&handle, EntryId::from(12345)).await.unwrap(), None);
    handle.close().await;
}
