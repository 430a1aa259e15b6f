//! Device photo discovery.
//!
//! The scanner contract is owned by the platform layer; `DirectoryScanner`
//! is the portable implementation that walks a media directory.

use crate::models::{MediaType, PhotoCandidate};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Files at or below this size are thumbnails or broken captures
pub const DEFAULT_MIN_FILE_SIZE: u64 = 1000;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "heic", "heif"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "m4v", "3gp"];

/// Error type for photo scanning
#[derive(Debug)]
pub enum ScanError {
    NotFound(String),
    PermissionDenied(String),
    IoError(std::io::Error),
    Other(String),
}

impl std::fmt::Display for ScanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanError::NotFound(msg) => write!(f, "Media location not found: {}", msg),
            ScanError::PermissionDenied(msg) => write!(f, "Permission denied: {}", msg),
            ScanError::IoError(e) => write!(f, "IO error: {}", e),
            ScanError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for ScanError {}

impl From<std::io::Error> for ScanError {
    fn from(err: std::io::Error) -> Self {
        ScanError::IoError(err)
    }
}

/// Produces the locally available photos for an event window, newest first.
///
/// Open bounds are implementation-defined; `DirectoryScanner` treats them as
/// unbounded.
#[async_trait]
pub trait PhotoCandidateScanner: Send + Sync {
    async fn scan(
        &self,
        event_id: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<PhotoCandidate>, ScanError>;
}

/// Scans a directory tree for photos and videos
#[derive(Debug, Clone)]
pub struct DirectoryScanner {
    root: PathBuf,
    min_file_size: u64,
}

impl DirectoryScanner {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            min_file_size: DEFAULT_MIN_FILE_SIZE,
        }
    }

    pub fn with_min_file_size(mut self, bytes: u64) -> Self {
        self.min_file_size = bytes;
        self
    }
}

#[async_trait]
impl PhotoCandidateScanner for DirectoryScanner {
    async fn scan(
        &self,
        event_id: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<PhotoCandidate>, ScanError> {
        let root = self.root.clone();
        let min_size = self.min_file_size;
        log::debug!(
            "Scanning {:?} for event {} ({:?} .. {:?})",
            root,
            event_id,
            start,
            end
        );

        tokio::task::spawn_blocking(move || scan_directory(&root, start, end, min_size))
            .await
            .map_err(|e| ScanError::Other(format!("Task join error: {}", e)))?
    }
}

/// Maps a file extension to a media type
pub fn media_type_for(path: &Path) -> Option<MediaType> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaType::Image)
    } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaType::Video)
    } else {
        None
    }
}

/// SHA-256 of the file content, lowercase hex
pub fn photo_hash(path: &Path) -> std::io::Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}

fn scan_directory(
    root: &Path,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    min_size: u64,
) -> Result<Vec<PhotoCandidate>, ScanError> {
    if !root.exists() {
        return Err(ScanError::NotFound(root.display().to_string()));
    }

    let mut photos = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied && dir == root => {
                return Err(ScanError::PermissionDenied(root.display().to_string()));
            }
            Err(e) => {
                log::warn!("Skipping unreadable directory {:?}: {}", dir, e);
                continue;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(e) => {
                    log::debug!("No metadata for {:?}: {}", path, e);
                    continue;
                }
            };

            if metadata.is_dir() {
                pending.push(path);
                continue;
            }

            let Some(media_type) = media_type_for(&path) else {
                continue;
            };

            if metadata.len() <= min_size {
                continue;
            }

            let taken = match metadata.modified().or_else(|_| metadata.created()) {
                Ok(t) => DateTime::<Utc>::from(t),
                Err(_) => continue,
            };

            if start.is_some_and(|s| taken < s) || end.is_some_and(|e| taken > e) {
                continue;
            }

            let id = match photo_hash(&path) {
                Ok(hash) => hash,
                Err(e) => {
                    log::warn!("Could not hash {:?}: {}", path, e);
                    continue;
                }
            };

            let (width, height) = match media_type {
                MediaType::Image => image::image_dimensions(&path).unwrap_or((0, 0)),
                MediaType::Video => (0, 0),
            };

            let filename = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            photos.push(PhotoCandidate {
                id,
                creation_time: taken,
                filename,
                width,
                height,
                media_type,
                duration_seconds: 0.0,
                source: path.to_string_lossy().into_owned(),
            });
        }
    }

    photos.sort_by(|a, b| b.creation_time.cmp(&a.creation_time));

    // byte-identical copies share an id; keep the newest
    let mut seen = HashSet::with_capacity(photos.len());
    photos.retain(|p| {
        let first = seen.insert(p.id.clone());
        if !first {
            log::debug!("Skipping duplicate copy {}", p.source);
        }
        first
    });

    log::info!("Found {} photos in {:?}", photos.len(), root);
    Ok(photos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use std::time::SystemTime;

    fn write_photo(dir: &Path, name: &str, fill: u8, taken: DateTime<Utc>) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, vec![fill; 2048]).unwrap();
        let file = std::fs::File::options().write(true).open(&path).unwrap();
        file.set_modified(SystemTime::from(taken)).unwrap();
        path
    }

    #[test]
    fn test_media_type_for() {
        assert_eq!(media_type_for(Path::new("a/IMG_1.JPG")), Some(MediaType::Image));
        assert_eq!(media_type_for(Path::new("clip.mov")), Some(MediaType::Video));
        assert_eq!(media_type_for(Path::new("notes.txt")), None);
        assert_eq!(media_type_for(Path::new("no_extension")), None);
    }

    #[test]
    fn test_photo_hash_is_content_based() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.jpg");
        let b = dir.path().join("b.jpg");
        std::fs::write(&a, b"same bytes").unwrap();
        std::fs::write(&b, b"same bytes").unwrap();

        let hash = photo_hash(&a).unwrap();
        assert_eq!(hash, photo_hash(&b).unwrap());
        assert_eq!(hash.len(), 64);
    }

    #[tokio::test]
    async fn test_scan_filters_window_and_sorts_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let start = Utc.with_ymd_and_hms(2024, 8, 18, 10, 0, 0).unwrap();
        let end = start + Duration::hours(4);

        write_photo(dir.path(), "early.jpg", 1, start + Duration::minutes(10));
        write_photo(dir.path(), "late.jpg", 2, start + Duration::hours(3));
        write_photo(dir.path(), "before.jpg", 3, start - Duration::days(1));
        write_photo(dir.path(), "after.jpg", 4, end + Duration::hours(1));
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        write_photo(&dir.path().join("nested"), "mid.mp4", 5, start + Duration::hours(1));
        std::fs::write(dir.path().join("tiny.jpg"), b"x").unwrap();
        std::fs::write(dir.path().join("readme.txt"), vec![0u8; 4096]).unwrap();

        let scanner = DirectoryScanner::new(dir.path());
        let photos = scanner.scan("E1", Some(start), Some(end)).await.unwrap();

        let names: Vec<&str> = photos.iter().map(|p| p.filename.as_str()).collect();
        assert_eq!(names, vec!["late.jpg", "mid.mp4", "early.jpg"]);
        assert_eq!(photos[1].media_type, MediaType::Video);
        assert!(photos.iter().all(|p| p.id.len() == 64));
    }

    #[tokio::test]
    async fn test_scan_open_window_returns_everything() {
        let dir = tempfile::tempdir().unwrap();
        let base = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        write_photo(dir.path(), "one.jpg", 1, base);
        write_photo(dir.path(), "two.jpg", 2, base + Duration::days(300));

        let photos = DirectoryScanner::new(dir.path())
            .scan("E1", None, None)
            .await
            .unwrap();
        assert_eq!(photos.len(), 2);
        assert_eq!(photos[0].filename, "two.jpg");
    }

    #[tokio::test]
    async fn test_scan_reads_image_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pixel.png");
        image::RgbImage::new(3, 2).save(&path).unwrap();

        let photos = DirectoryScanner::new(dir.path())
            .with_min_file_size(0)
            .scan("E1", None, None)
            .await
            .unwrap();
        assert_eq!(photos.len(), 1);
        assert_eq!((photos[0].width, photos[0].height), (3, 2));
    }

    #[tokio::test]
    async fn test_scan_keeps_newest_of_identical_copies() {
        let dir = tempfile::tempdir().unwrap();
        let base = Utc.with_ymd_and_hms(2024, 8, 18, 10, 0, 0).unwrap();
        std::fs::create_dir(dir.path().join("backup")).unwrap();
        write_photo(dir.path(), "IMG_1.jpg", 7, base);
        write_photo(&dir.path().join("backup"), "IMG_1.jpg", 7, base + Duration::hours(2));
        write_photo(dir.path(), "IMG_2.jpg", 8, base + Duration::hours(1));

        let photos = DirectoryScanner::new(dir.path())
            .scan("E1", None, None)
            .await
            .unwrap();

        assert_eq!(photos.len(), 2);
        assert_ne!(photos[0].id, photos[1].id);
        assert!(photos[0].source.contains("backup"));
        assert_eq!(photos[1].filename, "IMG_2.jpg");
    }

    #[tokio::test]
    async fn test_scan_missing_root() {
        let scanner = DirectoryScanner::new("/definitely/not/here");
        let err = scanner.scan("E1", None, None).await.unwrap_err();
        assert!(matches!(err, ScanError::NotFound(_)));
    }
}
