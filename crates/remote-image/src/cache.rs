//! Disk cache for fetched remote images.
//!
//! Key schema: `sha256(url)` hex → `<hash>.png` inside the cache directory.
//! Entries carry no metadata beyond the file itself; freshness is judged
//! from the file's modification time. Everything here is plain blocking
//! filesystem work — the cache is shared across requests through the
//! filesystem, not through process memory.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::warn;

use lc_common::error::CommonError;

/// Most-recent entries reported by [`ImageCache::status`].
const STATUS_ENTRY_LIMIT: usize = 100;

#[derive(Debug, Clone)]
pub struct ImageCache {
    dir: PathBuf,
}

/// One cache file, as reported by [`ImageCache::status`].
#[derive(Debug, Clone, Serialize)]
pub struct CacheEntry {
    pub file: String,
    pub size: u64,
    /// Modification time as seconds since the Unix epoch.
    pub modified: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheStatus {
    pub cache_count: usize,
    pub cache_size: u64,
    /// Newest-first, capped at 100 entries.
    pub files: Vec<CacheEntry>,
}

impl ImageCache {
    /// Open (and create if needed) a cache rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, CommonError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Cache file path for `url`: SHA-256 of the URL string, fixed `.png`
    /// extension regardless of the source format (entries are re-encoded as
    /// PNG on write).
    pub fn path_for(&self, url: &str) -> PathBuf {
        let hash = Sha256::digest(url.as_bytes());
        self.dir.join(format!("{hash:x}.png"))
    }

    /// Whether a cached file for `url` exists and is younger than
    /// `max_age_secs`. A max age of zero never reuses the cache.
    pub fn is_fresh(&self, url: &str, max_age_secs: u64) -> bool {
        let path = self.path_for(url);
        let Ok(meta) = std::fs::metadata(&path) else {
            return false;
        };
        let Ok(modified) = meta.modified() else {
            return false;
        };
        is_fresh_at(modified, SystemTime::now(), max_age_secs)
    }

    /// Read the cached bytes for `url`, regardless of freshness.
    pub fn read(&self, url: &str) -> Result<Vec<u8>, CommonError> {
        Ok(std::fs::read(self.path_for(url))?)
    }

    /// Persist `bytes` as the cache entry for `url`, replacing any stale one.
    pub fn write(&self, url: &str, bytes: &[u8]) -> Result<(), CommonError> {
        std::fs::write(self.path_for(url), bytes)?;
        Ok(())
    }

    /// Delete every `.png` entry, returning how many were removed.
    pub fn clear(&self) -> Result<usize, CommonError> {
        let mut removed = 0;
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name();
            if name.to_string_lossy().ends_with(".png") {
                std::fs::remove_file(entry.path())?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Summarize the cache contents, newest entries first.
    pub fn status(&self) -> Result<CacheStatus, CommonError> {
        let mut files = Vec::new();
        let mut total = 0;
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.ends_with(".png") {
                continue;
            }
            let meta = match entry.metadata() {
                Ok(meta) => meta,
                Err(e) => {
                    warn!(file = %name, error = %e, "skipping unreadable cache entry");
                    continue;
                }
            };
            let modified = meta
                .modified()
                .ok()
                .and_then(|t| t.duration_since(SystemTime::UNIX_EPOCH).ok())
                .map(|d| d.as_secs())
                .unwrap_or(0);
            total += meta.len();
            files.push(CacheEntry {
                file: name,
                size: meta.len(),
                modified,
            });
        }
        files.sort_by(|a, b| b.modified.cmp(&a.modified));
        let count = files.len();
        files.truncate(STATUS_ENTRY_LIMIT);
        Ok(CacheStatus {
            cache_count: count,
            cache_size: total,
            files,
        })
    }
}

/// Freshness rule, factored out of the clock for testability: a file written
/// at `modified` is still fresh at `now` iff `now - modified < max_age_secs`.
/// Clock skew (modification time in the future) counts as fresh.
pub fn is_fresh_at(modified: SystemTime, now: SystemTime, max_age_secs: u64) -> bool {
    if max_age_secs == 0 {
        return false;
    }
    match now.duration_since(modified) {
        Ok(age) => age < Duration::from_secs(max_age_secs),
        Err(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_stable_and_url_specific() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = ImageCache::open(dir.path()).expect("open");
        let a = cache.path_for("https://example.com/a.jpg");
        let b = cache.path_for("https://example.com/b.jpg");
        assert_eq!(a, cache.path_for("https://example.com/a.jpg"));
        assert_ne!(a, b);
        assert!(a.extension().is_some_and(|e| e == "png"));
    }

    #[test]
    fn freshness_boundary() {
        let max_age = 3600;
        let written = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000);
        let just_inside = written + Duration::from_secs(max_age - 1);
        let just_outside = written + Duration::from_secs(max_age + 1);
        assert!(is_fresh_at(written, just_inside, max_age));
        assert!(!is_fresh_at(written, just_outside, max_age));
    }

    #[test]
    fn zero_max_age_never_reuses() {
        let now = SystemTime::now();
        assert!(!is_fresh_at(now, now, 0));
    }

    #[test]
    fn future_mtime_counts_as_fresh() {
        let now = SystemTime::now();
        assert!(is_fresh_at(now + Duration::from_secs(5), now, 60));
    }

    #[test]
    fn missing_entry_is_never_fresh() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = ImageCache::open(dir.path()).expect("open");
        assert!(!cache.is_fresh("https://example.com/missing.png", 3600));
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = ImageCache::open(dir.path()).expect("open");
        let url = "https://example.com/pic.png";
        cache.write(url, b"pngbytes").expect("write");
        assert!(cache.is_fresh(url, 3600));
        assert_eq!(cache.read(url).expect("read"), b"pngbytes");
    }

    #[test]
    fn clear_removes_only_png_entries() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = ImageCache::open(dir.path()).expect("open");
        cache.write("https://a.example/x", b"x").expect("write");
        cache.write("https://a.example/y", b"y").expect("write");
        std::fs::write(dir.path().join("notes.txt"), b"keep me").expect("write");
        assert_eq!(cache.clear().expect("clear"), 2);
        assert!(dir.path().join("notes.txt").exists());
        assert_eq!(cache.status().expect("status").cache_count, 0);
    }

    #[test]
    fn status_reports_count_and_size() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = ImageCache::open(dir.path()).expect("open");
        cache.write("https://a.example/1", &[0u8; 10]).expect("write");
        cache.write("https://a.example/2", &[0u8; 30]).expect("write");
        let status = cache.status().expect("status");
        assert_eq!(status.cache_count, 2);
        assert_eq!(status.cache_size, 40);
        assert_eq!(status.files.len(), 2);
    }
}
