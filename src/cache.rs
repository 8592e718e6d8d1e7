//! Rendered-page cache.
//!
//! Rendering walks templates, markup and the page tree, so finished HTML can
//! be kept between runs. The engine only decides *what* to cache and *when*
//! an entry is stale; a [`Cache`] implementation stores opaque text by id.
//!
//! ## Cache ids
//!
//! Ids are the SHA-256 of the page's directory path ([`cache_id`]), so
//! renaming or moving a page naturally misses the old entry.
//!
//! ## Staleness
//!
//! Each entry records when it was written. With `cache.autoupdate` the site
//! compares that against the newest modification anywhere in the content
//! tree and re-renders when content is newer. Without it entries live until
//! flushed.
//!
//! ## Storage
//!
//! [`FileCache`] writes one `<id>.html` per entry into the cache directory
//! and keeps write times in a JSON manifest next to them. A manifest that is
//! missing, corrupt or from another format version loads as empty.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Name of the manifest file within the cache directory.
const MANIFEST_FILENAME: &str = ".cache-manifest.json";

/// Bump to invalidate every existing cache when the layout changes.
const MANIFEST_VERSION: u32 = 1;

/// Key/value store for rendered pages.
pub trait Cache {
    fn get(&self, id: &str) -> Option<String>;
    fn set(&self, id: &str, value: &str) -> Result<()>;
    /// When `id` was last written.
    fn modified(&self, id: &str) -> Option<SystemTime>;
    fn remove(&self, id: &str) -> Result<()>;
    /// Drop every entry.
    fn flush(&self) -> Result<()>;
}

/// Cache id for a page directory: SHA-256 of its path, hex encoded.
pub fn cache_id(path: &Path) -> String {
    let digest = Sha256::digest(path.to_string_lossy().as_bytes());
    format!("{:x}", digest)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheEntry {
    /// Write time in seconds since the Unix epoch.
    pub written: u64,
}

/// On-disk record of cache entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheManifest {
    pub version: u32,
    pub entries: HashMap<String, CacheEntry>,
}

impl CacheManifest {
    pub fn empty() -> Self {
        Self {
            version: MANIFEST_VERSION,
            entries: HashMap::new(),
        }
    }

    /// Load from the cache directory. Returns an empty manifest if the
    /// file doesn't exist or can't be parsed (version mismatch, corruption).
    pub fn load(dir: &Path) -> Self {
        let content = match fs::read_to_string(dir.join(MANIFEST_FILENAME)) {
            Ok(c) => c,
            Err(_) => return Self::empty(),
        };
        let manifest: Self = match serde_json::from_str(&content) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "cache manifest unreadable, starting empty");
                return Self::empty();
            }
        };
        if manifest.version != MANIFEST_VERSION {
            return Self::empty();
        }
        manifest
    }

    pub fn save(&self, dir: &Path) -> Result<()> {
        let path = dir.join(MANIFEST_FILENAME);
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| Error::io(&path, std::io::Error::other(e)))?;
        fs::write(&path, json).map_err(|e| Error::io(&path, e))
    }
}

/// Directory-backed [`Cache`].
#[derive(Debug)]
pub struct FileCache {
    dir: PathBuf,
    manifest: RefCell<CacheManifest>,
}

impl FileCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let manifest = CacheManifest::load(&dir);
        Self {
            dir,
            manifest: RefCell::new(manifest),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.html"))
    }

    fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| Error::io(&self.dir, e))
    }
}

impl Cache for FileCache {
    fn get(&self, id: &str) -> Option<String> {
        if !self.manifest.borrow().entries.contains_key(id) {
            return None;
        }
        fs::read_to_string(self.entry_path(id)).ok()
    }

    fn set(&self, id: &str, value: &str) -> Result<()> {
        self.ensure_dir()?;
        let path = self.entry_path(id);
        fs::write(&path, value).map_err(|e| Error::io(&path, e))?;
        let written = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let mut manifest = self.manifest.borrow_mut();
        manifest
            .entries
            .insert(id.to_string(), CacheEntry { written });
        manifest.save(&self.dir)
    }

    fn modified(&self, id: &str) -> Option<SystemTime> {
        self.manifest
            .borrow()
            .entries
            .get(id)
            .map(|e| UNIX_EPOCH + Duration::from_secs(e.written))
    }

    fn remove(&self, id: &str) -> Result<()> {
        let path = self.entry_path(id);
        if path.exists() {
            fs::remove_file(&path).map_err(|e| Error::io(&path, e))?;
        }
        let mut manifest = self.manifest.borrow_mut();
        if manifest.entries.remove(id).is_some() {
            manifest.save(&self.dir)?;
        }
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        let ids: Vec<String> = self.manifest.borrow().entries.keys().cloned().collect();
        for id in ids {
            let path = self.entry_path(&id);
            if path.exists() {
                fs::remove_file(&path).map_err(|e| Error::io(&path, e))?;
            }
        }
        let mut manifest = self.manifest.borrow_mut();
        *manifest = CacheManifest::empty();
        if self.dir.exists() {
            manifest.save(&self.dir)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // =========================================================================
    // Ids
    // =========================================================================

    #[test]
    fn cache_id_is_sha256_hex() {
        let id = cache_id(Path::new("/site/content/01-projects"));
        assert_eq!(id.len(), 64);
        assert_eq!(id, cache_id(Path::new("/site/content/01-projects")));
        assert_ne!(id, cache_id(Path::new("/site/content/02-projects")));
    }

    // =========================================================================
    // FileCache
    // =========================================================================

    #[test]
    fn set_then_get() {
        let tmp = TempDir::new().unwrap();
        let cache = FileCache::new(tmp.path().join("cache"));
        assert!(cache.get("abc").is_none());
        cache.set("abc", "<p>hi</p>").unwrap();
        assert_eq!(cache.get("abc").as_deref(), Some("<p>hi</p>"));
        assert!(cache.modified("abc").is_some());
    }

    #[test]
    fn entries_survive_reload() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("cache");
        FileCache::new(&dir).set("abc", "x").unwrap();
        let reloaded = FileCache::new(&dir);
        assert_eq!(reloaded.get("abc").as_deref(), Some("x"));
    }

    #[test]
    fn remove_and_flush() {
        let tmp = TempDir::new().unwrap();
        let cache = FileCache::new(tmp.path());
        cache.set("a", "1").unwrap();
        cache.set("b", "2").unwrap();
        cache.remove("a").unwrap();
        assert!(cache.get("a").is_none());
        assert!(!tmp.path().join("a.html").exists());
        cache.flush().unwrap();
        assert!(cache.get("b").is_none());
        assert!(cache.modified("b").is_none());
    }

    #[test]
    fn entry_file_without_manifest_is_a_miss() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("abc.html"), "stale").unwrap();
        let cache = FileCache::new(tmp.path());
        assert!(cache.get("abc").is_none());
    }

    // =========================================================================
    // Manifest
    // =========================================================================

    #[test]
    fn load_missing_file_returns_empty() {
        let tmp = TempDir::new().unwrap();
        assert!(CacheManifest::load(tmp.path()).entries.is_empty());
    }

    #[test]
    fn load_corrupt_json_returns_empty() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(MANIFEST_FILENAME), "not json").unwrap();
        assert!(CacheManifest::load(tmp.path()).entries.is_empty());
    }

    #[test]
    fn load_wrong_version_returns_empty() {
        let tmp = TempDir::new().unwrap();
        let json = format!(
            r#"{{"version": {}, "entries": {{"a": {{"written": 1}}}}}}"#,
            MANIFEST_VERSION + 1
        );
        fs::write(tmp.path().join(MANIFEST_FILENAME), json).unwrap();
        assert!(CacheManifest::load(tmp.path()).entries.is_empty());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let mut m = CacheManifest::empty();
        m.entries.insert("x".into(), CacheEntry { written: 42 });
        m.save(tmp.path()).unwrap();
        let loaded = CacheManifest::load(tmp.path());
        assert_eq!(loaded.entries["x"], CacheEntry { written: 42 });
    }
}
