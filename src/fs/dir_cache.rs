use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::TtlCache;
use crate::error::Result;

/// Default TTL for cached directory listings.
pub const DIR_CACHE_TTL: Duration = Duration::from_secs(10);
/// Default cap on cached directories.
pub const DIR_CACHE_MAX_ENTRIES: usize = 500;

/// One raw directory entry as captured at read time.
///
/// Size and mtime are deliberately not captured here; the tree builder
/// stats surviving entries on demand so filtered-out names never cost a
/// syscall.
#[derive(Debug, Clone, PartialEq)]
pub struct DirEntryInfo {
    pub name: String,
    pub path: PathBuf,
    pub is_dir: bool,
}

/// Cache of per-directory raw entry lists, keyed by absolute path.
pub struct DirListingCache {
    cache: TtlCache<PathBuf, Vec<DirEntryInfo>>,
}

impl DirListingCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            cache: TtlCache::new(ttl, max_entries),
        }
    }

    /// Return the cached listing, or read the directory and cache it.
    ///
    /// Read errors (permission denied, directory vanished) propagate;
    /// the caller degrades that subtree to empty rather than aborting
    /// the whole scan. Unreadable individual entries are skipped.
    pub fn get_or_read(&mut self, dir: &Path, force_refresh: bool) -> Result<Vec<DirEntryInfo>> {
        let key = dir.to_path_buf();
        if !force_refresh {
            if let Some(entries) = self.cache.get(&key) {
                return Ok(entries);
            }
        }

        let mut entries = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = match entry {
                Ok(e) => e,
                Err(_) => continue,
            };
            let name = entry.file_name().to_string_lossy().to_string();
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            entries.push(DirEntryInfo {
                name,
                path: entry.path(),
                is_dir,
            });
        }

        self.cache.set(key, entries.clone());
        Ok(entries)
    }

    pub fn invalidate(&mut self, dir: &Path) {
        self.cache.invalidate(&dir.to_path_buf());
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }

    /// Sweep expired listings; meant for a periodic tick.
    pub fn cleanup(&mut self) -> usize {
        self.cache.cleanup()
    }
}

impl Default for DirListingCache {
    fn default() -> Self {
        Self::new(DIR_CACHE_TTL, DIR_CACHE_MAX_ENTRIES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use tempfile::TempDir;

    #[test]
    fn reads_and_caches_listing() {
        let dir = TempDir::new().unwrap();
        File::create(dir.path().join("a.txt")).unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();

        let mut cache = DirListingCache::default();
        let first = cache.get_or_read(dir.path(), false).unwrap();
        assert_eq!(first.len(), 2);

        // A file created after the cached read is invisible until forced.
        File::create(dir.path().join("b.txt")).unwrap();
        let cached = cache.get_or_read(dir.path(), false).unwrap();
        assert_eq!(cached.len(), 2);

        let forced = cache.get_or_read(dir.path(), true).unwrap();
        assert_eq!(forced.len(), 3);
    }

    #[test]
    fn invalidate_forces_fresh_read() {
        let dir = TempDir::new().unwrap();
        File::create(dir.path().join("a.txt")).unwrap();

        let mut cache = DirListingCache::default();
        cache.get_or_read(dir.path(), false).unwrap();
        File::create(dir.path().join("b.txt")).unwrap();

        cache.invalidate(dir.path());
        let fresh = cache.get_or_read(dir.path(), false).unwrap();
        assert_eq!(fresh.len(), 2);
    }

    #[test]
    fn missing_directory_propagates_error() {
        let dir = TempDir::new().unwrap();
        let gone = dir.path().join("nope");
        let mut cache = DirListingCache::default();
        assert!(cache.get_or_read(&gone, false).is_err());
    }

    #[test]
    fn entry_kind_is_captured() {
        let dir = TempDir::new().unwrap();
        File::create(dir.path().join("f")).unwrap();
        fs::create_dir(dir.path().join("d")).unwrap();

        let mut cache = DirListingCache::default();
        let entries = cache.get_or_read(dir.path(), false).unwrap();
        let f = entries.iter().find(|e| e.name == "f").unwrap();
        let d = entries.iter().find(|e| e.name == "d").unwrap();
        assert!(!f.is_dir);
        assert!(d.is_dir);
    }
}
