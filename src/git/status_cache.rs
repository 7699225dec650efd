use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::cache::TtlCache;
use crate::error::{AppError, Result};
use crate::git::status::{GitStatus, GitStatusProvider};

/// Default TTL for a cached repo-wide status map.
pub const GIT_CACHE_TTL: Duration = Duration::from_secs(5);
/// Default cap on cached working directories.
pub const GIT_CACHE_MAX_ENTRIES: usize = 100;

/// Ceiling on a single status query. A hung git subprocess (e.g. a
/// network-mounted repo) degrades to a `GitError` instead of wedging
/// the rebuild pipeline.
pub const GIT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Cache of repo-wide path→status maps, keyed by working directory.
pub struct GitStatusCache {
    cache: TtlCache<PathBuf, HashMap<PathBuf, GitStatus>>,
}

impl GitStatusCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            cache: TtlCache::new(ttl, max_entries),
        }
    }

    /// Return the cached status map for `cwd`, or run a fresh query.
    ///
    /// Hits return a copy of the stored map. The provider call runs on
    /// the blocking pool under `GIT_FETCH_TIMEOUT`; failure propagates
    /// as a typed error and caches nothing.
    pub async fn get_or_fetch<P>(
        &mut self,
        provider: &Arc<P>,
        cwd: &Path,
        force_refresh: bool,
    ) -> Result<HashMap<PathBuf, GitStatus>>
    where
        P: GitStatusProvider + 'static,
    {
        let key = cwd.to_path_buf();
        if !force_refresh {
            if let Some(map) = self.cache.get(&key) {
                return Ok(map);
            }
        }

        let provider = Arc::clone(provider);
        let query_dir = key.clone();
        let fetch = tokio::task::spawn_blocking(move || provider.fetch_status(&query_dir));
        let map = match tokio::time::timeout(GIT_FETCH_TIMEOUT, fetch).await {
            Err(_) => return Err(AppError::Git("git status query timed out".into())),
            Ok(Err(join_err)) => {
                return Err(AppError::Git(format!("git status task failed: {join_err}")))
            }
            Ok(Ok(result)) => result?,
        };

        self.cache.set(key, map.clone());
        Ok(map)
    }

    /// Drop the cached map for one working directory.
    pub fn invalidate(&mut self, cwd: &Path) {
        self.cache.invalidate(&cwd.to_path_buf());
    }

    #[allow(dead_code)]
    pub fn clear(&mut self) {
        self.cache.clear();
    }

    /// Sweep expired maps; meant for a periodic tick.
    pub fn cleanup(&mut self) -> usize {
        self.cache.cleanup()
    }
}

impl Default for GitStatusCache {
    fn default() -> Self {
        Self::new(GIT_CACHE_TTL, GIT_CACHE_MAX_ENTRIES)
    }
}
