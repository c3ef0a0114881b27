//! Response cache keyed by a hash of the resolved source URL.
//!
//! Two stores implement [`CacheStore`]: [`DiskCache`] keeps one file per key under
//! `~/.cache/plugin-feed/` and survives between runs, [`MemoryCache`] lives as long
//! as the process (useful when one host serves many feeds, and in tests).
//!
//! Expired entries are not dropped on read. They are returned with
//! `fresh == false` so the fetcher can fall back to them when the network fails.

use crate::error::Result;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60); // 1 hour

/// A cached body and whether it is still within its TTL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cached {
    pub value: String,
    pub fresh: bool,
}

/// Key/value store for fetched bodies
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Cached>;

    fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Remove expired entries, returning how many were removed
    fn clear_expired(&self) -> Result<usize>;
}

/// Cache key for a fully resolved URL
pub fn cache_key(url: &str) -> String {
    format!("{:x}", Sha256::digest(url.as_bytes()))
}

/// Get the cache directory (~/.cache/plugin-feed/ or equivalent)
pub fn cache_dir() -> PathBuf {
    if let Some(cache_home) = std::env::var_os("XDG_CACHE_HOME") {
        PathBuf::from(cache_home).join("plugin-feed")
    } else if let Some(home) = std::env::var_os("HOME") {
        PathBuf::from(home).join(".cache/plugin-feed")
    } else {
        PathBuf::from(".cache/plugin-feed")
    }
}

/// One file per key. The first line holds the entry's TTL in seconds, the rest
/// is the body; the file's modification time is the write time.
#[derive(Debug, Clone)]
pub struct DiskCache {
    dir: PathBuf,
}

impl DiskCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.cache", key))
    }

    fn read_entry(path: &Path) -> Option<(Duration, String, bool)> {
        let content = std::fs::read_to_string(path).ok()?;
        let (header, body) = content.split_once('\n')?;
        let ttl = Duration::from_secs(header.trim().parse().ok()?);
        Some((ttl, body.to_string(), is_fresh(path, ttl)))
    }
}

impl Default for DiskCache {
    fn default() -> Self {
        Self::new(cache_dir())
    }
}

/// Check if a cached file is younger than `ttl`
fn is_fresh(path: &Path, ttl: Duration) -> bool {
    if ttl.is_zero() {
        return false;
    }

    let modified = match std::fs::metadata(path).and_then(|m| m.modified()) {
        Ok(t) => t,
        Err(_) => return false,
    };

    match SystemTime::now().duration_since(modified) {
        Ok(age) => age < ttl,
        // Modified in the future (clock skew): treat as fresh
        Err(_) => true,
    }
}

impl CacheStore for DiskCache {
    fn get(&self, key: &str) -> Option<Cached> {
        let (_, value, fresh) = Self::read_entry(&self.entry_path(key))?;
        Some(Cached { value, fresh })
    }

    fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(
            self.entry_path(key),
            format!("{}\n{}", ttl.as_secs(), value),
        )?;
        Ok(())
    }

    fn clear_expired(&self) -> Result<usize> {
        if !self.dir.exists() {
            return Ok(0);
        }

        let mut removed = 0;
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("cache") {
                continue;
            }

            let expired = match Self::read_entry(&path) {
                Some((_, _, fresh)) => !fresh,
                // Unreadable entries are garbage
                None => true,
            };
            if expired {
                std::fs::remove_file(&path)?;
                removed += 1;
            }
        }

        Ok(removed)
    }
}

/// In-process store backed by `moka`
#[derive(Clone)]
pub struct MemoryCache {
    // expiry is `None` when the TTL reaches past what `Instant` can represent
    entries: moka::sync::Cache<String, (String, Option<Instant>)>,
}

impl MemoryCache {
    pub fn new(capacity: u64) -> Self {
        Self {
            entries: moka::sync::Cache::new(capacity),
        }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl CacheStore for MemoryCache {
    fn get(&self, key: &str) -> Option<Cached> {
        self.entries.get(key).map(|(value, expires_at)| Cached {
            value,
            fresh: expires_at.is_none_or(|at| Instant::now() < at),
        })
    }

    fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        self.entries
            .insert(key.to_string(), (value.to_string(), Instant::now().checked_add(ttl)));
        Ok(())
    }

    fn clear_expired(&self) -> Result<usize> {
        let now = Instant::now();
        let expired: Vec<_> = self
            .entries
            .iter()
            .filter(|(_, (_, expires_at))| expires_at.is_some_and(|at| at <= now))
            .map(|(key, _)| key)
            .collect();

        for key in &expired {
            self.entries.invalidate(key.as_str());
        }
        Ok(expired.len())
    }
}
