//! Disk-backed cache of fetched URL contents
//!
//! Each entry is a single file named after its key inside the cache directory.
//! Freshness comes from the file's modification time; there is no index and no
//! metadata sidecar. New content is written to `<key>.tmp` and renamed into
//! place, so a reader never sees a half-written entry.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use log::{debug, trace};
use serde::Serialize;

use super::error::CacheError;
use super::options::{CacherOptions, RetrieveOptions};
use crate::fetch::{Fetcher, HttpFetcher};
use crate::progress::DownloadProgress;

/// Suffix of in-flight downloads; such files are never cache entries
const TMP_SUFFIX: &str = ".tmp";

/// Description of a committed cache entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheEntryInfo {
    /// Cache key (also the file name)
    pub key: String,
    /// Size of the cached content in bytes
    pub size: u64,
    /// When the content was last written
    pub modified: DateTime<Utc>,
}

/// Returns the cache key derived from a URL: the hex MD5 digest of the URL
pub fn key_for_url(url: &str) -> String {
    format!("{:x}", md5::compute(url))
}

/// Maps cache keys to fetched content stored on disk
///
/// Lookups are synchronous and unlocked. Two cachers sharing a directory may
/// race on the same key; readers stay safe because entries only appear via
/// rename.
#[derive(Debug)]
pub struct Cacher<F = HttpFetcher> {
    /// Absolute directory holding the cache files
    cache_dir: PathBuf,
    store_urls: bool,
    /// Last URL fetched per key, only filled when `store_urls` is set
    urls: HashMap<String, String>,
    fetcher: F,
}

impl Cacher<HttpFetcher> {
    /// Creates a cacher over `cache_dir` that fetches over HTTP
    ///
    /// The directory and any missing ancestors are created. Existing contents
    /// are left untouched.
    pub fn new(cache_dir: impl AsRef<Path>, options: CacherOptions) -> Result<Self, CacheError> {
        let fetcher = HttpFetcher::new().map_err(CacheError::HttpClient)?;
        Self::with_fetcher(cache_dir, options, fetcher)
    }
}

impl<F: Fetcher> Cacher<F> {
    /// Creates a cacher over `cache_dir` that fills misses through `fetcher`
    pub fn with_fetcher(
        cache_dir: impl AsRef<Path>,
        options: CacherOptions,
        fetcher: F,
    ) -> Result<Self, CacheError> {
        let cache_dir = absolute_dir(cache_dir.as_ref())?;
        create_dir(&cache_dir)?;
        debug!("Using cache directory {}", cache_dir.display());

        Ok(Self {
            cache_dir,
            store_urls: options.store_urls,
            urls: HashMap::new(),
            fetcher,
        })
    }

    /// Returns the content for `key`, fetching it from `url` when needed
    ///
    /// # Behavior
    /// - A fresh cached entry is returned as-is
    /// - An expired entry is deleted and fetched again, once
    /// - A missing entry is fetched and committed
    ///
    /// An absent or empty `url` falls back to the URL remembered for `key`
    /// when `store_urls` is enabled. If a fetch or refresh is needed and no URL
    /// is known, [`CacheError::NoUrl`] or [`CacheError::RefreshWithoutUrl`] is
    /// returned.
    ///
    /// `key` is used verbatim as a file name: it must not contain path
    /// separators or `..`, and must not end in `.tmp`. Such a key is hidden
    /// from [`entries`](Self::entries) and shares its file with the in-flight
    /// download of the key without the suffix.
    pub fn retrieve(
        &mut self,
        url: Option<&str>,
        key: &str,
        options: RetrieveOptions,
    ) -> Result<Vec<u8>, CacheError> {
        let url = match url.filter(|url| !url.is_empty()) {
            Some(url) => Some(url.to_string()),
            None => self.stored_url(key).map(str::to_string),
        };

        if self.contains(key) {
            if !self.is_expired(key, &options)? {
                trace!("Cache hit for key '{}'", key);
                return self.read_entry(key);
            }

            let Some(url) = url else {
                return Err(CacheError::RefreshWithoutUrl {
                    key: key.to_string(),
                });
            };
            debug!("Cache for key '{}' expired, refreshing from {}", key, url);
            self.remove_file(key)?;
            return self.fetch_to_cache(&url, key, &options);
        }

        match url {
            Some(url) => {
                debug!("Cache miss for key '{}', fetching {}", key, url);
                self.fetch_to_cache(&url, key, &options)
            }
            None => Err(CacheError::NoUrl {
                key: key.to_string(),
            }),
        }
    }

    /// Returns the content for `key` without supplying a URL
    ///
    /// Only an existing entry can be served. Refreshing an expired entry needs
    /// `store_urls` and a previous fetch under this key by the same cacher.
    pub fn retrieve_by_key(
        &mut self,
        key: &str,
        options: RetrieveOptions,
    ) -> Result<Vec<u8>, CacheError> {
        self.retrieve(None, key, options)
    }

    /// Returns the content at `url`, keyed by [`key_for_url`]
    pub fn retrieve_by_url(
        &mut self,
        url: &str,
        options: RetrieveOptions,
    ) -> Result<Vec<u8>, CacheError> {
        let key = key_for_url(url);
        self.retrieve(Some(url), &key, options)
    }

    /// Removes every cache file and forgets all stored URLs
    ///
    /// The directory itself is recreated empty.
    pub fn clear(&mut self) -> Result<(), CacheError> {
        match fs::remove_dir_all(&self.cache_dir) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(CacheError::filesystem(&self.cache_dir, e)),
        }
        create_dir(&self.cache_dir)?;
        self.urls.clear();
        debug!("Cleared cache directory {}", self.cache_dir.display());
        Ok(())
    }

    /// Removes a single entry and its stored URL; a missing entry is not an error
    pub fn remove(&mut self, key: &str) -> Result<(), CacheError> {
        self.remove_file(key)?;
        self.urls.remove(key);
        Ok(())
    }

    /// Whether a committed entry exists for `key`
    pub fn contains(&self, key: &str) -> bool {
        self.cache_path(key).is_file()
    }

    /// Lists committed entries sorted by key
    ///
    /// In-flight `.tmp` files and subdirectories are skipped.
    pub fn entries(&self) -> Result<Vec<CacheEntryInfo>, CacheError> {
        let read_dir =
            fs::read_dir(&self.cache_dir).map_err(|e| CacheError::filesystem(&self.cache_dir, e))?;

        let mut entries = Vec::new();
        for dir_entry in read_dir {
            let dir_entry = dir_entry.map_err(|e| CacheError::filesystem(&self.cache_dir, e))?;
            let path = dir_entry.path();
            let Some(key) = dir_entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if key.ends_with(TMP_SUFFIX) {
                continue;
            }

            let metadata = dir_entry
                .metadata()
                .map_err(|e| CacheError::filesystem(&path, e))?;
            if !metadata.is_file() {
                continue;
            }
            let modified = metadata
                .modified()
                .map_err(|e| CacheError::filesystem(&path, e))?;

            entries.push(CacheEntryInfo {
                key,
                size: metadata.len(),
                modified: DateTime::<Utc>::from(modified),
            });
        }

        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(entries)
    }

    /// URL remembered for `key`, if `store_urls` is enabled and it was fetched
    pub fn stored_url(&self, key: &str) -> Option<&str> {
        self.urls.get(key).map(String::as_str)
    }

    /// Absolute path of the cache directory
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Path of the cache file for `key`
    pub fn cache_path(&self, key: &str) -> PathBuf {
        self.cache_dir.join(key)
    }

    #[cfg(test)]
    fn fetcher(&self) -> &F {
        &self.fetcher
    }

    fn tmp_path(&self, key: &str) -> PathBuf {
        self.cache_dir.join(format!("{}{}", key, TMP_SUFFIX))
    }

    fn is_expired(&self, key: &str, options: &RetrieveOptions) -> Result<bool, CacheError> {
        let Some(expiration) = options.expiration else {
            return Ok(false);
        };

        let path = self.cache_path(key);
        let modified = fs::metadata(&path)
            .and_then(|metadata| metadata.modified())
            .map_err(|e| CacheError::filesystem(&path, e))?;

        // A modification time in the future counts as age zero
        let age = SystemTime::now()
            .duration_since(modified)
            .unwrap_or_default();
        Ok(age > expiration)
    }

    fn read_entry(&self, key: &str) -> Result<Vec<u8>, CacheError> {
        let path = self.cache_path(key);
        fs::read(&path).map_err(|e| CacheError::filesystem(&path, e))
    }

    fn remove_file(&self, key: &str) -> Result<(), CacheError> {
        let path = self.cache_path(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::filesystem(&path, e)),
        }
    }

    /// Fetches `url`, commits it under `key` and returns the fetched bytes
    fn fetch_to_cache(
        &mut self,
        url: &str,
        key: &str,
        options: &RetrieveOptions,
    ) -> Result<Vec<u8>, CacheError> {
        let progress = options.show_progress.then(DownloadProgress::stderr);
        let body = self.fetcher.fetch(url, progress.as_ref())?;

        let tmp_path = self.tmp_path(key);
        fs::write(&tmp_path, &body).map_err(|e| CacheError::filesystem(&tmp_path, e))?;

        let cache_path = self.cache_path(key);
        fs::rename(&tmp_path, &cache_path).map_err(|e| CacheError::filesystem(&cache_path, e))?;
        debug!("Committed {} bytes for key '{}'", body.len(), key);

        if self.store_urls {
            self.urls.insert(key.to_string(), url.to_string());
        }

        Ok(body)
    }
}

/// Expands a leading `~` and makes `path` absolute
fn absolute_dir(path: &Path) -> Result<PathBuf, CacheError> {
    let path_str = path.to_string_lossy();

    let expanded = match std::env::var_os("HOME") {
        Some(home) if path_str == "~" => PathBuf::from(home),
        Some(home) if path_str.starts_with("~/") => PathBuf::from(home).join(&path_str[2..]),
        _ => path.to_path_buf(),
    };

    if expanded.is_absolute() {
        return Ok(expanded);
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(&expanded))
        .map_err(|source| CacheError::DirectoryCreation {
            path: expanded,
            source,
        })
}

fn create_dir(path: &Path) -> Result<(), CacheError> {
    fs::create_dir_all(path).map_err(|source| CacheError::DirectoryCreation {
        path: path.to_path_buf(),
        source,
    })
}
