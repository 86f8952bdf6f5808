use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::fetch::FetchError;

/// Errors that can occur when reading from or filling the cache
#[derive(Debug, Error)]
pub enum CacheError {
    /// The cache directory could not be created
    #[error("Failed to create cache directory {}: {source}", .path.display())]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The HTTP client backing the cacher could not be built
    #[error("Failed to set up HTTP client: {0}")]
    HttpClient(#[source] FetchError),

    /// Nothing is cached for the key and no URL was supplied or remembered
    #[error("No valid cache for key '{key}' and no URL to fetch")]
    NoUrl { key: String },

    /// The cached entry expired and no URL is known to refresh it
    #[error("Cache for key '{key}' expired and no URL is known to refresh it")]
    RefreshWithoutUrl { key: String },

    /// Fetching the URL failed
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Reading, writing, renaming or removing a cache file failed
    #[error("Filesystem error at {}: {source}", .path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl CacheError {
    /// Whether the operation failed because no URL was known for the key
    pub fn is_missing_url(&self) -> bool {
        matches!(self, Self::NoUrl { .. } | Self::RefreshWithoutUrl { .. })
    }

    pub(crate) fn filesystem(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }
}
