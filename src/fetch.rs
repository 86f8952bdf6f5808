//! HTTP fetching for cache misses
//!
//! The cache only needs one capability from the network: "fetch the bytes at a
//! URL, optionally reporting progress". [`Fetcher`] names that capability and
//! [`HttpFetcher`] provides it with a blocking `reqwest` client.

use std::io::Read;
use std::time::Duration;

use reqwest::blocking::Client;
use thiserror::Error;

use crate::progress::DownloadProgress;

/// Connection timeout applied to every request
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Size of the buffer used when streaming a response body
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Upper bound on buffer space reserved from an announced content length
const MAX_PREALLOC: u64 = 16 * 1024 * 1024;

/// Errors that can occur when fetching a URL
#[derive(Debug, Error)]
pub enum FetchError {
    /// The HTTP client could not be constructed
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// Connection failure, timeout or other transport error
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server answered with a non-success status
    #[error("HTTP request to {url} returned status {status}")]
    Status { url: String, status: u16 },

    /// The response body could not be read to the end
    #[error("Failed to read response body from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: std::io::Error,
    },
}

/// Source of content for cache misses
pub trait Fetcher {
    /// Fetches the full body at `url`
    ///
    /// When `progress` is given, it is updated as bytes arrive.
    fn fetch(&self, url: &str, progress: Option<&DownloadProgress>) -> Result<Vec<u8>, FetchError>;
}

/// Fetcher backed by a blocking HTTP client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Create a new HttpFetcher with the default connection timeout
    pub fn new() -> Result<Self, FetchError> {
        Self::with_connect_timeout(DEFAULT_CONNECT_TIMEOUT)
    }

    /// Create a new HttpFetcher with a custom connection timeout
    ///
    /// Only connecting is time-limited; a slow body is read to the end.
    pub fn with_connect_timeout(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .connect_timeout(timeout)
            .timeout(None::<Duration>)
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self { client })
    }

    /// Create a new HttpFetcher with a custom HTTP client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str, progress: Option<&DownloadProgress>) -> Result<Vec<u8>, FetchError> {
        let mut response = self.client.get(url).send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let total = response.content_length().unwrap_or(0);
        let mut body = Vec::with_capacity(total.min(MAX_PREALLOC) as usize);
        let mut chunk = [0u8; READ_CHUNK_SIZE];

        loop {
            let read = response.read(&mut chunk).map_err(|source| FetchError::Body {
                url: url.to_string(),
                source,
            })?;
            if read == 0 {
                break;
            }
            body.extend_from_slice(&chunk[..read]);

            if let Some(progress) = progress {
                progress.update(body.len() as u64, total);
            }
        }

        if let Some(progress) = progress {
            progress.update(body.len() as u64, total);
            progress.finish();
        }

        Ok(body)
    }
}
