//! Simple Cache Library
//!
//! A disk-backed HTTP response cache keyed by opaque strings, with time-based
//! expiration and atomic rename-based commits.

pub mod cache;
pub mod cli;
pub mod fetch;
pub mod progress;

pub use cache::{key_for_url, CacheEntryInfo, CacheError, Cacher, CacherOptions, RetrieveOptions};
pub use fetch::{FetchError, Fetcher, HttpFetcher};
