//! Cache module for storing fetched URL contents on disk
//!
//! This module provides a `Cacher` that returns previously fetched content when
//! it is present and not expired, and otherwise fetches, commits and returns
//! fresh content. Expiration is derived from file modification times.

mod cacher;
mod error;
mod options;

pub use cacher::{key_for_url, CacheEntryInfo, Cacher};
pub use error::CacheError;
pub use options::{CacherOptions, RetrieveOptions};
