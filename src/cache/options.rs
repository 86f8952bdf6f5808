//! Options for constructing a cacher and for individual retrievals

use std::time::Duration;

/// Options fixed when a [`Cacher`](super::Cacher) is constructed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacherOptions {
    /// Remember the URL fetched for each key so expired entries can later be
    /// refreshed from the key alone
    pub store_urls: bool,
}

impl CacherOptions {
    pub fn store_urls(mut self, store_urls: bool) -> Self {
        self.store_urls = store_urls;
        self
    }
}

/// Options for a single retrieval
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetrieveOptions {
    /// Draw a progress bar on stderr while downloading
    pub show_progress: bool,
    /// Maximum age of a cached entry; `None` means entries never expire
    pub expiration: Option<Duration>,
}

impl RetrieveOptions {
    pub fn show_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn expiration(mut self, expiration: Duration) -> Self {
        self.expiration = Some(expiration);
        self
    }

    /// Sets the expiration in whole seconds
    pub fn expiration_secs(self, secs: u64) -> Self {
        self.expiration(Duration::from_secs(secs))
    }
}
