mod web;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::error::AppError;
use crate::fetch::PageFetcher;

/// Serves canned HTML without touching the network, counting calls so tests
/// can assert the cache contract.
pub struct StubFetcher {
    html: Mutex<String>,
    fail: bool,
    favicon_exists: bool,
    fetches: AtomicUsize,
    probes: AtomicUsize,
}

impl StubFetcher {
    pub fn new(html: &str) -> Self {
        Self {
            html: Mutex::new(html.to_string()),
            fail: false,
            favicon_exists: false,
            fetches: AtomicUsize::new(0),
            probes: AtomicUsize::new(0),
        }
    }

    /// Every fetch fails as if the site were unreachable.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new("")
        }
    }

    /// The /favicon.ico probe reports success.
    pub fn with_favicon(html: &str) -> Self {
        Self {
            favicon_exists: true,
            ..Self::new(html)
        }
    }

    pub fn set_html(&self, html: &str) {
        *self.html.lock().unwrap() = html.to_string();
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }
}

impl PageFetcher for StubFetcher {
    fn fetch_page(&self, url: &str) -> Result<String, AppError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(AppError::Fetch(format!("{url}: connection refused")));
        }
        Ok(self.html.lock().unwrap().clone())
    }

    fn head_exists(&self, _url: &str) -> bool {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.favicon_exists
    }

    fn fetch_bytes(&self, _url: &str) -> Option<Vec<u8>> {
        None
    }
}
