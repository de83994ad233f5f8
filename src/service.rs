use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use url::Url;

use crate::error::AppError;
use crate::extract::{self, PageMetadata};
use crate::fetch::PageFetcher;
use crate::preview::{LinkPreview, PreviewCreate, PreviewStore, PreviewUpdate};

/// Orchestrates the preview pipeline: cache check, fetch, extract, favicon
/// probe, write-back. Holds the store and fetcher by handle so tests can
/// inject both.
pub struct PreviewService {
    store: Arc<dyn PreviewStore>,
    fetcher: Arc<dyn PageFetcher>,

    // per-URL gates so concurrent requests for the same uncached URL share
    // one fetch instead of racing to overwrite each other
    inflight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

/// Reject anything that is not a well-formed http(s) URL before any I/O.
pub fn validate_url(url: &str) -> Result<(), AppError> {
    match Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(()),
        _ => Err(AppError::Validation("Please enter a valid URL".to_string())),
    }
}

impl PreviewService {
    pub fn new(store: Arc<dyn PreviewStore>, fetcher: Arc<dyn PageFetcher>) -> Self {
        Self {
            store,
            fetcher,
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Serve from cache, or fetch + extract + write back.
    ///
    /// The cache-hit fast path takes no gate and does no I/O. On a miss (or
    /// forced refresh) the per-URL gate serializes work so only one request
    /// fetches; waiters find the fresh record on the re-check. An existing
    /// record keeps its id and created_at through a refresh; last write wins.
    pub fn get_or_fetch(&self, url: &str, force_refresh: bool) -> Result<LinkPreview, AppError> {
        validate_url(url)?;

        if !force_refresh {
            if let Some(preview) = self.store.get(url) {
                log::debug!("{url}: cache hit");
                return Ok(preview);
            }
        }

        let gate = self.gate(url);
        let result = {
            let _guard = gate.lock().unwrap();

            let cached = if force_refresh { None } else { self.store.get(url) };
            match cached {
                Some(preview) => Ok(preview),
                None => self.refresh(url),
            }
        };
        self.release(url, &gate);

        result
    }

    fn refresh(&self, url: &str) -> Result<LinkPreview, AppError> {
        let html = self.fetcher.fetch_page(url)?;
        let mut meta = extract::extract(url, &html);

        if meta.favicon.is_empty() {
            self.probe_favicon(url, &mut meta);
        }

        let preview = match self.store.get(url) {
            Some(existing) => {
                log::debug!("{url}: refreshing existing preview #{}", existing.id);
                let update = PreviewUpdate {
                    title: Some(meta.title),
                    description: Some(meta.description),
                    image: Some(meta.image),
                    favicon: Some(meta.favicon),
                    site_name: Some(meta.site_name),
                };
                self.store.update(existing.id, update).ok_or_else(|| {
                    AppError::Other(anyhow!("preview #{} vanished mid-refresh", existing.id))
                })?
            }
            None => self.store.create(PreviewCreate {
                url: url.to_string(),
                title: meta.title,
                description: meta.description,
                image: meta.image,
                favicon: meta.favicon,
                site_name: meta.site_name,
            }),
        };

        Ok(preview)
    }

    /// Probe /favicon.ico on the page origin when no icon tag was found.
    /// Probe failure leaves the favicon empty.
    fn probe_favicon(&self, url: &str, meta: &mut PageMetadata) {
        let parsed = match Url::parse(url) {
            Ok(u) => u,
            Err(_) => return,
        };

        let probe = match parsed.join("/favicon.ico") {
            Ok(u) => u,
            Err(_) => return,
        };

        if self.fetcher.head_exists(probe.as_str()) {
            log::debug!("{url}: using /favicon.ico fallback");
            meta.favicon = probe.to_string();
        }
    }

    fn gate(&self, url: &str) -> Arc<Mutex<()>> {
        let mut inflight = self.inflight.lock().unwrap();
        inflight.entry(url.to_string()).or_default().clone()
    }

    fn release(&self, url: &str, gate: &Arc<Mutex<()>>) {
        let mut inflight = self.inflight.lock().unwrap();
        // two handles left means ours and the map's: nobody else is waiting
        if Arc::strong_count(gate) <= 2 {
            inflight.remove(url);
        }
    }
}
