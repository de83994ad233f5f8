use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use chrono::Utc;

use crate::preview::{LinkPreview, PreviewCreate, PreviewStore, PreviewUpdate};
use crate::styles::{self, PreviewStyle, StyleCreate, StyleStore};

/// Process-lifetime store for previews and styles. No TTL, no eviction, no
/// size bound; previews are keyed by exact URL string. Constructed once at
/// startup and passed around by handle.
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

struct Inner {
    previews: HashMap<String, LinkPreview>,
    styles: BTreeMap<u64, PreviewStyle>,
    next_preview_id: u64,
    next_style_id: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        let store = Self {
            inner: RwLock::new(Inner {
                previews: HashMap::new(),
                styles: BTreeMap::new(),
                next_preview_id: 1,
                next_style_id: 1,
            }),
        };

        for style in styles::default_styles() {
            store.create_style(style);
        }

        store
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PreviewStore for MemoryStore {
    fn get(&self, url: &str) -> Option<LinkPreview> {
        let inner = self.inner.read().unwrap();
        inner.previews.get(url).cloned()
    }

    fn get_by_id(&self, id: u64) -> Option<LinkPreview> {
        let inner = self.inner.read().unwrap();
        inner.previews.values().find(|p| p.id == id).cloned()
    }

    fn create(&self, preview: PreviewCreate) -> LinkPreview {
        let mut inner = self.inner.write().unwrap();

        let id = inner.next_preview_id;
        inner.next_preview_id += 1;

        let record = LinkPreview {
            id,
            url: preview.url.clone(),
            title: preview.title,
            description: preview.description,
            image: preview.image,
            favicon: preview.favicon,
            site_name: preview.site_name,
            created_at: Utc::now(),
        };

        inner.previews.insert(preview.url, record.clone());
        record
    }

    fn update(&self, id: u64, update: PreviewUpdate) -> Option<LinkPreview> {
        let mut inner = self.inner.write().unwrap();

        // linear scan; the store holds one entry per distinct URL
        let url = inner.previews.values().find(|p| p.id == id)?.url.clone();
        let record = inner.previews.get_mut(&url)?;

        if let Some(title) = update.title {
            record.title = title;
        }
        if let Some(description) = update.description {
            record.description = description;
        }
        if let Some(image) = update.image {
            record.image = image;
        }
        if let Some(favicon) = update.favicon {
            record.favicon = favicon;
        }
        if let Some(site_name) = update.site_name {
            record.site_name = site_name;
        }

        Some(record.clone())
    }
}

impl StyleStore for MemoryStore {
    fn style(&self, id: u64) -> Option<PreviewStyle> {
        let inner = self.inner.read().unwrap();
        inner.styles.get(&id).cloned()
    }

    fn styles(&self) -> Vec<PreviewStyle> {
        let inner = self.inner.read().unwrap();
        inner.styles.values().cloned().collect()
    }

    fn create_style(&self, style: StyleCreate) -> PreviewStyle {
        let mut inner = self.inner.write().unwrap();

        let id = inner.next_style_id;
        inner.next_style_id += 1;

        let record = PreviewStyle {
            id,
            name: style.name,
            border_radius: style.border_radius,
            border_color: style.border_color,
            background_color: style.background_color,
            text_color: style.text_color,
            accent_color: style.accent_color,
            show_image: style.show_image,
            show_favicon: style.show_favicon,
            layout: style.layout,
            created_at: Utc::now(),
        };

        inner.styles.insert(id, record.clone());
        record
    }
}
