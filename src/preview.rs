use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One cached extraction result. `url` is the cache key; `id` and
/// `created_at` are assigned at creation and never change, refreshes
/// included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkPreview {
    pub id: u64,
    pub url: String,

    pub title: String,
    pub description: String,
    pub image: String,
    pub favicon: String,
    pub site_name: String,

    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct PreviewCreate {
    pub url: String,
    pub title: String,
    pub description: String,
    pub image: String,
    pub favicon: String,
    pub site_name: String,
}

/// Partial update applied on refresh. `None` fields are left alone; the url
/// key, id and created_at are not updatable.
#[derive(Debug, Clone, Default)]
pub struct PreviewUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub favicon: Option<String>,
    pub site_name: Option<String>,
}

pub trait PreviewStore: Send + Sync {
    fn get(&self, url: &str) -> Option<LinkPreview>;
    fn get_by_id(&self, id: u64) -> Option<LinkPreview>;
    fn create(&self, preview: PreviewCreate) -> LinkPreview;
    fn update(&self, id: u64, update: PreviewUpdate) -> Option<LinkPreview>;
}
