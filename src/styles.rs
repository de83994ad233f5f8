use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    Horizontal,
    Vertical,
    Compact,
}

/// A named set of card rendering parameters. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewStyle {
    pub id: u64,
    pub name: String,

    pub border_radius: String,
    pub border_color: String,
    pub background_color: String,
    pub text_color: String,
    pub accent_color: String,

    pub show_image: bool,
    pub show_favicon: bool,
    pub layout: Layout,

    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleCreate {
    pub name: String,

    pub border_radius: String,
    pub border_color: String,
    pub background_color: String,
    pub text_color: String,
    pub accent_color: String,

    pub show_image: bool,
    pub show_favicon: bool,
    pub layout: Layout,
}

static HEX_COLOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6}|[0-9a-fA-F]{8})$")
        .expect("Failed to compile hex color regex")
});

static CSS_PX_LENGTH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d+(?:\.\d+)?px$").expect("Failed to compile css length regex")
});

impl StyleCreate {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::Validation(
                "Style name must not be empty".to_string(),
            ));
        }

        for (field, value) in [
            ("borderColor", &self.border_color),
            ("backgroundColor", &self.background_color),
            ("textColor", &self.text_color),
            ("accentColor", &self.accent_color),
        ] {
            if !HEX_COLOR.is_match(value) {
                return Err(AppError::Validation(format!(
                    "{field} must be a hex color like #3b82f6"
                )));
            }
        }

        if !CSS_PX_LENGTH.is_match(&self.border_radius) {
            return Err(AppError::Validation(
                "borderRadius must be a pixel length like 12px".to_string(),
            ));
        }

        Ok(())
    }
}

pub trait StyleStore: Send + Sync {
    fn style(&self, id: u64) -> Option<PreviewStyle>;
    fn styles(&self) -> Vec<PreviewStyle>;
    fn create_style(&self, style: StyleCreate) -> PreviewStyle;
}

/// The built-in catalog seeded into every store, in id order.
pub fn default_styles() -> Vec<StyleCreate> {
    vec![
        StyleCreate {
            name: "Default".to_string(),
            border_radius: "12px".to_string(),
            border_color: "#e5e7eb".to_string(),
            background_color: "#ffffff".to_string(),
            text_color: "#111827".to_string(),
            accent_color: "#3b82f6".to_string(),
            show_image: true,
            show_favicon: true,
            layout: Layout::Horizontal,
        },
        StyleCreate {
            name: "Dark".to_string(),
            border_radius: "8px".to_string(),
            border_color: "#374151".to_string(),
            background_color: "#1f2937".to_string(),
            text_color: "#f9fafb".to_string(),
            accent_color: "#60a5fa".to_string(),
            show_image: true,
            show_favicon: true,
            layout: Layout::Horizontal,
        },
        StyleCreate {
            name: "Minimal".to_string(),
            border_radius: "4px".to_string(),
            border_color: "#d1d5db".to_string(),
            background_color: "#ffffff".to_string(),
            text_color: "#374151".to_string(),
            accent_color: "#6b7280".to_string(),
            show_image: false,
            show_favicon: true,
            layout: Layout::Compact,
        },
        StyleCreate {
            name: "Card".to_string(),
            border_radius: "16px".to_string(),
            border_color: "#e5e7eb".to_string(),
            background_color: "#f9fafb".to_string(),
            text_color: "#111827".to_string(),
            accent_color: "#10b981".to_string(),
            show_image: true,
            show_favicon: true,
            layout: Layout::Vertical,
        },
    ]
}
