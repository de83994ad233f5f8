//! Raster rendering of preview cards for export.
//!
//! The card is composed directly as pixels: style colors, a border frame, the
//! layout's image region, and placeholder bars standing in for text runs.
//! Encoding goes through `image` for png/jpeg and the `webp` encoder for webp.

use std::io::Cursor;

use image::{imageops, DynamicImage, ImageFormat, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::styles::{Layout, PreviewStyle};

pub const MIN_WIDTH: u32 = 200;
pub const MAX_WIDTH: u32 = 2000;
pub const MIN_HEIGHT: u32 = 100;
pub const MAX_HEIGHT: u32 = 1000;
pub const MIN_QUALITY: f32 = 0.1;
pub const MAX_QUALITY: f32 = 1.0;

const DEFAULT_WIDTH: u32 = 800;
const DEFAULT_HEIGHT: u32 = 400;
const DEFAULT_QUALITY: f32 = 0.9;

/// Image column width in horizontal layout
const IMAGE_COLUMN: u32 = 192;
/// Favicon square edge
const FAVICON_SIZE: u32 = 16;
const PADDING: u32 = 20;

/// Neutral block shown where an image failed to load
const PLACEHOLDER: Rgba<u8> = Rgba([0xf3, 0xf4, 0xf6, 0xff]);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Png,
    Jpeg,
    Webp,
}

impl ExportFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Png => "image/png",
            ExportFormat::Jpeg => "image/jpeg",
            ExportFormat::Webp => "image/webp",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Jpeg => "jpeg",
            ExportFormat::Webp => "webp",
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ExportOptions {
    #[serde(default)]
    pub format: ExportFormat,

    #[serde(default = "default_width")]
    pub width: u32,

    #[serde(default = "default_height")]
    pub height: u32,

    #[serde(default = "default_quality")]
    pub quality: f32,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            format: ExportFormat::Png,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            quality: DEFAULT_QUALITY,
        }
    }
}

fn default_width() -> u32 {
    DEFAULT_WIDTH
}

fn default_height() -> u32 {
    DEFAULT_HEIGHT
}

fn default_quality() -> f32 {
    DEFAULT_QUALITY
}

impl ExportOptions {
    pub fn validate(&self) -> Result<(), AppError> {
        if !(MIN_WIDTH..=MAX_WIDTH).contains(&self.width) {
            return Err(AppError::Validation(format!(
                "width must be between {MIN_WIDTH} and {MAX_WIDTH}"
            )));
        }

        if !(MIN_HEIGHT..=MAX_HEIGHT).contains(&self.height) {
            return Err(AppError::Validation(format!(
                "height must be between {MIN_HEIGHT} and {MAX_HEIGHT}"
            )));
        }

        if !(MIN_QUALITY..=MAX_QUALITY).contains(&self.quality) {
            return Err(AppError::Validation(format!(
                "quality must be between {MIN_QUALITY} and {MAX_QUALITY}"
            )));
        }

        Ok(())
    }
}

/// Parse `#rgb`, `#rrggbb` or `#rrggbbaa`.
fn parse_hex_color(value: &str) -> Option<Rgba<u8>> {
    let hex = value.strip_prefix('#')?;

    match hex.len() {
        3 => {
            let mut channels = [0u8; 3];
            for (i, c) in hex.chars().enumerate() {
                let v = c.to_digit(16)? as u8;
                channels[i] = v << 4 | v;
            }
            Some(Rgba([channels[0], channels[1], channels[2], 0xff]))
        }
        6 | 8 => {
            let mut channels = [0u8, 0, 0, 0xff];
            for i in 0..hex.len() / 2 {
                channels[i] = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).ok()?;
            }
            Some(Rgba(channels))
        }
        _ => None,
    }
}

fn color_or(value: &str, fallback: Rgba<u8>) -> Rgba<u8> {
    parse_hex_color(value).unwrap_or(fallback)
}

fn fill_rect(canvas: &mut RgbaImage, x: u32, y: u32, w: u32, h: u32, color: Rgba<u8>) {
    let x_end = (x + w).min(canvas.width());
    let y_end = (y + h).min(canvas.height());
    for py in y..y_end {
        for px in x..x_end {
            canvas.put_pixel(px, py, color);
        }
    }
}

fn stroke_border(canvas: &mut RgbaImage, thickness: u32, color: Rgba<u8>) {
    let (w, h) = canvas.dimensions();
    fill_rect(canvas, 0, 0, w, thickness, color);
    fill_rect(canvas, 0, h.saturating_sub(thickness), w, thickness, color);
    fill_rect(canvas, 0, 0, thickness, h, color);
    fill_rect(canvas, w.saturating_sub(thickness), 0, thickness, h, color);
}

/// Mix `over` onto `base` at the given opacity.
fn blend(base: Rgba<u8>, over: Rgba<u8>, opacity: f32) -> Rgba<u8> {
    let mix = |b: u8, o: u8| -> u8 {
        (b as f32 * (1.0 - opacity) + o as f32 * opacity).round() as u8
    };
    Rgba([
        mix(base.0[0], over.0[0]),
        mix(base.0[1], over.0[1]),
        mix(base.0[2], over.0[2]),
        0xff,
    ])
}

fn draw_image_region(
    canvas: &mut RgbaImage,
    x: u32,
    y: u32,
    w: u32,
    h: u32,
    bytes: Option<&[u8]>,
) {
    if w == 0 || h == 0 {
        return;
    }

    let decoded = bytes.and_then(|b| image::load_from_memory(b).ok());
    match decoded {
        Some(img) => {
            let fitted = img
                .resize_to_fill(w, h, imageops::FilterType::Lanczos3)
                .to_rgba8();
            imageops::overlay(canvas, &fitted, x as i64, y as i64);
        }
        None => fill_rect(canvas, x, y, w, h, PLACEHOLDER),
    }
}

/// Compose the card bitmap for one preview + style at the requested size.
///
/// `image_bytes`/`favicon_bytes` are the already-fetched remote images; either
/// may be None, which degrades to placeholder blocks. Text runs are drawn as
/// bars (title in the text color, description dimmed, the URL line in the
/// accent color); `border_radius` is accepted but not rasterized.
pub fn render_card(
    style: &PreviewStyle,
    opts: ExportOptions,
    image_bytes: Option<&[u8]>,
    favicon_bytes: Option<&[u8]>,
) -> RgbaImage {
    let (w, h) = (opts.width, opts.height);

    let background = color_or(&style.background_color, Rgba([0xff, 0xff, 0xff, 0xff]));
    let border = color_or(&style.border_color, Rgba([0xe5, 0xe7, 0xeb, 0xff]));
    let text = color_or(&style.text_color, Rgba([0x11, 0x18, 0x27, 0xff]));
    let accent = color_or(&style.accent_color, Rgba([0x3b, 0x82, 0xf6, 0xff]));

    let mut canvas = RgbaImage::from_pixel(w, h, background);

    // layout-dependent image region; text occupies the rest
    let (text_x, text_y) = match style.layout {
        Layout::Horizontal if style.show_image => {
            let column = IMAGE_COLUMN.min(w / 3);
            draw_image_region(&mut canvas, 0, 0, column, h, image_bytes);
            (column + PADDING, PADDING)
        }
        Layout::Vertical if style.show_image => {
            draw_image_region(&mut canvas, 0, 0, w, h / 2, image_bytes);
            (PADDING, h / 2 + PADDING)
        }
        _ => (PADDING, PADDING),
    };

    let text_w = w.saturating_sub(text_x + PADDING);
    let mut cursor_y = text_y;

    // favicon + site row
    if style.show_favicon {
        match favicon_bytes.and_then(|b| image::load_from_memory(b).ok()) {
            Some(icon) => {
                let fitted = icon
                    .resize_to_fill(FAVICON_SIZE, FAVICON_SIZE, imageops::FilterType::Lanczos3)
                    .to_rgba8();
                imageops::overlay(&mut canvas, &fitted, text_x as i64, cursor_y as i64);
            }
            None => fill_rect(&mut canvas, text_x, cursor_y, FAVICON_SIZE, FAVICON_SIZE, accent),
        }
        let site_bar = blend(background, text, 0.5);
        fill_rect(
            &mut canvas,
            text_x + FAVICON_SIZE + 8,
            cursor_y + 4,
            text_w / 4,
            8,
            site_bar,
        );
        cursor_y += FAVICON_SIZE + 12;
    }

    // title
    if cursor_y + 14 < h {
        fill_rect(&mut canvas, text_x, cursor_y, text_w * 3 / 5, 14, text);
        cursor_y += 14 + 10;
    }

    // description lines
    let dim = blend(background, text, 0.4);
    for width_pct in [90u32, 85, 70] {
        if cursor_y + 8 + PADDING >= h {
            break;
        }
        fill_rect(&mut canvas, text_x, cursor_y, text_w * width_pct / 100, 8, dim);
        cursor_y += 8 + 6;
    }

    // url line
    if cursor_y + 8 + PADDING < h {
        fill_rect(&mut canvas, text_x, h - PADDING - 8, text_w * 2 / 5, 8, accent);
    }

    stroke_border(&mut canvas, 2, border);

    canvas
}

/// Encode the rendered card in the requested format. Quality applies to jpeg
/// and webp; png is lossless.
pub fn encode(canvas: &RgbaImage, opts: ExportOptions) -> Result<Vec<u8>, AppError> {
    let mut buf = Vec::new();

    match opts.format {
        ExportFormat::Png => {
            let mut cursor = Cursor::new(&mut buf);
            canvas
                .write_to(&mut cursor, ImageFormat::Png)
                .map_err(|err| AppError::Other(err.into()))?;
        }
        ExportFormat::Jpeg => {
            // jpeg has no alpha channel
            let rgb = DynamicImage::ImageRgba8(canvas.clone()).to_rgb8();
            let quality = (opts.quality * 100.0).round().clamp(1.0, 100.0) as u8;
            let mut cursor = Cursor::new(&mut buf);
            let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut cursor, quality);
            rgb.write_with_encoder(encoder)
                .map_err(|err| AppError::Other(err.into()))?;
        }
        ExportFormat::Webp => {
            let (w, h) = canvas.dimensions();
            let encoder = webp::Encoder::from_rgba(canvas, w, h);
            buf = encoder.encode(opts.quality * 100.0).to_vec();
        }
    }

    Ok(buf)
}
