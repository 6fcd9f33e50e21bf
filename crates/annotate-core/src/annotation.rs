//! Annotation data model and label badge geometry
//!
//! Annotations are plain value records: a rectangle in display (canvas)
//! coordinates plus a text label rendered as a colored badge to the right of
//! the box. Width/height keep the sign of the drag direction; consumers
//! normalize before drawing.

use ab_glyph::{Font, FontVec, PxScale, ScaleFont};
use serde::{Deserialize, Serialize};

/// Minimum drag extent (display units) for a rectangle to be kept.
/// Drags at or under this size are discarded silently.
pub const MIN_RECT_SIZE: f64 = 10.0;

/// Horizontal gap between the box and its label badge.
pub const BADGE_GAP: f64 = 8.0;

/// Padding added to the measured label text width.
pub const BADGE_PADDING: f64 = 10.0;

/// Label badges have a fixed height regardless of text.
pub const BADGE_HEIGHT: f64 = 24.0;

/// A labeled rectangle in display coordinates.
///
/// Field names serialize in camelCase because the list travels to the
/// caller's persistence layer alongside the flattened artifact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    /// `rect<N>`, monotonic by creation order within one session.
    pub id: String,
    pub x: f64,
    pub y: f64,
    /// Signed extent; negative when the drag went right-to-left.
    pub width: f64,
    /// Signed extent; negative when the drag went bottom-to-top.
    pub height: f64,
    /// Stroke/badge color as a hex string, e.g. "#FF0000".
    pub color: String,
    /// Empty string means no badge.
    pub label: String,
    pub badge_x: f64,
    pub badge_y: f64,
    pub label_width: f64,
    pub label_height: f64,
}

impl Annotation {
    /// Rectangle with non-negative extents (top-left anchored).
    pub fn normalized(&self) -> (f64, f64, f64, f64) {
        let x = if self.width < 0.0 { self.x + self.width } else { self.x };
        let y = if self.height < 0.0 { self.y + self.height } else { self.y };
        (x, y, self.width.abs(), self.height.abs())
    }

    /// True when the drag extent clears the minimum-size invariant.
    pub fn meets_minimum_size(&self) -> bool {
        self.width.abs() > MIN_RECT_SIZE && self.height.abs() > MIN_RECT_SIZE
    }

    /// Place the label badge to the right of the box, vertically centered,
    /// and size it from the measured text width.
    pub fn place_badge(&mut self, font_size: f64, font: Option<&LabelFont>) {
        let (x, y, w, h) = self.normalized();
        let text_width = measure_label(&self.label, font_size, font);
        self.label_width = text_width + BADGE_PADDING;
        self.label_height = BADGE_HEIGHT;
        self.badge_x = x + w + BADGE_GAP;
        self.badge_y = y + h / 2.0 - self.label_height / 2.0;
    }
}

/// Tool settings passed into the gesture handlers. Kept as an explicit value
/// object so gesture logic stays independent of any UI framework.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawingToolConfig {
    pub color: String,
    pub stroke_width: f64,
    pub font_size: f64,
}

impl Default for DrawingToolConfig {
    fn default() -> Self {
        Self {
            color: "#FF0000".to_string(),
            stroke_width: 2.0,
            font_size: 16.0,
        }
    }
}

/// A TTF/OTF font used to measure and rasterize badge labels.
pub struct LabelFont {
    font: FontVec,
}

impl LabelFont {
    pub fn from_bytes(bytes: Vec<u8>) -> Option<Self> {
        FontVec::try_from_vec(bytes).ok().map(|font| Self { font })
    }

    pub(crate) fn font(&self) -> &FontVec {
        &self.font
    }

    fn text_width(&self, text: &str, font_size: f64) -> f64 {
        let scaled = self.font.as_scaled(PxScale::from(font_size as f32));
        let mut width = 0.0f32;
        let mut prev: Option<ab_glyph::GlyphId> = None;
        for c in text.chars() {
            let id = self.font.glyph_id(c);
            if let Some(p) = prev {
                width += scaled.kern(p, id);
            }
            width += scaled.h_advance(id);
            prev = Some(id);
        }
        width as f64
    }
}

/// Measure label text width. Uses real glyph metrics when a font is
/// available, otherwise a deterministic per-character advance.
pub fn measure_label(text: &str, font_size: f64, font: Option<&LabelFont>) -> f64 {
    match font {
        Some(f) => f.text_width(text, font_size),
        None => text.chars().count() as f64 * font_size * 0.6,
    }
}

/// Parse hex color string (e.g., "#FF0000" or "FF0000") to RGB bytes.
/// Falls back to black on anything malformed. The color is caller input,
/// so parsing works on byte pairs; multi-byte characters never slice
/// mid-character.
pub fn parse_hex_color(color: &str) -> (u8, u8, u8) {
    let hex = color.trim_start_matches('#').as_bytes();
    if hex.len() < 6 || !hex[..6].iter().all(u8::is_ascii_hexdigit) {
        return (0, 0, 0);
    }
    let channel = |pair: &[u8]| {
        std::str::from_utf8(pair)
            .ok()
            .and_then(|s| u8::from_str_radix(s, 16).ok())
            .unwrap_or(0)
    };
    (channel(&hex[0..2]), channel(&hex[2..4]), channel(&hex[4..6]))
}
