//! Coordinate transformation between pointer, canvas, and source spaces
//!
//! Three spaces are involved: raw pointer/device coordinates, canvas
//! coordinates after pan+zoom (where annotations are stored), and the source
//! asset's native space (image pixel grid, or PDF point grid with the Y axis
//! flipped).

use crate::annotation::Annotation;

/// Minimum viewport zoom scale.
pub const MIN_SCALE: f64 = 0.1;
/// Maximum viewport zoom scale.
pub const MAX_SCALE: f64 = 5.0;
/// Multiplier applied per wheel tick.
pub const ZOOM_STEP: f64 = 1.05;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Pan/zoom state of the editor viewport. Annotations are stored in
/// pre-transform canvas coordinates; the viewport applies only at
/// render/input time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub scale: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            scale: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }
}

/// Convert a pointer position to canvas coordinates by inverting the
/// viewport transform: `canvas = (pointer - offset) / scale`.
pub fn to_canvas_point(pointer: Point, viewport: &Viewport) -> Point {
    Point {
        x: (pointer.x - viewport.offset_x) / viewport.scale,
        y: (pointer.y - viewport.offset_y) / viewport.scale,
    }
}

/// Forward transform: canvas coordinates to pointer/screen coordinates.
pub fn to_screen_point(canvas: Point, viewport: &Viewport) -> Point {
    Point {
        x: canvas.x * viewport.scale + viewport.offset_x,
        y: canvas.y * viewport.scale + viewport.offset_y,
    }
}

/// Largest scale <= 1.0 such that the asset plus symmetric padding fits the
/// container, centered. Never upscales. A container with a non-positive
/// dimension (layout not measured yet) yields the identity viewport; the
/// caller re-fits once a size is available.
pub fn fit_to_container(
    asset_width: f64,
    asset_height: f64,
    container_width: f64,
    container_height: f64,
    padding: f64,
) -> Viewport {
    if container_width <= 0.0 || container_height <= 0.0 {
        return Viewport::default();
    }
    let avail_w = (container_width - 2.0 * padding).max(1.0);
    let avail_h = (container_height - 2.0 * padding).max(1.0);
    let scale = (avail_w / asset_width)
        .min(avail_h / asset_height)
        .min(1.0);
    Viewport {
        scale,
        offset_x: (container_width - asset_width * scale) / 2.0,
        offset_y: (container_height - asset_height * scale) / 2.0,
    }
}

/// Recompute the pan offset so the canvas point under `pointer` stays
/// stationary while the scale changes. The new scale is clamped to
/// `[MIN_SCALE, MAX_SCALE]`.
pub fn zoom_at(pointer: Point, viewport: &Viewport, new_scale: f64) -> Viewport {
    let new_scale = new_scale.clamp(MIN_SCALE, MAX_SCALE);
    let anchor = to_canvas_point(pointer, viewport);
    Viewport {
        scale: new_scale,
        offset_x: pointer.x - anchor.x * new_scale,
        offset_y: pointer.y - anchor.y * new_scale,
    }
}

/// One wheel tick: multiply or divide the scale by `ZOOM_STEP`, anchored at
/// the pointer.
pub fn wheel_zoom(pointer: Point, viewport: &Viewport, zoom_in: bool) -> Viewport {
    let new_scale = if zoom_in {
        viewport.scale * ZOOM_STEP
    } else {
        viewport.scale / ZOOM_STEP
    };
    zoom_at(pointer, viewport, new_scale)
}

/// Scale an annotation from the size at which the asset was displayed to the
/// asset's native resolution. Applied uniformly to the rect, badge, stroke
/// width, and font size at export time.
pub fn to_source_space(
    annotation: &Annotation,
    display_size: (f64, f64),
    source_size: (f64, f64),
) -> Annotation {
    let sx = source_size.0 / display_size.0;
    let sy = source_size.1 / display_size.1;
    Annotation {
        id: annotation.id.clone(),
        x: annotation.x * sx,
        y: annotation.y * sy,
        width: annotation.width * sx,
        height: annotation.height * sy,
        color: annotation.color.clone(),
        label: annotation.label.clone(),
        badge_x: annotation.badge_x * sx,
        badge_y: annotation.badge_y * sy,
        label_width: annotation.label_width * sx,
        label_height: annotation.label_height * sy,
    }
}

/// Uniform scale factor for stroke width / font size at export time.
pub fn source_scale(display_size: (f64, f64), source_size: (f64, f64)) -> f64 {
    source_size.0 / display_size.0
}

/// A rectangle in PDF page space (bottom-left origin, points).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PdfRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Map a display-space rectangle onto a PDF page: rescale from display size
/// to page size, then flip Y because PDF page space has a bottom-left origin:
/// `pdf_y = page_h - (y + h) * sy`.
pub fn to_pdf_space(
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    display_size: (f64, f64),
    page_size: (f64, f64),
) -> PdfRect {
    let sx = page_size.0 / display_size.0;
    let sy = page_size.1 / display_size.1;
    PdfRect {
        x: x * sx,
        y: page_size.1 - (y + height) * sy,
        width: width * sx,
        height: height * sy,
    }
}
