//! Flatten annotations onto a raster image
//!
//! Used by the image editor at save time: the original bitmap is cloned at
//! native resolution and every rectangle and label badge is drawn into it,
//! already rescaled from display space by the caller.

use ab_glyph::PxScale;
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;

use crate::annotation::{parse_hex_color, Annotation, LabelFont, BADGE_PADDING};

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Draw every annotation (box outline + label badge) into `img`.
/// `stroke_width` and `font_size` arrive already scaled to source space.
pub fn flatten_annotations(
    img: &mut RgbaImage,
    annotations: &[Annotation],
    stroke_width: f64,
    font_size: f64,
    font: Option<&LabelFont>,
) {
    for annotation in annotations {
        draw_box(img, annotation, stroke_width);
        if !annotation.label.is_empty() {
            draw_badge(img, annotation, font_size, font);
        }
    }
}

fn draw_box(img: &mut RgbaImage, annotation: &Annotation, stroke_width: f64) {
    let (x, y, w, h) = annotation.normalized();
    if w < 1.0 || h < 1.0 {
        return;
    }
    let (r, g, b) = parse_hex_color(&annotation.color);
    let color = Rgba([r, g, b, 255]);

    // Hollow rects are one pixel wide; stack them inward for thicker strokes.
    let stroke = stroke_width.round().max(1.0) as i32;
    for inset in 0..stroke {
        let iw = w as i32 - 2 * inset;
        let ih = h as i32 - 2 * inset;
        if iw < 1 || ih < 1 {
            break;
        }
        let rect = Rect::at(x as i32 + inset, y as i32 + inset).of_size(iw as u32, ih as u32);
        draw_hollow_rect_mut(img, rect, color);
    }
}

fn draw_badge(img: &mut RgbaImage, annotation: &Annotation, font_size: f64, font: Option<&LabelFont>) {
    let bw = annotation.label_width;
    let bh = annotation.label_height;
    if bw < 1.0 || bh < 1.0 {
        return;
    }
    let (r, g, b) = parse_hex_color(&annotation.color);
    let rect = Rect::at(annotation.badge_x as i32, annotation.badge_y as i32)
        .of_size(bw as u32, bh as u32);
    draw_filled_rect_mut(img, rect, Rgba([r, g, b, 255]));

    // Glyphs need a real font; without one the badge stays a plain swatch.
    if let Some(label_font) = font {
        let scale = PxScale::from(font_size as f32);
        let pad = BADGE_PADDING / 2.0;
        let tx = (annotation.badge_x + pad) as i32;
        let ty = (annotation.badge_y + (bh - font_size).max(0.0) / 2.0) as i32;
        draw_text_mut(img, WHITE, tx, ty, scale, label_font.font(), &annotation.label);
    }
}
