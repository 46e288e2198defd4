//! Page rasters fed to segmentation.
//!
//! Digital pages are not re-typeset: every glyph becomes a filled box of its
//! advance width and ascent/descent height, drawn on a blank page. Contour
//! detection only needs the ink footprint, which the boxes preserve.

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect as PixelRect;

use crate::backend::RawSpan;
use crate::model::{PageSize, Rect};

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const GLYPH_BOX: Rgb<u8> = Rgb([0, 0, 0]);

/// Convert a page-space rectangle to a pixel rectangle at `scale`.
///
/// Returns `None` when the rectangle has no positive area.
pub(crate) fn to_pixel_rect(rect: &Rect, scale: f32) -> Option<PixelRect> {
    let scaled = rect.scale(scale);
    let x0 = scaled.x0.floor();
    let y0 = scaled.y0.floor();
    let width = (scaled.x1.ceil() - x0).max(0.0) as u32;
    let height = (scaled.y1.ceil() - y0).max(0.0) as u32;
    if width == 0 || height == 0 {
        return None;
    }
    Some(PixelRect::at(x0 as i32, y0 as i32).of_size(width, height))
}

/// Fill one box per glyph. Boxes outside the canvas are clipped.
pub(crate) fn fill_glyph_boxes(canvas: &mut RgbImage, glyphs: &[Rect], scale: f32, color: Rgb<u8>) {
    for glyph in glyphs {
        if let Some(rect) = to_pixel_rect(glyph, scale) {
            draw_filled_rect_mut(canvas, rect, color);
        }
    }
}

/// Blank page of `size` at `scale`.
pub fn blank_page(size: PageSize, scale: f32) -> RgbImage {
    let width = ((size.width * scale).ceil() as u32).max(1);
    let height = ((size.height * scale).ceil() as u32).max(1);
    RgbImage::from_pixel(width, height, WHITE)
}

/// Redraw every glyph of `spans` as a neutral box on a blank page.
///
/// Returns `None` when there is nothing to draw, in which case callers fall
/// back to rendering the original page.
pub fn stripped_raster(size: PageSize, spans: &[RawSpan], scale: f32) -> Option<RgbImage> {
    if spans.iter().all(|s| s.glyphs.is_empty()) {
        return None;
    }
    let mut canvas = blank_page(size, scale);
    for span in spans {
        fill_glyph_boxes(&mut canvas, &span.glyphs, scale, GLYPH_BOX);
    }
    Some(canvas)
}
