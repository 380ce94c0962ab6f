//! Raster drawing primitives.
//!
//! The compositor only needs three operations — stroke a box, fill a box,
//! draw a short label — so that is the whole [`Renderer`] contract. The
//! default implementation draws with `imageproc`; label text needs a TTF
//! font, loaded once at startup. Without a font the renderer still draws
//! boxes and logs a single warning instead of failing the run.

use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut};

use crate::geometry::Rect;

/// Drawing contract the compositor renders through.
pub trait Renderer {
    /// Outline `rect` with the given stroke thickness.
    fn stroke_rect(&self, canvas: &mut RgbImage, rect: &Rect, color: Rgb<u8>, thickness: u32);

    /// Fill `rect` opaquely.
    fn fill_rect(&self, canvas: &mut RgbImage, rect: &Rect, color: Rgb<u8>);

    /// Draw `text` with its top-left corner at `anchor` (may fall partly or
    /// wholly outside the canvas; implementations clip).
    fn draw_label(&self, canvas: &mut RgbImage, anchor: (i32, i32), text: &str, color: Rgb<u8>);
}

/// Default `imageproc`-backed renderer.
pub struct RasterRenderer {
    font: Option<FontVec>,
    font_scale: PxScale,
}

impl RasterRenderer {
    /// Renderer without label text (boxes only).
    pub fn without_font() -> Self {
        Self {
            font: None,
            font_scale: PxScale::from(24.0),
        }
    }

    /// Load the label font from a TTF/OTF file. A missing or unparseable
    /// font degrades to boxes-only rendering with one warning.
    pub fn with_font_path(path: Option<&Path>) -> Self {
        let font = path.and_then(|p| match std::fs::read(p) {
            Ok(bytes) => match FontVec::try_from_vec(bytes) {
                Ok(font) => Some(font),
                Err(e) => {
                    log::warn!("font {} is not a usable TTF/OTF: {}", p.display(), e);
                    None
                }
            },
            Err(e) => {
                log::warn!("failed to read font {}: {}", p.display(), e);
                None
            }
        });
        if path.is_some() && font.is_none() {
            log::warn!("labels disabled: rendering boxes without text");
        }
        Self {
            font,
            font_scale: PxScale::from(24.0),
        }
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }
}

impl Renderer for RasterRenderer {
    fn stroke_rect(&self, canvas: &mut RgbImage, rect: &Rect, color: Rgb<u8>, thickness: u32) {
        let base = to_pixel_rect(rect);
        // Grow outward per ring, like an OpenCV thick stroke.
        for ring in 0..thickness.max(1) as i32 {
            let grown = imageproc::rect::Rect::at(base.left() - ring, base.top() - ring).of_size(
                base.width() + 2 * ring as u32,
                base.height() + 2 * ring as u32,
            );
            draw_hollow_rect_mut(canvas, grown, color);
        }
    }

    fn fill_rect(&self, canvas: &mut RgbImage, rect: &Rect, color: Rgb<u8>) {
        draw_filled_rect_mut(canvas, to_pixel_rect(rect), color);
    }

    fn draw_label(&self, canvas: &mut RgbImage, anchor: (i32, i32), text: &str, color: Rgb<u8>) {
        if let Some(font) = &self.font {
            draw_text_mut(canvas, color, anchor.0, anchor.1, self.font_scale, font, text);
        }
    }
}

/// Truncate to integer pixel coordinates (the upstream convention for box
/// drawing); degenerate boxes are widened to one pixel so a stroke is still
/// visible.
fn to_pixel_rect(rect: &Rect) -> imageproc::rect::Rect {
    let (x1, y1) = (rect.x1 as i32, rect.y1 as i32);
    let (x2, y2) = (rect.x2 as i32, rect.y2 as i32);
    let w = (x2 - x1).max(1) as u32;
    let h = (y2 - y1).max(1) as u32;
    imageproc::rect::Rect::at(x1, y1).of_size(w, h)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stroke_rect_marks_the_outline_only() {
        let renderer = RasterRenderer::without_font();
        let mut canvas = RgbImage::new(50, 50);
        let rect = Rect::new(10.0, 10.0, 40.0, 40.0).unwrap();

        renderer.stroke_rect(&mut canvas, &rect, Rgb([0, 255, 0]), 1);

        assert_eq!(*canvas.get_pixel(10, 10), Rgb([0, 255, 0]));
        assert_eq!(*canvas.get_pixel(25, 10), Rgb([0, 255, 0]));
        // Interior untouched.
        assert_eq!(*canvas.get_pixel(25, 25), Rgb([0, 0, 0]));
    }

    #[test]
    fn fill_rect_covers_the_interior() {
        let renderer = RasterRenderer::without_font();
        let mut canvas = RgbImage::new(50, 50);
        let rect = Rect::new(10.0, 10.0, 40.0, 40.0).unwrap();

        renderer.fill_rect(&mut canvas, &rect, Rgb([255, 0, 0]));

        assert_eq!(*canvas.get_pixel(25, 25), Rgb([255, 0, 0]));
        assert_eq!(*canvas.get_pixel(5, 5), Rgb([0, 0, 0]));
    }

    #[test]
    fn out_of_bounds_stroke_is_clipped_not_fatal() {
        let renderer = RasterRenderer::without_font();
        let mut canvas = RgbImage::new(20, 20);
        let rect = Rect::new(10.0, 10.0, 300.0, 300.0).unwrap();

        renderer.stroke_rect(&mut canvas, &rect, Rgb([0, 255, 0]), 3);

        assert_eq!(*canvas.get_pixel(15, 10), Rgb([0, 255, 0]));
    }

    #[test]
    fn missing_font_skips_labels_without_panicking() {
        let renderer = RasterRenderer::without_font();
        let mut canvas = RgbImage::new(20, 20);
        renderer.draw_label(&mut canvas, (2, 2), "42.00%", Rgb([0, 0, 255]));
        assert!(!renderer.has_font());
    }
}
