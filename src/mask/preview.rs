//! Non-authoritative drawing feedback.
//!
//! The preview surface sits above the image while the user draws. A
//! rectangle drag only ever shows an outline here; the mask itself is not
//! touched until the drag is committed.

use image::{Rgba, RgbaImage};

use crate::constants::preview::{OUTLINE_COLOR, OUTLINE_WIDTH, STROKE_COLOR};
use crate::geometry::{Point, RectF};
use crate::mask::raster::{visit_capsule, visit_outline};

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

#[derive(Debug, Clone)]
pub struct PreviewSurface {
    pixels: RgbaImage,
    /// Outline currently shown, if a rectangle drag is in progress.
    outline: Option<RectF>,
}

impl PreviewSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: RgbaImage::new(width, height),
            outline: None,
        }
    }

    pub fn reset(&mut self, width: u32, height: u32) {
        if self.pixels.dimensions() == (width, height) {
            self.clear();
        } else {
            *self = Self::new(width, height);
        }
    }

    /// Make the whole surface transparent.
    pub fn clear(&mut self) {
        self.pixels.pixels_mut().for_each(|p| *p = TRANSPARENT);
        self.outline = None;
    }

    /// Replace the surface content with the outline of the dragged rectangle.
    pub fn show_rect_outline(&mut self, start: Point, current: Point) -> RectF {
        self.clear();
        let rect = RectF::from_corners(start, current);
        let (w, h) = self.pixels.dimensions();
        let pixels = &mut self.pixels;
        visit_outline(w, h, rect, OUTLINE_WIDTH, |x, y| {
            pixels.put_pixel(x, y, Rgba(OUTLINE_COLOR))
        });
        self.outline = Some(rect);
        rect
    }

    /// Mirror a committed brush segment so the user sees it immediately.
    pub fn mirror_stroke(&mut self, from: Point, to: Point, brush_size: u32) {
        let (w, h) = self.pixels.dimensions();
        let pixels = &mut self.pixels;
        visit_capsule(w, h, from, to, brush_size as f32 / 2.0, |x, y| {
            pixels.put_pixel(x, y, Rgba(STROKE_COLOR))
        });
    }

    pub fn outline(&self) -> Option<RectF> {
        self.outline
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn is_blank(&self) -> bool {
        self.pixels.pixels().all(|p| p[3] == 0)
    }
}

impl Default for PreviewSurface {
    fn default() -> Self {
        Self::new(0, 0)
    }
}
