//! The authoritative inpainting mask.

use image::{DynamicImage, GrayImage, Luma};
use maskpaint_backend::data_url;

use crate::constants::{DEFAULT_BRUSH_SIZE, MAX_BRUSH_SIZE, MIN_BRUSH_SIZE, SELECTED_THRESHOLD};
use crate::geometry::{PixelBox, Point, RectF};
use crate::mask::analysis;
use crate::mask::raster::{visit_box, visit_capsule};

const SELECTED: Luma<u8> = Luma([255]);
const UNSELECTED: Luma<u8> = Luma([0]);

/// Binary mask at native image resolution.
///
/// White pixels are selected for regeneration, black pixels are left alone.
/// All writes are additive: painting over an already selected area changes
/// nothing.
#[derive(Debug, Clone)]
pub struct MaskCanvas {
    bitmap: GrayImage,
    brush_size: u32,
    /// Last point of the stroke in progress, in native coordinates.
    stroke_anchor: Option<Point>,
    /// Set once any pixel has been selected since the last reset.
    marked: bool,
}

impl MaskCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            bitmap: GrayImage::from_pixel(width, height, UNSELECTED),
            brush_size: DEFAULT_BRUSH_SIZE,
            stroke_anchor: None,
            marked: false,
        }
    }

    /// Reallocate at the given size with nothing selected.
    ///
    /// Also forgets any stroke in progress. The brush size is kept.
    pub fn reset(&mut self, width: u32, height: u32) {
        if self.bitmap.dimensions() == (width, height) {
            self.bitmap.pixels_mut().for_each(|p| *p = UNSELECTED);
        } else {
            self.bitmap = GrayImage::from_pixel(width, height, UNSELECTED);
        }
        self.stroke_anchor = None;
        self.marked = false;
    }

    /// Reset at the current size.
    pub fn clear(&mut self) {
        let (w, h) = self.bitmap.dimensions();
        self.reset(w, h);
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.bitmap.dimensions()
    }

    pub fn brush_size(&self) -> u32 {
        self.brush_size
    }

    /// Set the brush diameter, clamped to the supported range.
    pub fn set_brush_size(&mut self, size: u32) {
        self.brush_size = size.clamp(MIN_BRUSH_SIZE, MAX_BRUSH_SIZE);
    }

    /// Mark a brush dab or segment.
    ///
    /// The first point of a stroke marks a disc of the brush diameter; later
    /// points mark a round-capped segment from the previous point. A
    /// continuation without a previous point (e.g. after a reset mid-stroke)
    /// is treated as a first point.
    pub fn paint_stroke(&mut self, point: Point, is_first_point: bool) {
        let from = match (is_first_point, self.stroke_anchor) {
            (false, Some(anchor)) => anchor,
            _ => point,
        };
        let radius = self.brush_size as f32 / 2.0;
        let (w, h) = self.bitmap.dimensions();
        let bitmap = &mut self.bitmap;
        let mut marked = false;
        visit_capsule(w, h, from, point, radius, |x, y| {
            bitmap.put_pixel(x, y, SELECTED);
            marked = true;
        });
        self.marked |= marked;
        self.stroke_anchor = Some(point);
    }

    /// End the stroke in progress; the next stroke must start with a first point.
    pub fn end_stroke(&mut self) {
        self.stroke_anchor = None;
    }

    /// Select the rectangle spanned by two opposite corners, in either order.
    pub fn paint_rect(&mut self, corner_a: Point, corner_b: Point) {
        let (w, h) = self.bitmap.dimensions();
        let Some(region) = RectF::from_corners(corner_a, corner_b).to_pixel_box(w, h) else {
            log::debug!("Rectangle {:?}-{:?} covers no pixels", corner_a, corner_b);
            return;
        };
        let bitmap = &mut self.bitmap;
        visit_box(region, |x, y| bitmap.put_pixel(x, y, SELECTED));
        self.marked = true;
    }

    /// True when nothing has been selected since the last reset.
    pub fn is_empty(&self) -> bool {
        !self.marked
    }

    pub fn is_selected(&self, x: u32, y: u32) -> bool {
        self.bitmap
            .get_pixel_checked(x, y)
            .is_some_and(|p| p[0] > SELECTED_THRESHOLD)
    }

    pub fn bitmap(&self) -> &GrayImage {
        &self.bitmap
    }

    /// Minimal box around all selected pixels.
    pub fn bounding_box(&self) -> Option<PixelBox> {
        analysis::compute_bounding_box(&self.bitmap)
    }

    /// The mask as a PNG data URL, ready for the backend.
    pub fn serialize(&self) -> maskpaint_backend::Result<String> {
        data_url::encode_png(&DynamicImage::ImageLuma8(self.bitmap.clone()))
    }
}

impl Default for MaskCanvas {
    fn default() -> Self {
        Self::new(0, 0)
    }
}
