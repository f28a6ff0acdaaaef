//! Mask and crop overlays for the result viewer.
//!
//! The overlay is one RGBA surface the size of the viewer viewport. It is
//! redrawn from scratch on every render so no pixels survive a visibility
//! change.

use image::{GrayImage, Rgba, RgbaImage};

use crate::constants::SELECTED_THRESHOLD;
use crate::constants::overlay::{CROP_STROKE, CROP_STROKE_WIDTH, MASK_HIGHLIGHT, SCRIM};
use crate::coord_map::CoordinateMapper;
use crate::geometry::{PixelBox, Point, RectF};
use crate::mask::raster::{visit_box, visit_outline};

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Which overlays the user has switched on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OverlayVisibility {
    pub mask: bool,
    pub crop: bool,
}

impl OverlayVisibility {
    pub fn any(&self) -> bool {
        self.mask || self.crop
    }
}

/// Colors used when compositing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayStyle {
    pub scrim: [u8; 4],
    pub mask_highlight: [u8; 4],
    pub crop_stroke: [u8; 4],
    pub crop_stroke_width: f32,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            scrim: SCRIM,
            mask_highlight: MASK_HIGHLIGHT,
            crop_stroke: CROP_STROKE,
            crop_stroke_width: CROP_STROKE_WIDTH,
        }
    }
}

/// Source-over blend of two straight-alpha colors.
fn blend_over(dst: Rgba<u8>, src: [u8; 4]) -> Rgba<u8> {
    let sa = src[3] as f32 / 255.0;
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        return TRANSPARENT;
    }
    let channel = |s: u8, d: u8| {
        let c = (s as f32 * sa + d as f32 * da * (1.0 - sa)) / out_a;
        c.round().clamp(0.0, 255.0) as u8
    };
    Rgba([
        channel(src[0], dst[0]),
        channel(src[1], dst[1]),
        channel(src[2], dst[2]),
        (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
    ])
}

/// Draws the overlay surface for the image currently on display.
#[derive(Debug, Clone)]
pub struct OverlayCompositor {
    surface: RgbaImage,
    /// False while the surface is fully transparent.
    visible: bool,
    style: OverlayStyle,
}

impl OverlayCompositor {
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_style(width, height, OverlayStyle::default())
    }

    pub fn with_style(width: u32, height: u32, style: OverlayStyle) -> Self {
        Self {
            surface: RgbaImage::new(width, height),
            visible: false,
            style,
        }
    }

    /// Match the viewport size. The surface comes back transparent.
    pub fn resize(&mut self, width: u32, height: u32) {
        if self.surface.dimensions() != (width, height) {
            self.surface = RgbaImage::new(width, height);
        } else {
            self.hide();
        }
        self.visible = false;
    }

    /// Make the whole surface transparent.
    pub fn hide(&mut self) {
        self.surface.pixels_mut().for_each(|p| *p = TRANSPARENT);
        self.visible = false;
    }

    pub fn surface(&self) -> &RgbaImage {
        &self.surface
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Redraw the surface.
    ///
    /// `mapper` places the native-resolution `mask` and `crop` on the
    /// viewport. A crop overlay without crop geometry draws nothing for the
    /// crop; if that leaves no active overlay the surface stays hidden.
    pub fn render(
        &mut self,
        visibility: OverlayVisibility,
        mask: &GrayImage,
        crop: Option<PixelBox>,
        mapper: &CoordinateMapper,
    ) {
        self.hide();

        let crop = crop.filter(|_| visibility.crop);
        if !visibility.mask && crop.is_none() {
            return;
        }

        self.fill_scrim();
        if visibility.mask {
            self.draw_mask(mask, mapper);
        }
        if let Some(crop) = crop {
            if !visibility.mask {
                self.clear_crop(crop, mapper);
            }
            self.stroke_crop(crop, mapper);
        }
        self.visible = true;
    }

    fn fill_scrim(&mut self) {
        let scrim = Rgba(self.style.scrim);
        self.surface.pixels_mut().for_each(|p| *p = scrim);
    }

    /// Highlight selected mask pixels inside the displayed image's rectangle.
    fn draw_mask(&mut self, mask: &GrayImage, mapper: &CoordinateMapper) {
        let (w, h) = self.surface.dimensions();
        let display = mapper.display();
        let Some(area) = RectF::new(display.left, display.top, display.width, display.height)
            .to_pixel_box(w, h)
        else {
            return;
        };
        let (mask_w, mask_h) = mask.dimensions();
        let color = self.style.mask_highlight;
        let surface = &mut self.surface;

        visit_box(area, |x, y| {
            let native = mapper.to_native(Point::new(x as f32 + 0.5, y as f32 + 0.5));
            if native.x < 0.0 || native.y < 0.0 {
                return;
            }
            let (nx, ny) = (native.x as u32, native.y as u32);
            if nx >= mask_w || ny >= mask_h {
                return;
            }
            if mask.get_pixel(nx, ny)[0] > SELECTED_THRESHOLD {
                let blended = blend_over(*surface.get_pixel(x, y), color);
                surface.put_pixel(x, y, blended);
            }
        });
    }

    fn clear_crop(&mut self, crop: PixelBox, mapper: &CoordinateMapper) {
        let (w, h) = self.surface.dimensions();
        let Some(region) = mapper.rect_to_display(crop).to_pixel_box(w, h) else {
            return;
        };
        let surface = &mut self.surface;
        visit_box(region, |x, y| surface.put_pixel(x, y, TRANSPARENT));
    }

    fn stroke_crop(&mut self, crop: PixelBox, mapper: &CoordinateMapper) {
        let (w, h) = self.surface.dimensions();
        let rect = mapper.rect_to_display(crop);
        let color = self.style.crop_stroke;
        let surface = &mut self.surface;
        visit_outline(w, h, rect, self.style.crop_stroke_width, |x, y| {
            let blended = blend_over(*surface.get_pixel(x, y), color);
            surface.put_pixel(x, y, blended);
        });
    }
}

impl Default for OverlayCompositor {
    fn default() -> Self {
        Self::new(0, 0)
    }
}
