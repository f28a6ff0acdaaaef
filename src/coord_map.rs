//! Screen-to-image coordinate mapping.
//!
//! The mask is always edited at native image resolution, but pointer events
//! arrive in screen coordinates and overlays are drawn at whatever size the
//! layout gave the image. Every conversion between those spaces goes through
//! [`CoordinateMapper`], which is rebuilt from the current layout for each
//! event rather than cached.

use thiserror::Error;

use crate::geometry::{PixelBox, Point, RectF};

/// Where a surface showing the image sits on screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl DisplayRect {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// A rectangle anchored at the origin.
    pub fn sized(width: f32, height: f32) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    /// Rectangle of an image rendered at `image_width` x `image_height`,
    /// centered inside a surface of `surface_width` x `surface_height`.
    ///
    /// The offsets are the letterbox margins; they go negative when the
    /// image overflows the surface.
    pub fn centered_in(
        surface_width: f32,
        surface_height: f32,
        image_width: f32,
        image_height: f32,
    ) -> Self {
        Self::new(
            (surface_width - image_width) / 2.0,
            (surface_height - image_height) / 2.0,
            image_width,
            image_height,
        )
    }

    /// True once layout has given the surface a real size.
    pub fn is_laid_out(&self) -> bool {
        [self.left, self.top, self.width, self.height]
            .iter()
            .all(|v| v.is_finite())
            && self.width > 0.0
            && self.height > 0.0
    }
}

/// Reasons a mapper cannot be built.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum MapError {
    /// The display surface has not been laid out yet.
    #[error("Display surface has no usable size ({width}x{height})")]
    DisplayNotLaidOut { width: f32, height: f32 },

    /// The native image has no pixels.
    #[error("Native image has zero size ({width}x{height})")]
    EmptyNative { width: u32, height: u32 },
}

/// Linear mapping between a display rectangle and native image pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateMapper {
    native_width: u32,
    native_height: u32,
    display: DisplayRect,
    /// Native pixels per display pixel, per axis.
    scale_x: f32,
    scale_y: f32,
}

impl CoordinateMapper {
    /// Build a mapper for an image of the given native size shown in `display`.
    pub fn new(native_width: u32, native_height: u32, display: DisplayRect) -> Result<Self, MapError> {
        if native_width == 0 || native_height == 0 {
            return Err(MapError::EmptyNative {
                width: native_width,
                height: native_height,
            });
        }
        if !display.is_laid_out() {
            return Err(MapError::DisplayNotLaidOut {
                width: display.width,
                height: display.height,
            });
        }
        Ok(Self {
            native_width,
            native_height,
            display,
            scale_x: native_width as f32 / display.width,
            scale_y: native_height as f32 / display.height,
        })
    }

    /// Mapper for a surface that shows the image at native size.
    pub fn identity(native_width: u32, native_height: u32) -> Result<Self, MapError> {
        Self::new(
            native_width,
            native_height,
            DisplayRect::sized(native_width as f32, native_height as f32),
        )
    }

    pub fn display(&self) -> DisplayRect {
        self.display
    }

    /// Native pixels per display pixel as `(x, y)`.
    pub fn scale(&self) -> (f32, f32) {
        (self.scale_x, self.scale_y)
    }

    /// Convert a screen position to native image coordinates.
    pub fn to_native(&self, screen: Point) -> Point {
        Point::new(
            (screen.x - self.display.left) * self.scale_x,
            (screen.y - self.display.top) * self.scale_y,
        )
    }

    /// Convert native image coordinates to a screen position.
    pub fn to_display(&self, native: Point) -> Point {
        Point::new(
            native.x * (self.display.width / self.native_width as f32) + self.display.left,
            native.y * (self.display.height / self.native_height as f32) + self.display.top,
        )
    }

    /// Place a native-pixel rectangle on screen.
    pub fn rect_to_display(&self, rect: PixelBox) -> RectF {
        let top_left = self.to_display(Point::new(rect.x as f32, rect.y as f32));
        let bottom_right = self.to_display(Point::new(rect.right() as f32, rect.bottom() as f32));
        RectF::from_corners(top_left, bottom_right)
    }
}

/// Fit an image into a maximum display box, preserving aspect ratio.
///
/// Width is limited first, then height. Images that already fit keep their
/// native size.
pub fn fit_display(width: u32, height: u32, max_width: f32, max_height: f32) -> (f32, f32) {
    let mut w = width as f32;
    let mut h = height as f32;
    if w > max_width {
        h = h * max_width / w;
        w = max_width;
    }
    if h > max_height {
        w = w * max_height / h;
        h = max_height;
    }
    (w, h)
}
