//! Core geometry types shared by the mask, tool and overlay modules.

use serde::{Deserialize, Serialize};

pub use maskpaint_backend::PixelBox;

/// A 2D point. Whether it is in screen or native image space depends on
/// where it came from; the coordinate mapper converts between the two.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Calculate distance to another point.
    pub fn distance_to(&self, other: &Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Distance from this point to the segment `a`-`b`.
    pub fn distance_to_segment(&self, a: &Point, b: &Point) -> f32 {
        let abx = b.x - a.x;
        let aby = b.y - a.y;
        let len_sq = abx * abx + aby * aby;
        if len_sq <= f32::EPSILON {
            return self.distance_to(a);
        }
        let t = (((self.x - a.x) * abx + (self.y - a.y) * aby) / len_sq).clamp(0.0, 1.0);
        self.distance_to(&Point::new(a.x + t * abx, a.y + t * aby))
    }
}

/// An axis-aligned rectangle with fractional coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RectF {
    /// Top-left corner X coordinate
    pub x: f32,
    /// Top-left corner Y coordinate
    pub y: f32,
    /// Width of the rectangle
    pub width: f32,
    /// Height of the rectangle
    pub height: f32,
}

impl RectF {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a rectangle from two opposite corners, in either order.
    pub fn from_corners(p1: Point, p2: Point) -> Self {
        let x = p1.x.min(p2.x);
        let y = p1.y.min(p2.y);
        let width = (p1.x - p2.x).abs();
        let height = (p1.y - p2.y).abs();
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Check if a point is inside the rectangle (edges inclusive).
    pub fn contains(&self, point: &Point) -> bool {
        point.x >= self.x
            && point.x <= self.right()
            && point.y >= self.y
            && point.y <= self.bottom()
    }

    /// Grow (or shrink, for negative `amount`) every side.
    pub fn inflate(&self, amount: f32) -> Self {
        Self::new(
            self.x - amount,
            self.y - amount,
            self.width + 2.0 * amount,
            self.height + 2.0 * amount,
        )
    }

    /// Snap the edges to whole pixels and clip to `width` x `height`.
    ///
    /// Returns `None` when nothing of the rectangle lies on the raster.
    pub fn to_pixel_box(&self, width: u32, height: u32) -> Option<PixelBox> {
        let x0 = self.x.round().clamp(0.0, width as f32) as u32;
        let y0 = self.y.round().clamp(0.0, height as f32) as u32;
        let x1 = self.right().round().clamp(0.0, width as f32) as u32;
        let y1 = self.bottom().round().clamp(0.0, height as f32) as u32;
        let b = PixelBox::new(x0, y0, x1.saturating_sub(x0), y1.saturating_sub(y0));
        (!b.is_degenerate()).then_some(b)
    }
}

impl From<PixelBox> for RectF {
    fn from(b: PixelBox) -> Self {
        Self::new(b.x as f32, b.y as f32, b.width as f32, b.height as f32)
    }
}
