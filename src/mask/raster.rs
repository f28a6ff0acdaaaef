//! Pixel coverage for brush and rectangle shapes.
//!
//! Coverage is binary: a pixel is covered when its center lies inside the
//! shape. The visitors hand each covered pixel to a closure so the same
//! shapes can set mask bytes, paint preview pixels or blend overlay colors.

use crate::geometry::{PixelBox, Point, RectF};

/// Smallest radius that still covers the pixel under the point.
const MIN_RADIUS: f32 = std::f32::consts::FRAC_1_SQRT_2;

/// Clip `lo..hi` (fractional) to the pixel range `0..limit`.
fn pixel_span(lo: f32, hi: f32, limit: u32) -> std::ops::Range<u32> {
    let start = lo.floor().max(0.0);
    let end = hi.ceil().min(limit as f32);
    if end <= start {
        return 0..0;
    }
    start as u32..end as u32
}

/// Visit every pixel whose center lies within `radius` of the segment `a`-`b`.
///
/// With `a == b` this is a filled disc.
pub(crate) fn visit_capsule(
    width: u32,
    height: u32,
    a: Point,
    b: Point,
    radius: f32,
    mut visit: impl FnMut(u32, u32),
) {
    let radius = radius.max(MIN_RADIUS);
    let xs = pixel_span(a.x.min(b.x) - radius, a.x.max(b.x) + radius, width);
    let ys = pixel_span(a.y.min(b.y) - radius, a.y.max(b.y) + radius, height);
    for y in ys {
        for x in xs.clone() {
            let center = Point::new(x as f32 + 0.5, y as f32 + 0.5);
            if center.distance_to_segment(&a, &b) <= radius {
                visit(x, y);
            }
        }
    }
}

/// Visit every pixel of an integer box.
pub(crate) fn visit_box(b: PixelBox, mut visit: impl FnMut(u32, u32)) {
    for y in b.y..b.bottom() {
        for x in b.x..b.right() {
            visit(x, y);
        }
    }
}

/// Visit the pixels of a rectangle outline centered on the rectangle's edges.
pub(crate) fn visit_outline(
    width: u32,
    height: u32,
    rect: RectF,
    line_width: f32,
    mut visit: impl FnMut(u32, u32),
) {
    let half = line_width / 2.0;
    let outer = rect.inflate(half);
    let inner = rect.inflate(-half);
    let xs = pixel_span(outer.x, outer.right(), width);
    let ys = pixel_span(outer.y, outer.bottom(), height);
    for y in ys {
        for x in xs.clone() {
            let c = Point::new(x as f32 + 0.5, y as f32 + 0.5);
            let in_outer = c.x >= outer.x && c.x < outer.right() && c.y >= outer.y && c.y < outer.bottom();
            let in_inner = inner.width > 0.0
                && inner.height > 0.0
                && c.x >= inner.x
                && c.x < inner.right()
                && c.y >= inner.y
                && c.y < inner.bottom();
            if in_outer && !in_inner {
                visit(x, y);
            }
        }
    }
}
