//! Mask geometry: bounding box, auto padding and the padded crop region.

use image::{GenericImageView, Pixel};
use serde::{Deserialize, Serialize};

use crate::constants::{MODEL_INPUT_SIZE, SELECTED_THRESHOLD};
use crate::geometry::PixelBox;

/// Minimal box enclosing every selected pixel of `mask`.
///
/// A pixel is selected when all its color channels are above
/// [`SELECTED_THRESHOLD`], which tolerates anti-aliased edges in masks that
/// did not come from [`MaskCanvas`](crate::mask::MaskCanvas). Returns `None`
/// for an empty mask.
pub fn compute_bounding_box<I>(mask: &I) -> Option<PixelBox>
where
    I: GenericImageView,
    I::Pixel: Pixel<Subpixel = u8>,
{
    let (width, height) = mask.dimensions();
    let mut min_x = u32::MAX;
    let mut min_y = u32::MAX;
    let mut max_x = 0;
    let mut max_y = 0;
    let mut found = false;

    for y in 0..height {
        for x in 0..width {
            let rgb = mask.get_pixel(x, y).to_rgb();
            if rgb.0.iter().all(|&c| c > SELECTED_THRESHOLD) {
                found = true;
                min_x = min_x.min(x);
                min_y = min_y.min(y);
                max_x = max_x.max(x);
                max_y = max_y.max(y);
            }
        }
    }

    found.then(|| PixelBox::new(min_x, min_y, max_x - min_x + 1, max_y - min_y + 1))
}

/// Policy that proposes how much context to keep around the mask.
pub trait PaddingPolicy {
    /// Padding in native pixels; deterministic for identical inputs.
    fn padding(&self, bbox: &PixelBox, image_width: u32, image_height: u32) -> u32;
}

/// Pads the box so its longest side approaches the model's input size.
///
/// Boxes already at least as large as the model input get no padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetSizePadding {
    pub model_size: u32,
}

impl Default for TargetSizePadding {
    fn default() -> Self {
        Self {
            model_size: MODEL_INPUT_SIZE,
        }
    }
}

impl PaddingPolicy for TargetSizePadding {
    fn padding(&self, bbox: &PixelBox, _image_width: u32, _image_height: u32) -> u32 {
        let longest = bbox.width.max(bbox.height);
        self.model_size.saturating_sub(longest) / 2
    }
}

/// Auto padding under the default policy.
pub fn compute_auto_padding(bbox: &PixelBox, image_width: u32, image_height: u32) -> u32 {
    TargetSizePadding::default().padding(bbox, image_width, image_height)
}

/// Expand `bbox` by `padding` on every side, then clip to the image.
pub fn padded_region(bbox: &PixelBox, padding: u32, image_width: u32, image_height: u32) -> PixelBox {
    let x0 = bbox.x.saturating_sub(padding).min(image_width);
    let y0 = bbox.y.saturating_sub(padding).min(image_height);
    let x1 = bbox.right().saturating_add(padding).min(image_width);
    let y1 = bbox.bottom().saturating_add(padding).min(image_height);
    PixelBox::new(x0, y0, x1.saturating_sub(x0), y1.saturating_sub(y0))
}

/// Bounding box plus the padding proposed for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskInfo {
    pub bbox: PixelBox,
    pub auto_padding: u32,
    pub model_input_size: u32,
}

impl MaskInfo {
    /// Analyze a mask locally with the default padding policy.
    pub fn analyze<I>(mask: &I) -> Option<Self>
    where
        I: GenericImageView,
        I::Pixel: Pixel<Subpixel = u8>,
    {
        let (w, h) = mask.dimensions();
        compute_bounding_box(mask).map(|bbox| Self {
            bbox,
            auto_padding: compute_auto_padding(&bbox, w, h),
            model_input_size: MODEL_INPUT_SIZE,
        })
    }

    /// Region that would be cropped for generation with this padding.
    pub fn crop_region(&self, padding: u32, image_width: u32, image_height: u32) -> PixelBox {
        padded_region(&self.bbox, padding, image_width, image_height)
    }

    pub fn bbox_label(&self) -> String {
        format!(
            "Position: ({}, {}), Size: {} x {}",
            self.bbox.x, self.bbox.y, self.bbox.width, self.bbox.height
        )
    }

    pub fn model_size_label(&self) -> String {
        format!("{} x {}", self.model_input_size, self.model_input_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgba, RgbaImage};

    #[test]
    fn test_empty_mask_has_no_bbox() {
        let mask = GrayImage::new(50, 50);
        assert_eq!(compute_bounding_box(&mask), None);
        assert_eq!(MaskInfo::analyze(&mask), None);
    }

    #[test]
    fn test_bbox_of_single_rectangle() {
        let mut mask = GrayImage::new(800, 600);
        for y in 100..250 {
            for x in 100..300 {
                mask.put_pixel(x, y, Luma([255]));
            }
        }
        assert_eq!(compute_bounding_box(&mask), Some(PixelBox::new(100, 100, 200, 150)));
    }

    #[test]
    fn test_bbox_ignores_dim_and_colored_pixels() {
        let mut mask = RgbaImage::new(20, 20);
        mask.put_pixel(2, 2, Rgba([180, 180, 180, 255]));
        mask.put_pixel(3, 3, Rgba([255, 0, 0, 255]));
        mask.put_pixel(10, 12, Rgba([230, 240, 250, 255]));
        assert_eq!(compute_bounding_box(&mask), Some(PixelBox::new(10, 12, 1, 1)));
    }

    #[test]
    fn test_auto_padding_formula() {
        let small = PixelBox::new(0, 0, 200, 150);
        assert_eq!(compute_auto_padding(&small, 800, 600), 156);

        let odd = PixelBox::new(0, 0, 101, 20);
        assert_eq!(compute_auto_padding(&odd, 800, 600), 205);

        let large = PixelBox::new(0, 0, 600, 10);
        assert_eq!(compute_auto_padding(&large, 800, 600), 0);
    }

    #[test]
    fn test_padded_region_stays_in_bounds() {
        let (w, h) = (800, 600);
        let boxes = [
            PixelBox::new(350, 250, 100, 100), // center
            PixelBox::new(0, 0, 40, 30),       // top-left corner
            PixelBox::new(760, 570, 40, 30),   // bottom-right corner
            PixelBox::new(0, 200, 10, 300),    // left edge
            PixelBox::new(0, 0, 800, 600),     // whole image
        ];
        for bbox in boxes {
            let padding = compute_auto_padding(&bbox, w, h);
            let region = padded_region(&bbox, padding, w, h);
            assert!(region.right() <= w && region.bottom() <= h, "{:?} -> {:?}", bbox, region);
            assert!(!region.is_degenerate());
            assert!(region.x <= bbox.x && region.y <= bbox.y);
            assert!(region.right() >= bbox.right() && region.bottom() >= bbox.bottom());
        }
    }

    #[test]
    fn test_padded_region_values() {
        let bbox = PixelBox::new(100, 100, 200, 150);
        assert_eq!(padded_region(&bbox, 156, 800, 600), PixelBox::new(0, 0, 456, 406));
        assert_eq!(padded_region(&bbox, 0, 800, 600), bbox);
    }

    #[test]
    fn test_labels() {
        let info = MaskInfo {
            bbox: PixelBox::new(1, 2, 3, 4),
            auto_padding: 254,
            model_input_size: 512,
        };
        assert_eq!(info.bbox_label(), "Position: (1, 2), Size: 3 x 4");
        assert_eq!(info.model_size_label(), "512 x 512");
    }
}
