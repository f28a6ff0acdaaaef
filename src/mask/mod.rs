//! Mask authoring: the authoritative bitmap, its live preview, and geometry
//! derived from it.

pub mod analysis;
mod canvas;
mod preview;
pub(crate) mod raster;

pub use analysis::{
    MaskInfo, PaddingPolicy, TargetSizePadding, compute_auto_padding, compute_bounding_box,
    padded_region,
};
pub use canvas::MaskCanvas;
pub use preview::PreviewSurface;

/// The mask together with the preview surface drawn above it.
///
/// Both always share the current image's dimensions.
#[derive(Debug, Clone, Default)]
pub struct MaskLayers {
    pub mask: MaskCanvas,
    pub preview: PreviewSurface,
}

impl MaskLayers {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            mask: MaskCanvas::new(width, height),
            preview: PreviewSurface::new(width, height),
        }
    }

    /// Clear both layers, reallocating if the size changed.
    pub fn reset(&mut self, width: u32, height: u32) {
        self.mask.reset(width, height);
        self.preview.reset(width, height);
    }

    pub fn clear(&mut self) {
        let (w, h) = self.mask.dimensions();
        self.reset(w, h);
    }
}
