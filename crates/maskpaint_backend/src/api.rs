//! Wire types for the backend endpoints.
//!
//! Field names match the JSON the backend reads and writes, so these types
//! serialize directly into request bodies and out of response bodies.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// An integer rectangle in native image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Exclusive right edge.
    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.width)
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.height)
    }

    pub fn is_degenerate(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// The part of this box inside a `width` x `height` image, if any.
    pub fn clipped_to(&self, width: u32, height: u32) -> Option<Self> {
        let x = self.x.min(width);
        let y = self.y.min(height);
        let clipped = Self::new(x, y, self.right().min(width) - x, self.bottom().min(height) - y);
        (!clipped.is_degenerate()).then_some(clipped)
    }
}

// ============================================================================
// Model loading
// ============================================================================

/// Where a set of model weights comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelSource {
    /// A path on the backend's filesystem.
    Path(String),
    /// A local file uploaded with the request.
    File(PathBuf),
}

impl ModelSource {
    /// Pick the path when it is non-empty, otherwise fall back to the file.
    pub fn prefer_path(path: Option<&str>, file: Option<PathBuf>) -> Option<Self> {
        match path.map(str::trim) {
            Some(p) if !p.is_empty() => Some(ModelSource::Path(p.to_string())),
            _ => file.map(ModelSource::File),
        }
    }
}

/// Multipart form for `POST /api/load_models`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadModelsRequest {
    pub sd3: Option<ModelSource>,
    pub lora: Option<ModelSource>,
}

impl LoadModelsRequest {
    /// Form field prefixes; the backend reads `<prefix>_path` or `<prefix>_file`.
    pub(crate) fn fields(&self) -> [(&'static str, Option<&ModelSource>); 2] {
        [("sd3", self.sd3.as_ref()), ("lora", self.lora.as_ref())]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadModelsResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckModelResponse {
    #[serde(default)]
    pub loaded: bool,
}

// ============================================================================
// Mask info
// ============================================================================

/// Body for `POST /api/calculate_mask_info`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskInfoRequest {
    pub original_image: String,
    pub mask_image: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskInfoResponse {
    pub success: bool,
    #[serde(default)]
    pub bbox: Option<PixelBox>,
    #[serde(default)]
    pub auto_padding: u32,
    #[serde(default)]
    pub model_input_size: Option<u32>,
    #[serde(default)]
    pub message: String,
}

// ============================================================================
// Generation
// ============================================================================

/// Body for `POST /api/generate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub original_image: String,
    pub mask_image: String,
    pub prompt: String,
    pub negative_prompt: String,
    pub num_images: u32,
    pub guidance_scale: f32,
    pub num_inference_steps: u32,
    pub padding_mask_crop: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub output_dir: String,
    /// Generated images as PNG data URLs.
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub crop_info: Option<PixelBox>,
    #[serde(default)]
    pub bbox: Option<PixelBox>,
}
