//! Global constants for the mask editor.

/// Default brush diameter in native image pixels.
pub const DEFAULT_BRUSH_SIZE: u32 = 20;

/// Smallest brush diameter.
pub const MIN_BRUSH_SIZE: u32 = 1;

/// Largest brush diameter.
pub const MAX_BRUSH_SIZE: u32 = 200;

/// A mask pixel counts as selected when every channel is above this value.
pub const SELECTED_THRESHOLD: u8 = 200;

/// Side length of the generation model's square input.
pub const MODEL_INPUT_SIZE: u32 = 512;

/// Delay between a rectangle commit and the automatic mask-info query.
pub const MASK_INFO_DEBOUNCE_MS: u64 = 100;

/// Opacity of the mask tint once something has been drawn.
pub const MASK_TINT_OPACITY: f32 = 0.5;

/// Default backend address.
pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:5000";

/// Largest on-screen size a freshly loaded image is fitted into.
pub mod display {
    pub const MAX_WIDTH: f32 = 1200.0;
    pub const MAX_HEIGHT: f32 = 800.0;
}

/// Defaults for generation requests.
pub mod generation {
    pub const PROMPT: &str = "defect of crack";
    pub const NUM_IMAGES: u32 = 4;
    pub const GUIDANCE_SCALE: f32 = 7.0;
    pub const NUM_INFERENCE_STEPS: u32 = 28;
}

/// Colors and widths used on the draw preview surface.
pub mod preview {
    pub const OUTLINE_COLOR: [u8; 4] = [255, 255, 255, 255];
    pub const OUTLINE_WIDTH: f32 = 2.0;
    pub const STROKE_COLOR: [u8; 4] = [255, 255, 255, 255];
}

/// Colors and widths used by the result overlay.
pub mod overlay {
    /// Black at 50% opacity.
    pub const SCRIM: [u8; 4] = [0, 0, 0, 128];
    pub const MASK_HIGHLIGHT: [u8; 4] = [255, 0, 0, 150];
    /// Blue at 80% opacity.
    pub const CROP_STROKE: [u8; 4] = [0, 150, 255, 204];
    pub const CROP_STROKE_WIDTH: f32 = 3.0;
}
