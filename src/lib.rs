//! maskpaint - mask authoring and result review for image inpainting
//!
//! The user loads an image, paints or rectangle-selects the region to
//! regenerate, sends image and mask to a generation backend and reviews the
//! variants with mask and crop overlays. This crate holds the parts that
//! must stay pixel-consistent across native, display and viewer resolution:
//!
//! - [`coord_map`]: screen to native coordinate mapping
//! - [`mask`]: the authoritative mask bitmap, its preview and its geometry
//! - [`tool`]: the brush/rectangle pointer state machine
//! - [`overlay`]: result navigation and overlay compositing
//! - [`session`]: the single owner of all of the above plus backend requests

pub mod config;
pub mod constants;
pub mod coord_map;
pub mod error;
pub mod geometry;
pub mod mask;
pub mod overlay;
pub mod session;
pub mod tool;

pub use config::{AppConfig, GenerationParams, LogLevel};
pub use coord_map::{CoordinateMapper, DisplayRect, MapError};
pub use error::{RequestKind, SessionError};
pub use geometry::{PixelBox, Point, RectF};
pub use mask::{MaskCanvas, MaskInfo, MaskLayers, PreviewSurface};
pub use overlay::{OverlayCompositor, OverlayVisibility, ResultSet, ResultViewer};
pub use session::Session;
pub use tool::{DrawTool, ToolEffect, ToolMachine};
