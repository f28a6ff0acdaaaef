//! Result review: navigation over generated images and the mask/crop overlay.

mod compositor;
mod viewer;

pub use compositor::{OverlayCompositor, OverlayStyle, OverlayVisibility};
pub use viewer::{ImageLoad, NavKey, NavState, ResultSet, ResultViewer};
