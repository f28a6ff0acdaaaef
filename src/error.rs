//! Errors reported by the editing session.

use maskpaint_backend::BackendError;
use thiserror::Error;

use crate::coord_map::MapError;

/// The kinds of backend request the session can have in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    LoadModels,
    CheckModel,
    MaskInfo,
    Generate,
}

impl RequestKind {
    pub fn name(&self) -> &'static str {
        match self {
            RequestKind::LoadModels => "model loading",
            RequestKind::CheckModel => "model check",
            RequestKind::MaskInfo => "mask analysis",
            RequestKind::Generate => "generation",
        }
    }
}

impl std::fmt::Display for RequestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Please upload an image first")]
    NoImage,

    #[error("Please draw a mask first")]
    NoMask,

    #[error("Models are not loaded")]
    ModelsNotLoaded,

    /// A request of this kind is already running.
    #[error("A {0} request is already in progress")]
    Busy(RequestKind),

    #[error("There are no generated results")]
    NoResults,

    #[error("Layout not ready: {0}")]
    Layout(#[from] MapError),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

impl SessionError {
    /// True for errors the user fixes by doing something first (upload,
    /// draw, load models), as opposed to failures.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            SessionError::NoImage | SessionError::NoMask | SessionError::ModelsNotLoaded | SessionError::NoResults
        )
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
