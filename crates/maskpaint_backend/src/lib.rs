//! Client for the inpainting generation backend.
//!
//! The backend is an HTTP service exposing model loading, mask analysis and
//! generation endpoints. Image payloads travel as PNG data URLs.

pub mod api;
pub mod client;
pub mod data_url;
pub mod error;
mod multipart;

pub use api::{
    CheckModelResponse, GenerateRequest, GenerateResponse, LoadModelsRequest,
    LoadModelsResponse, MaskInfoRequest, MaskInfoResponse, ModelSource, PixelBox,
};
pub use client::{Backend, HttpBackend};
pub use error::{BackendError, Result};
