//! Session tests.
//!
//! Network paths run against [`FakeBackend`], which answers like the real
//! service but computes everything locally.

mod drawing_tests;

use std::cell::{Cell, RefCell};

use image::{DynamicImage, Rgb, RgbImage};
use maskpaint_backend::{
    Backend, BackendError, CheckModelResponse, GenerateRequest, GenerateResponse, LoadModelsRequest,
    LoadModelsResponse, MaskInfoRequest, MaskInfoResponse, Result as BackendResult, data_url,
};
use web_time::Instant;

use super::Session;
use crate::config::AppConfig;
use crate::coord_map::DisplayRect;
use crate::geometry::Point;
use crate::mask::{compute_auto_padding, compute_bounding_box, padded_region};

/// In-memory stand-in for the generation service.
pub(super) struct FakeBackend {
    pub loaded: bool,
    /// When set, every call is rejected with this message.
    pub reject_with: Option<String>,
    pub calls: Cell<usize>,
    pub last_generate: RefCell<Option<GenerateRequest>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            loaded: true,
            reject_with: None,
            calls: Cell::new(0),
            last_generate: RefCell::new(None),
        }
    }

    pub fn rejecting(message: &str) -> Self {
        Self {
            reject_with: Some(message.to_string()),
            ..Self::new()
        }
    }

    fn check(&self) -> BackendResult<()> {
        self.calls.set(self.calls.get() + 1);
        match &self.reject_with {
            Some(message) => Err(BackendError::Rejected(message.clone())),
            None => Ok(()),
        }
    }
}

impl Backend for FakeBackend {
    fn load_models(&self, _request: &LoadModelsRequest) -> BackendResult<LoadModelsResponse> {
        self.check()?;
        Ok(LoadModelsResponse {
            success: true,
            message: "Models loaded successfully".to_string(),
        })
    }

    fn check_model(&self) -> BackendResult<CheckModelResponse> {
        self.check()?;
        Ok(CheckModelResponse { loaded: self.loaded })
    }

    fn calculate_mask_info(&self, request: &MaskInfoRequest) -> BackendResult<MaskInfoResponse> {
        self.check()?;
        let mask = data_url::decode_image(&request.mask_image)?;
        let (w, h) = (mask.width(), mask.height());
        let bbox = compute_bounding_box(&mask);
        Ok(MaskInfoResponse {
            success: true,
            bbox,
            auto_padding: bbox.map_or(0, |b| compute_auto_padding(&b, w, h)),
            model_input_size: Some(512),
            message: String::new(),
        })
    }

    fn generate(&self, request: &GenerateRequest) -> BackendResult<GenerateResponse> {
        self.check()?;
        *self.last_generate.borrow_mut() = Some(request.clone());

        let original = data_url::decode_image(&request.original_image)?;
        let mask = data_url::decode_image(&request.mask_image)?;
        let (w, h) = (original.width(), original.height());
        let bbox = compute_bounding_box(&mask);
        let crop_info = match (bbox, request.padding_mask_crop) {
            (Some(b), Some(p)) => Some(padded_region(&b, p, w, h)),
            _ => None,
        };
        let image = data_url::encode_png(&original)?;
        Ok(GenerateResponse {
            success: true,
            message: format!("Generated {} images", request.num_images),
            output_dir: "outputs/20260101_120000".to_string(),
            images: vec![image; request.num_images as usize],
            crop_info,
            bbox,
        })
    }
}

pub(super) fn session_with_image(width: u32, height: u32) -> Session {
    let mut session = Session::new(AppConfig::default());
    let image = RgbImage::from_pixel(width, height, Rgb([90, 120, 150]));
    session.load_image(DynamicImage::ImageRgb8(image)).unwrap();
    session
}

/// Display rect showing the session's image at native size.
pub(super) fn native_display(session: &Session) -> DisplayRect {
    let (w, h) = session.image().unwrap().dimensions();
    DisplayRect::sized(w as f32, h as f32)
}

/// Drag a rectangle with the rect tool, at native size.
pub(super) fn drag_rect(session: &mut Session, from: (f32, f32), to: (f32, f32), now: Instant) {
    let display = native_display(session);
    session.set_tool(crate::tool::DrawTool::Rect);
    session.pointer_down(Point::new(from.0, from.1), display).unwrap();
    session.pointer_move(Point::new(to.0, to.1), display).unwrap();
    session.pointer_up(Point::new(to.0, to.1), display, now).unwrap();
}
