//! The editing session: one owner for all mutable state.
//!
//! A [`Session`] holds the loaded image, its mask layers, the drawing tool,
//! mask-info and model state, and the result viewer. Every mutation goes
//! through its methods, so the single-writer rule holds no matter how the
//! front end schedules events.
//!
//! Backend calls are split in two halves. `begin_*` checks preconditions,
//! marks the request kind as in flight and returns the request to send;
//! `complete_*` takes the backend's answer and releases the guard. The
//! `run_*` helpers do both around a blocking [`Backend`] call.

use std::collections::HashSet;
use std::path::Path;

use image::{DynamicImage, GenericImageView, GrayImage};
use maskpaint_backend::{
    Backend, BackendError, GenerateRequest, GenerateResponse, LoadModelsRequest, LoadModelsResponse,
    MaskInfoRequest, MaskInfoResponse, data_url,
};
use web_time::Instant;

use crate::config::{AppConfig, GenerationParams};
use crate::constants::{MASK_TINT_OPACITY, MODEL_INPUT_SIZE};
use crate::coord_map::{CoordinateMapper, DisplayRect, MapError, fit_display};
use crate::error::{RequestKind, Result, SessionError};
use crate::geometry::{PixelBox, Point};
use crate::mask::{MaskInfo, MaskLayers, padded_region};
use crate::overlay::{ResultSet, ResultViewer};
use crate::tool::{DrawTool, ToolEffect, ToolMachine};

#[cfg(test)]
mod tests;

/// Severity of a status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Success,
    Error,
}

/// Message shown to the user after an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub kind: StatusKind,
    pub text: String,
}

/// What started a mask-info request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskInfoTrigger {
    /// The user asked for auto padding; the result fills the padding field.
    Explicit,
    /// Fired after a rectangle commit; only refreshes the displayed box.
    Automatic,
}

/// The image being edited.
#[derive(Debug, Clone)]
pub struct SourceImage {
    pixels: DynamicImage,
    /// Size the image is shown at after fitting into the display limits.
    display_size: (f32, f32),
}

impl SourceImage {
    pub fn pixels(&self) -> &DynamicImage {
        &self.pixels
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    pub fn display_size(&self) -> (f32, f32) {
        self.display_size
    }
}

#[derive(Debug)]
pub struct Session {
    config: AppConfig,
    image: Option<SourceImage>,
    layers: MaskLayers,
    tool: ToolMachine,
    /// Set by any committed mask write, cleared by reset.
    mask_drawn: bool,
    mask_info: Option<MaskInfo>,
    /// Value of the padding field sent with generation requests.
    padding: Option<u32>,
    /// When the automatic mask-info request is due.
    pending_mask_info: Option<Instant>,
    /// Trigger and mask epoch of the running mask-info request.
    mask_info_request: Option<(MaskInfoTrigger, u64)>,
    /// Bumped whenever the mask is reset; replies for older epochs are dropped.
    mask_epoch: u64,
    in_flight: HashSet<RequestKind>,
    models_loaded: bool,
    /// Mask captured when the running generation was requested.
    generation_mask: Option<GrayImage>,
    status: Option<Status>,
    viewer: ResultViewer,
}

impl Session {
    pub fn new(config: AppConfig) -> Self {
        let mut layers = MaskLayers::default();
        layers.mask.set_brush_size(config.brush_size());
        Self {
            config,
            image: None,
            layers,
            tool: ToolMachine::default(),
            mask_drawn: false,
            mask_info: None,
            padding: None,
            pending_mask_info: None,
            mask_info_request: None,
            mask_epoch: 0,
            in_flight: HashSet::new(),
            models_loaded: false,
            generation_mask: None,
            status: None,
            viewer: ResultViewer::default(),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    // ---------------------------------------------------------------------
    // Image

    /// Replace the current image. The mask is reset to the new size.
    pub fn load_image(&mut self, pixels: DynamicImage) -> Result<()> {
        let (width, height) = pixels.dimensions();
        if width == 0 || height == 0 {
            return Err(MapError::EmptyNative { width, height }.into());
        }
        let limits = self.config.max_display;
        let display_size = fit_display(width, height, limits.width, limits.height);

        self.tool.cancel();
        self.layers.reset(width, height);
        self.reset_mask_state();
        self.image = Some(SourceImage { pixels, display_size });
        log::info!(
            "Loaded {}x{} image, displayed at {:.0}x{:.0}",
            width,
            height,
            display_size.0,
            display_size.1
        );
        Ok(())
    }

    /// Decode and load an encoded image.
    pub fn load_image_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.load_image(image::load_from_memory(bytes)?)
    }

    pub fn load_image_path(&mut self, path: &Path) -> Result<()> {
        self.load_image(image::open(path)?)
    }

    pub fn image(&self) -> Option<&SourceImage> {
        self.image.as_ref()
    }

    fn require_image(&self) -> Result<&SourceImage> {
        self.image.as_ref().ok_or(SessionError::NoImage)
    }

    // ---------------------------------------------------------------------
    // Drawing

    pub fn tool(&self) -> DrawTool {
        self.tool.tool()
    }

    pub fn set_tool(&mut self, tool: DrawTool) -> ToolEffect {
        log::debug!("Switched to {} tool", tool.name());
        self.tool.set_tool(tool, &mut self.layers)
    }

    pub fn brush_size(&self) -> u32 {
        self.layers.mask.brush_size()
    }

    pub fn set_brush_size(&mut self, size: u32) {
        self.layers.mask.set_brush_size(size);
    }

    pub fn layers(&self) -> &MaskLayers {
        &self.layers
    }

    pub fn mask_drawn(&self) -> bool {
        self.mask_drawn
    }

    /// Opacity of the mask tint layer.
    pub fn mask_tint_opacity(&self) -> f32 {
        if self.mask_drawn { MASK_TINT_OPACITY } else { 0.0 }
    }

    /// Clear the mask and everything derived from it.
    pub fn clear(&mut self) {
        self.tool.cancel();
        self.layers.clear();
        self.reset_mask_state();
        log::debug!("Mask cleared");
    }

    fn reset_mask_state(&mut self) {
        self.mask_drawn = false;
        self.mask_info = None;
        self.pending_mask_info = None;
        self.mask_epoch = self.mask_epoch.wrapping_add(1);
    }

    /// Map a screen position onto the image shown in `display`.
    fn to_native(&self, screen: Point, display: DisplayRect) -> Result<Point> {
        let (width, height) = self.require_image()?.dimensions();
        let mapper = CoordinateMapper::new(width, height, display)?;
        Ok(mapper.to_native(screen))
    }

    fn apply_effect(&mut self, effect: ToolEffect) -> ToolEffect {
        if effect.mutated_mask() {
            self.mask_drawn = !self.layers.mask.is_empty();
        }
        effect
    }

    pub fn pointer_down(&mut self, screen: Point, display: DisplayRect) -> Result<ToolEffect> {
        let point = self.to_native(screen, display)?;
        let effect = self.tool.pointer_down(point, &mut self.layers);
        Ok(self.apply_effect(effect))
    }

    pub fn pointer_move(&mut self, screen: Point, display: DisplayRect) -> Result<ToolEffect> {
        if !self.tool.is_drawing() {
            return Ok(ToolEffect::Ignored);
        }
        let point = self.to_native(screen, display)?;
        let effect = self.tool.pointer_move(point, &mut self.layers);
        Ok(self.apply_effect(effect))
    }

    /// Finish the drag. A committed rectangle schedules an automatic
    /// mask-info request, due after the configured debounce from `now`.
    pub fn pointer_up(&mut self, screen: Point, display: DisplayRect, now: Instant) -> Result<ToolEffect> {
        if !self.tool.is_drawing() {
            return Ok(ToolEffect::Ignored);
        }
        let point = match self.to_native(screen, display) {
            Ok(point) => point,
            Err(err) => {
                // Nothing sensible to commit against; abandon the drag.
                self.tool.pointer_leave(&mut self.layers);
                return Err(err);
            }
        };
        let effect = self.tool.pointer_up(point, &mut self.layers);
        if let ToolEffect::RectCommitted(rect) = effect {
            log::debug!("Rectangle committed: {:?}", rect);
            if !self.layers.mask.is_empty() {
                self.pending_mask_info = Some(now + self.config.mask_info_debounce());
            }
        }
        Ok(self.apply_effect(effect))
    }

    pub fn pointer_leave(&mut self) -> ToolEffect {
        let effect = self.tool.pointer_leave(&mut self.layers);
        self.apply_effect(effect)
    }

    // ---------------------------------------------------------------------
    // Mask info

    pub fn mask_info(&self) -> Option<&MaskInfo> {
        self.mask_info.as_ref()
    }

    /// Bounding box and auto padding computed without the backend.
    pub fn local_mask_info(&self) -> Option<MaskInfo> {
        MaskInfo::analyze(self.layers.mask.bitmap())
    }

    pub fn padding(&self) -> Option<u32> {
        self.padding
    }

    pub fn set_padding(&mut self, padding: Option<u32>) {
        self.padding = padding;
    }

    /// The region the backend would crop for the current mask and padding.
    ///
    /// `None` when the mask is empty or no padding is set.
    pub fn crop_preview(&self) -> Option<PixelBox> {
        let (width, height) = self.image.as_ref()?.dimensions();
        let padding = self.padding.filter(|&p| p > 0)?;
        let bbox = self.layers.mask.bounding_box()?;
        Some(padded_region(&bbox, padding, width, height))
    }

    pub fn mask_info_due(&self) -> Option<Instant> {
        self.pending_mask_info
    }

    fn ensure_idle(&self, kind: RequestKind) -> Result<()> {
        if self.in_flight.contains(&kind) {
            return Err(SessionError::Busy(kind));
        }
        Ok(())
    }

    fn start(&mut self, kind: RequestKind) -> Result<()> {
        self.ensure_idle(kind)?;
        self.in_flight.insert(kind);
        Ok(())
    }

    fn finish(&mut self, kind: RequestKind) {
        self.in_flight.remove(&kind);
    }

    pub fn is_in_flight(&self, kind: RequestKind) -> bool {
        self.in_flight.contains(&kind)
    }

    /// Image and mask are both required before anything is sent.
    fn check_inputs(&self) -> Result<&SourceImage> {
        let image = self.require_image()?;
        if !self.mask_drawn {
            return Err(SessionError::NoMask);
        }
        Ok(image)
    }

    fn encode_inputs(&self) -> Result<(String, String)> {
        let image = self.check_inputs()?;
        let original = data_url::encode_png(&image.pixels)?;
        let mask = self.layers.mask.serialize()?;
        Ok((original, mask))
    }

    /// Start a mask-info request.
    pub fn begin_mask_info(&mut self, trigger: MaskInfoTrigger) -> Result<MaskInfoRequest> {
        self.check_inputs()?;
        self.ensure_idle(RequestKind::MaskInfo)?;
        let (original_image, mask_image) = self.encode_inputs()?;
        self.start(RequestKind::MaskInfo)?;
        self.mask_info_request = Some((trigger, self.mask_epoch));
        if trigger == MaskInfoTrigger::Explicit {
            self.pending_mask_info = None;
        }
        Ok(MaskInfoRequest {
            original_image,
            mask_image,
        })
    }

    /// Apply the backend's answer to a mask-info request.
    ///
    /// Failures of automatic requests are only logged and return `Ok(None)`.
    /// A reply for a mask that has since been cleared or replaced by a new
    /// image is dropped and also returns `Ok(None)`.
    pub fn complete_mask_info(
        &mut self,
        result: maskpaint_backend::Result<MaskInfoResponse>,
    ) -> Result<Option<MaskInfo>> {
        self.finish(RequestKind::MaskInfo);
        let (trigger, epoch) = self
            .mask_info_request
            .take()
            .unwrap_or((MaskInfoTrigger::Automatic, self.mask_epoch));
        if epoch != self.mask_epoch {
            log::debug!("Dropping mask analysis for a mask that was reset");
            return Ok(None);
        }

        let response = match result {
            Ok(response) => response,
            Err(err) if trigger == MaskInfoTrigger::Automatic => {
                log::warn!("Automatic mask analysis failed: {}", err);
                return Ok(None);
            }
            Err(err) => return Err(self.fail(err.into())),
        };

        let info = response.bbox.map(|bbox| MaskInfo {
            bbox,
            auto_padding: response.auto_padding,
            model_input_size: response.model_input_size.unwrap_or(MODEL_INPUT_SIZE),
        });
        self.mask_info = info;

        if trigger == MaskInfoTrigger::Explicit {
            self.padding = Some(response.auto_padding);
            self.set_status(
                StatusKind::Success,
                format!("Auto padding calculated: {}px", response.auto_padding),
            );
        }
        Ok(info)
    }

    /// Start the automatic mask-info request once its debounce has elapsed.
    ///
    /// Returns `None` while nothing is due. A due request waits while
    /// another mask-info request is still running.
    pub fn poll_mask_info(&mut self, now: Instant) -> Option<MaskInfoRequest> {
        let due = self.pending_mask_info?;
        if now < due || self.is_in_flight(RequestKind::MaskInfo) {
            return None;
        }
        self.pending_mask_info = None;
        match self.begin_mask_info(MaskInfoTrigger::Automatic) {
            Ok(request) => Some(request),
            Err(err) => {
                log::debug!("Skipping automatic mask analysis: {}", err);
                None
            }
        }
    }

    pub fn run_mask_info(&mut self, backend: &dyn Backend) -> Result<Option<MaskInfo>> {
        let request = self.begin_mask_info(MaskInfoTrigger::Explicit)?;
        let result = backend.calculate_mask_info(&request);
        self.complete_mask_info(result)
    }

    /// Run the automatic mask-info request if it is due.
    pub fn run_pending_mask_info(&mut self, backend: &dyn Backend, now: Instant) -> Option<MaskInfo> {
        let request = self.poll_mask_info(now)?;
        let result = backend.calculate_mask_info(&request);
        self.complete_mask_info(result).ok().flatten()
    }

    // ---------------------------------------------------------------------
    // Models

    pub fn models_loaded(&self) -> bool {
        self.models_loaded
    }

    pub fn begin_load_models(&mut self) -> Result<()> {
        self.start(RequestKind::LoadModels)?;
        self.set_status(StatusKind::Info, "Loading models...".to_string());
        Ok(())
    }

    pub fn complete_load_models(
        &mut self,
        result: maskpaint_backend::Result<LoadModelsResponse>,
    ) -> Result<String> {
        self.finish(RequestKind::LoadModels);
        match result {
            Ok(response) => {
                self.models_loaded = true;
                log::info!("Models loaded: {}", response.message);
                self.set_status(StatusKind::Success, response.message.clone());
                Ok(response.message)
            }
            Err(err) => Err(self.fail(err.into())),
        }
    }

    pub fn run_load_models(&mut self, backend: &dyn Backend, request: &LoadModelsRequest) -> Result<String> {
        self.begin_load_models()?;
        let result = backend.load_models(request);
        self.complete_load_models(result)
    }

    pub fn begin_check_model(&mut self) -> Result<()> {
        self.start(RequestKind::CheckModel)
    }

    /// Record whether the backend reports its models as loaded.
    pub fn complete_check_model(&mut self, result: maskpaint_backend::Result<bool>) -> Result<bool> {
        self.finish(RequestKind::CheckModel);
        match result {
            Ok(loaded) => {
                self.models_loaded = loaded;
                if loaded {
                    self.set_status(StatusKind::Success, "Models already loaded".to_string());
                }
                Ok(loaded)
            }
            Err(err) => Err(self.fail(err.into())),
        }
    }

    pub fn run_check_model(&mut self, backend: &dyn Backend) -> Result<bool> {
        self.begin_check_model()?;
        let result = backend.check_model().map(|r| r.loaded);
        self.complete_check_model(result)
    }

    // ---------------------------------------------------------------------
    // Generation

    /// Start a generation request.
    ///
    /// Blank or out-of-range parameters fall back to the configured
    /// defaults, and a missing padding falls back to the padding field. The
    /// mask is captured now; later edits do not affect this request.
    pub fn begin_generation(&mut self, params: GenerationParams) -> Result<GenerateRequest> {
        if !self.models_loaded {
            return Err(SessionError::ModelsNotLoaded);
        }
        self.check_inputs()?;
        self.ensure_idle(RequestKind::Generate)?;
        let (original_image, mask_image) = self.encode_inputs()?;
        self.start(RequestKind::Generate)?;

        let mut params = params.normalized(&self.config.generation);
        if params.padding_mask_crop.is_none() {
            params.padding_mask_crop = self.padding.filter(|&p| p > 0);
        }
        self.generation_mask = Some(self.layers.mask.bitmap().clone());
        log::info!(
            "Generating {} image(s), {} steps, guidance {}, padding {:?}",
            params.num_images,
            params.num_inference_steps,
            params.guidance_scale,
            params.padding_mask_crop
        );
        self.set_status(
            StatusKind::Info,
            format!("Generating {} image(s)...", params.num_images),
        );

        Ok(GenerateRequest {
            original_image,
            mask_image,
            prompt: params.prompt,
            negative_prompt: params.negative_prompt,
            num_images: params.num_images,
            guidance_scale: params.guidance_scale,
            num_inference_steps: params.num_inference_steps,
            padding_mask_crop: params.padding_mask_crop,
        })
    }

    /// Hand the generated images to the viewer. Returns how many arrived.
    pub fn complete_generation(&mut self, result: maskpaint_backend::Result<GenerateResponse>) -> Result<usize> {
        self.finish(RequestKind::Generate);
        let mask = self
            .generation_mask
            .take()
            .unwrap_or_else(|| self.layers.mask.bitmap().clone());

        let results = match result.and_then(|response| ResultSet::from_response(&response, mask)) {
            Ok(results) => results,
            Err(err) => return Err(self.fail(err.into())),
        };
        if results.is_empty() {
            return Err(self.fail(SessionError::NoResults));
        }

        let count = results.len();
        let text = if results.output_dir.is_empty() {
            format!("Generated {} image(s)", count)
        } else {
            format!("Generated {} image(s). Saved to {}", count, results.output_dir)
        };
        log::info!("{}", text);
        self.viewer.set_results(results);
        self.set_status(StatusKind::Success, text);
        Ok(count)
    }

    pub fn run_generation(&mut self, backend: &dyn Backend, params: GenerationParams) -> Result<usize> {
        let request = self.begin_generation(params)?;
        let result = backend.generate(&request);
        self.complete_generation(result)
    }

    // ---------------------------------------------------------------------
    // Review

    pub fn viewer(&self) -> &ResultViewer {
        &self.viewer
    }

    pub fn viewer_mut(&mut self) -> &mut ResultViewer {
        &mut self.viewer
    }

    /// Save every result into `dir`.
    pub fn save_results(&self, dir: &Path) -> Result<Vec<std::path::PathBuf>> {
        if !self.viewer.has_results() {
            return Err(SessionError::NoResults);
        }
        Ok(self.viewer.save_all(dir)?)
    }

    // ---------------------------------------------------------------------
    // Status

    pub fn status(&self) -> Option<&Status> {
        self.status.as_ref()
    }

    fn set_status(&mut self, kind: StatusKind, text: String) {
        self.status = Some(Status { kind, text });
    }

    /// Record a failure in the status line and hand it back.
    fn fail(&mut self, err: SessionError) -> SessionError {
        log::warn!("{}", err);
        let text = match &err {
            SessionError::Backend(BackendError::Rejected(message)) => message.clone(),
            other => other.to_string(),
        };
        self.set_status(StatusKind::Error, text);
        err
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(AppConfig::default())
    }
}
