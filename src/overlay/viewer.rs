//! Navigable review of generated results.

use std::path::{Path, PathBuf};

use image::{GrayImage, ImageError, RgbaImage, imageops};
use maskpaint_backend::{GenerateResponse, data_url};

use crate::coord_map::{CoordinateMapper, DisplayRect, MapError, fit_display};
use crate::geometry::PixelBox;
use crate::overlay::compositor::{OverlayCompositor, OverlayVisibility};

/// Output of one generation call, fixed once created.
#[derive(Debug, Clone)]
pub struct ResultSet {
    pub images: Vec<RgbaImage>,
    /// The mask as it was when generation was requested.
    pub mask: GrayImage,
    pub crop_info: Option<PixelBox>,
    pub bbox: Option<PixelBox>,
    pub output_dir: String,
    pub message: String,
}

impl ResultSet {
    /// Decode the images of a successful generate response.
    ///
    /// The returned boxes are clipped to the mask; a box lying wholly
    /// outside it is dropped.
    pub fn from_response(response: &GenerateResponse, mask: GrayImage) -> maskpaint_backend::Result<Self> {
        let images = response
            .images
            .iter()
            .map(|url| data_url::decode_image(url).map(|img| img.to_rgba8()))
            .collect::<maskpaint_backend::Result<Vec<_>>>()?;
        let (width, height) = mask.dimensions();
        let clip = |b: Option<PixelBox>| b.and_then(|b| b.clipped_to(width, height));
        if response.crop_info.is_some() && clip(response.crop_info) != response.crop_info {
            log::warn!("Crop region {:?} exceeds the {}x{} mask", response.crop_info, width, height);
        }
        Ok(Self {
            images,
            crop_info: clip(response.crop_info),
            bbox: clip(response.bbox),
            mask,
            output_dir: response.output_dir.clone(),
            message: response.message.clone(),
        })
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

/// Position and button enablement for the navigation controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavState {
    pub index: usize,
    pub len: usize,
    pub can_previous: bool,
    pub can_next: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavKey {
    Left,
    Right,
}

/// Whether the displayed image has reported its rendered size yet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ImageLoad {
    Pending { index: usize },
    Loaded { index: usize, width: f32, height: f32 },
}

/// Result review state: current index, overlay toggles and the overlay surface.
#[derive(Debug, Clone, Default)]
pub struct ResultViewer {
    results: Option<ResultSet>,
    current: usize,
    visibility: OverlayVisibility,
    load: Option<ImageLoad>,
    viewport: (u32, u32),
    compositor: OverlayCompositor,
}

impl ResultViewer {
    pub fn new(viewport_width: u32, viewport_height: u32) -> Self {
        Self {
            viewport: (viewport_width, viewport_height),
            compositor: OverlayCompositor::new(viewport_width, viewport_height),
            ..Default::default()
        }
    }

    /// Replace the result set and show its first image.
    pub fn set_results(&mut self, results: ResultSet) {
        log::info!("Reviewing {} generated image(s)", results.len());
        self.results = Some(results);
        self.current = 0;
        self.load = Some(ImageLoad::Pending { index: 0 });
        self.compositor.hide();
    }

    pub fn results(&self) -> Option<&ResultSet> {
        self.results.as_ref()
    }

    pub fn has_results(&self) -> bool {
        self.results.as_ref().is_some_and(|r| !r.is_empty())
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_image(&self) -> Option<&RgbaImage> {
        self.results.as_ref()?.images.get(self.current)
    }

    /// Show the image at `index`, clamped to the valid range.
    ///
    /// The overlay is hidden until the new image reports its rendered size
    /// through [`notify_image_loaded`](Self::notify_image_loaded). Returns
    /// the index actually shown, or `None` when there are no results.
    pub fn show_image(&mut self, index: usize) -> Option<usize> {
        let len = self.results.as_ref().map_or(0, ResultSet::len);
        if len == 0 {
            return None;
        }
        let index = index.min(len - 1);
        if index != self.current {
            log::debug!("Showing result {} of {}", index + 1, len);
        }
        self.current = index;
        self.load = Some(ImageLoad::Pending { index });
        self.compositor.hide();
        Some(index)
    }

    pub fn next_image(&mut self) -> Option<usize> {
        let nav = self.nav_state()?;
        if !nav.can_next {
            return Some(nav.index);
        }
        self.show_image(nav.index + 1)
    }

    pub fn previous_image(&mut self) -> Option<usize> {
        let nav = self.nav_state()?;
        if !nav.can_previous {
            return Some(nav.index);
        }
        self.show_image(nav.index - 1)
    }

    /// Arrow-key navigation. Returns true when the key was handled.
    pub fn handle_key(&mut self, key: NavKey) -> bool {
        if !self.has_results() {
            return false;
        }
        match key {
            NavKey::Left => self.previous_image(),
            NavKey::Right => self.next_image(),
        };
        true
    }

    pub fn nav_state(&self) -> Option<NavState> {
        let len = self.results.as_ref().map_or(0, ResultSet::len);
        (len > 0).then(|| NavState {
            index: self.current,
            len,
            can_previous: self.current > 0,
            can_next: self.current + 1 < len,
        })
    }

    /// "i / n" with a one-based index.
    pub fn counter_label(&self) -> Option<String> {
        self.nav_state()
            .map(|nav| format!("{} / {}", nav.index + 1, nav.len))
    }

    pub fn visibility(&self) -> OverlayVisibility {
        self.visibility
    }

    pub fn image_load(&self) -> Option<ImageLoad> {
        self.load
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    pub fn overlay(&self) -> &OverlayCompositor {
        &self.compositor
    }

    /// Resize the overlay surface to the viewer viewport and redraw.
    pub fn set_viewport(&mut self, width: u32, height: u32) -> Result<(), MapError> {
        self.viewport = (width, height);
        self.compositor.resize(width, height);
        self.refresh_overlay()
    }

    /// The image at `index` finished loading and was rendered at
    /// `width` x `height` on screen.
    ///
    /// Reports for an image that is no longer current are ignored.
    pub fn notify_image_loaded(&mut self, index: usize, width: f32, height: f32) -> Result<(), MapError> {
        if !self.has_results() || index != self.current {
            log::debug!("Ignoring load report for result {} (showing {})", index, self.current);
            return Ok(());
        }
        self.load = Some(ImageLoad::Loaded { index, width, height });
        self.refresh_overlay()
    }

    pub fn toggle_mask(&mut self) -> Result<bool, MapError> {
        self.visibility.mask = !self.visibility.mask;
        self.refresh_overlay()?;
        Ok(self.visibility.mask)
    }

    pub fn toggle_crop(&mut self) -> Result<bool, MapError> {
        self.visibility.crop = !self.visibility.crop;
        self.refresh_overlay()?;
        Ok(self.visibility.crop)
    }

    /// Redraw the overlay for the current image.
    ///
    /// Until the current image has reported its rendered size the surface
    /// stays transparent. A zero-sized layout leaves it transparent as well
    /// and reports the layout error.
    pub fn refresh_overlay(&mut self) -> Result<(), MapError> {
        let (Some(results), Some(ImageLoad::Loaded { index, width, height })) = (&self.results, self.load) else {
            self.compositor.hide();
            return Ok(());
        };
        if index != self.current || !self.visibility.any() {
            self.compositor.hide();
            return Ok(());
        }

        let (native_w, native_h) = results.mask.dimensions();
        let (view_w, view_h) = self.viewport;
        let display = DisplayRect::centered_in(view_w as f32, view_h as f32, width, height);
        let mapper = match CoordinateMapper::new(native_w, native_h, display) {
            Ok(mapper) => mapper,
            Err(err) => {
                log::warn!("Skipping overlay redraw: {}", err);
                self.compositor.hide();
                return Err(err);
            }
        };
        self.compositor
            .render(self.visibility, &results.mask, results.crop_info, &mapper);
        Ok(())
    }

    /// The current image fitted into the viewport with the overlay on top.
    pub fn composite(&self) -> Option<RgbaImage> {
        let image = self.current_image()?;
        let (view_w, view_h) = self.viewport;
        let (fit_w, fit_h) = fit_display(image.width(), image.height(), view_w as f32, view_h as f32);
        let (fit_w, fit_h) = (fit_w.round().max(1.0) as u32, fit_h.round().max(1.0) as u32);

        let scaled = imageops::resize(image, fit_w, fit_h, imageops::FilterType::Triangle);
        let mut out = RgbaImage::new(view_w, view_h);
        let left = (i64::from(view_w) - i64::from(fit_w)) / 2;
        let top = (i64::from(view_h) - i64::from(fit_h)) / 2;
        imageops::overlay(&mut out, &scaled, left, top);
        imageops::overlay(&mut out, self.compositor.surface(), 0, 0);
        Some(out)
    }

    /// Write every result as `sd3_inpaint_{current}_{n}.png` into `dir`.
    pub fn save_all(&self, dir: &Path) -> Result<Vec<PathBuf>, ImageError> {
        let Some(results) = &self.results else {
            return Ok(Vec::new());
        };
        std::fs::create_dir_all(dir).map_err(ImageError::IoError)?;

        let mut written = Vec::with_capacity(results.len());
        for (n, image) in results.images.iter().enumerate() {
            let path = dir.join(format!("sd3_inpaint_{}_{}.png", self.current, n + 1));
            image.save(&path)?;
            written.push(path);
        }
        log::info!("Saved {} result(s) to {}", written.len(), dir.display());
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mask::raster::visit_box;
    use image::{Luma, Rgba};

    fn results(count: usize) -> ResultSet {
        let mut mask = GrayImage::new(80, 60);
        visit_box(PixelBox::new(10, 10, 20, 20), |x, y| mask.put_pixel(x, y, Luma([255])));
        ResultSet {
            images: (0..count)
                .map(|i| RgbaImage::from_pixel(80, 60, Rgba([i as u8 * 40, 100, 100, 255])))
                .collect(),
            mask,
            crop_info: Some(PixelBox::new(0, 0, 50, 50)),
            bbox: Some(PixelBox::new(10, 10, 20, 20)),
            output_dir: "outputs/run".to_string(),
            message: "ok".to_string(),
        }
    }

    fn loaded_viewer(count: usize) -> ResultViewer {
        let mut viewer = ResultViewer::new(160, 120);
        viewer.set_results(results(count));
        viewer.notify_image_loaded(0, 80.0, 60.0).unwrap();
        viewer
    }

    #[test]
    fn test_navigation_through_four_results() {
        let mut viewer = loaded_viewer(4);
        assert_eq!(viewer.show_image(0), Some(0));
        let nav = viewer.nav_state().unwrap();
        assert!(!nav.can_previous && nav.can_next);

        for expected in 1..=3 {
            assert_eq!(viewer.next_image(), Some(expected));
            let nav = viewer.nav_state().unwrap();
            assert!(nav.can_previous);
            assert_eq!(nav.can_next, expected < 3);
        }

        // Next at the end stays put.
        assert_eq!(viewer.next_image(), Some(3));
        assert_eq!(viewer.counter_label().as_deref(), Some("4 / 4"));
    }

    #[test]
    fn test_show_image_clamps() {
        let mut viewer = loaded_viewer(3);
        assert_eq!(viewer.show_image(99), Some(2));
        assert_eq!(viewer.previous_image(), Some(1));
        assert_eq!(viewer.previous_image(), Some(0));
        assert_eq!(viewer.previous_image(), Some(0));
    }

    #[test]
    fn test_empty_viewer() {
        let mut viewer = ResultViewer::new(10, 10);
        assert_eq!(viewer.show_image(0), None);
        assert_eq!(viewer.nav_state(), None);
        assert_eq!(viewer.counter_label(), None);
        assert!(!viewer.handle_key(NavKey::Right));
    }

    #[test]
    fn test_arrow_keys() {
        let mut viewer = loaded_viewer(2);
        assert!(viewer.handle_key(NavKey::Right));
        assert_eq!(viewer.current_index(), 1);
        assert!(viewer.handle_key(NavKey::Left));
        assert_eq!(viewer.current_index(), 0);
    }

    #[test]
    fn test_mask_toggle_on_then_off_restores_surface() {
        let mut viewer = loaded_viewer(2);
        let initial = viewer.overlay().surface().clone();
        assert!(initial.pixels().all(|p| p[3] == 0));

        assert!(viewer.toggle_mask().unwrap());
        assert!(viewer.overlay().is_visible());
        assert_ne!(viewer.overlay().surface(), &initial);

        assert!(!viewer.toggle_mask().unwrap());
        assert_eq!(viewer.overlay().surface(), &initial);
    }

    #[test]
    fn test_overlay_waits_for_load() {
        let mut viewer = loaded_viewer(2);
        viewer.toggle_crop().unwrap();
        assert!(viewer.overlay().is_visible());

        viewer.next_image();
        assert_eq!(viewer.image_load(), Some(ImageLoad::Pending { index: 1 }));
        assert!(!viewer.overlay().is_visible());

        // A late report for the old image changes nothing.
        viewer.notify_image_loaded(0, 80.0, 60.0).unwrap();
        assert!(!viewer.overlay().is_visible());

        viewer.notify_image_loaded(1, 160.0, 120.0).unwrap();
        assert!(viewer.overlay().is_visible());
    }

    #[test]
    fn test_out_of_range_crop_is_clipped_to_mask() {
        let response = GenerateResponse {
            success: true,
            message: String::new(),
            output_dir: String::new(),
            images: Vec::new(),
            crop_info: Some(PixelBox::new(70, 50, 40, 40)),
            bbox: Some(PixelBox::new(u32::MAX - 1, 0, 10, 10)),
        };
        let set = ResultSet::from_response(&response, GrayImage::new(80, 60)).unwrap();
        assert_eq!(set.crop_info, Some(PixelBox::new(70, 50, 10, 10)));
        assert_eq!(set.bbox, None);
    }

    #[test]
    fn test_crop_at_numeric_limit_does_not_panic() {
        let mut viewer = ResultViewer::new(160, 120);
        viewer.set_results(ResultSet {
            crop_info: Some(PixelBox::new(u32::MAX - 1, 0, 10, 10)),
            ..results(1)
        });
        viewer.notify_image_loaded(0, 80.0, 60.0).unwrap();
        assert!(viewer.toggle_crop().unwrap());
        assert_eq!(viewer.overlay().surface().dimensions(), (160, 120));
    }

    #[test]
    fn test_zero_layout_is_a_no_op() {
        let mut viewer = loaded_viewer(1);
        viewer.toggle_mask().unwrap();
        let err = viewer.notify_image_loaded(0, 0.0, 0.0).unwrap_err();
        assert!(matches!(err, MapError::DisplayNotLaidOut { .. }));
        assert!(viewer.overlay().surface().pixels().all(|p| p[3] == 0));
    }

    #[test]
    fn test_composite_has_viewport_size() {
        let mut viewer = loaded_viewer(1);
        viewer.toggle_mask().unwrap();
        let out = viewer.composite().unwrap();
        assert_eq!(out.dimensions(), (160, 120));
    }

    #[test]
    fn test_save_all_names() {
        let dir = std::env::temp_dir().join(format!("maskpaint-save-{}", std::process::id()));
        let mut viewer = loaded_viewer(2);
        viewer.show_image(1);
        let written = viewer.save_all(&dir).unwrap();
        let names: Vec<_> = written
            .iter()
            .filter_map(|p| p.file_name()?.to_str().map(str::to_string))
            .collect();
        assert_eq!(names, ["sd3_inpaint_1_1.png", "sd3_inpaint_1_2.png"]);
        assert!(written.iter().all(|p| p.exists()));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
