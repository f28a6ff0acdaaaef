//! Pointer handling, mask state and mask-info scheduling.

use std::time::Duration;

use web_time::Instant;

use super::{FakeBackend, drag_rect, native_display, session_with_image};
use crate::coord_map::DisplayRect;
use crate::error::SessionError;
use crate::geometry::{PixelBox, Point};
use crate::session::Session;
use crate::tool::{DrawTool, ToolEffect};

#[test]
fn test_pointer_down_without_image() {
    let mut session = Session::default();
    let result = session.pointer_down(Point::new(5.0, 5.0), DisplayRect::sized(100.0, 100.0));
    assert!(matches!(result, Err(SessionError::NoImage)));
    assert!(!session.mask_drawn());
}

#[test]
fn test_rect_scenario_bbox() {
    let mut session = session_with_image(800, 600);
    drag_rect(&mut session, (100.0, 100.0), (300.0, 250.0), Instant::now());
    assert!(session.mask_drawn());

    let backend = FakeBackend::new();
    let info = session.run_mask_info(&backend).unwrap().unwrap();
    assert_eq!(info.bbox, PixelBox::new(100, 100, 200, 150));
    assert_eq!(info.auto_padding, 156);
    assert_eq!(session.padding(), Some(156));
    assert_eq!(info.bbox_label(), "Position: (100, 100), Size: 200 x 150");
    assert_eq!(session.local_mask_info(), Some(info));
}

#[test]
fn test_screen_points_are_mapped_to_native() {
    let mut session = session_with_image(800, 600);
    session.set_brush_size(2);
    // Shown at half size, offset by the letterbox margin.
    let display = DisplayRect::new(10.0, 20.0, 400.0, 300.0);

    session.pointer_down(Point::new(60.0, 70.0), display).unwrap();
    session.pointer_up(Point::new(60.0, 70.0), display, Instant::now()).unwrap();

    let mask = &session.layers().mask;
    assert!(mask.is_selected(100, 100));
    assert!(!mask.is_selected(50, 50));
}

#[test]
fn test_unlaid_display_is_rejected_without_drawing() {
    let mut session = session_with_image(100, 100);
    let result = session.pointer_down(Point::new(5.0, 5.0), DisplayRect::sized(0.0, 0.0));
    assert!(matches!(result, Err(SessionError::Layout(_))));
    assert!(session.layers().mask.is_empty());
    assert!(!session.mask_drawn());
}

#[test]
fn test_mask_tint_follows_drawing() {
    let mut session = session_with_image(100, 100);
    assert_eq!(session.mask_tint_opacity(), 0.0);

    let display = native_display(&session);
    session.pointer_down(Point::new(50.0, 50.0), display).unwrap();
    assert_eq!(session.mask_tint_opacity(), 0.5);

    session.clear();
    assert_eq!(session.mask_tint_opacity(), 0.0);
    assert!(session.layers().mask.is_empty());
}

#[test]
fn test_new_image_resets_mask() {
    let mut session = session_with_image(100, 100);
    drag_rect(&mut session, (10.0, 10.0), (50.0, 50.0), Instant::now());
    assert!(session.mask_drawn());

    let image = image::RgbImage::new(64, 32);
    session.load_image(image::DynamicImage::ImageRgb8(image)).unwrap();
    assert!(!session.mask_drawn());
    assert_eq!(session.layers().mask.dimensions(), (64, 32));
    assert_eq!(session.layers().preview.pixels().dimensions(), (64, 32));
    assert!(session.mask_info_due().is_none());
}

#[test]
fn test_large_image_is_fitted_for_display() {
    let session = session_with_image(2400, 1200);
    assert_eq!(session.image().unwrap().display_size(), (1200.0, 600.0));
}

#[test]
fn test_load_image_bytes() {
    let mut png = Vec::new();
    image::DynamicImage::ImageRgb8(image::RgbImage::new(30, 20))
        .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
        .unwrap();

    let mut session = Session::default();
    session.load_image_bytes(&png).unwrap();
    assert_eq!(session.image().unwrap().dimensions(), (30, 20));

    assert!(matches!(
        session.load_image_bytes(b"not an image"),
        Err(SessionError::Image(_))
    ));
    // The failed load kept the previous image.
    assert_eq!(session.image().unwrap().dimensions(), (30, 20));
}

#[test]
fn test_rect_commit_schedules_automatic_mask_info() {
    let mut session = session_with_image(400, 300);
    let start = Instant::now();
    drag_rect(&mut session, (20.0, 20.0), (60.0, 80.0), start);

    let due = session.mask_info_due().unwrap();
    assert_eq!(due, start + Duration::from_millis(100));

    let backend = FakeBackend::new();
    assert!(session.run_pending_mask_info(&backend, start).is_none());
    assert_eq!(backend.calls.get(), 0);

    let info = session.run_pending_mask_info(&backend, due).unwrap();
    assert_eq!(info.bbox, PixelBox::new(20, 20, 40, 60));
    assert_eq!(session.mask_info(), Some(&info));
    // Automatic requests leave the padding field alone.
    assert_eq!(session.padding(), None);
    assert!(session.mask_info_due().is_none());
}

#[test]
fn test_abandoned_rect_schedules_nothing() {
    let mut session = session_with_image(200, 200);
    let display = native_display(&session);
    session.set_tool(DrawTool::Rect);
    session.pointer_down(Point::new(10.0, 10.0), display).unwrap();
    session.pointer_move(Point::new(90.0, 90.0), display).unwrap();
    assert_eq!(session.pointer_leave(), ToolEffect::PreviewDiscarded);

    assert!(!session.mask_drawn());
    assert!(session.mask_info_due().is_none());
    assert!(session.layers().preview.is_blank());
}

#[test]
fn test_brush_does_not_schedule_mask_info() {
    let mut session = session_with_image(200, 200);
    let display = native_display(&session);
    session.pointer_down(Point::new(10.0, 10.0), display).unwrap();
    session.pointer_move(Point::new(90.0, 90.0), display).unwrap();
    let effect = session
        .pointer_up(Point::new(90.0, 90.0), display, Instant::now())
        .unwrap();

    assert_eq!(effect, ToolEffect::StrokeEnded);
    assert!(session.mask_drawn());
    assert!(session.mask_info_due().is_none());
}

#[test]
fn test_degenerate_rect_leaves_mask_undrawn() {
    let mut session = session_with_image(200, 200);
    drag_rect(&mut session, (50.0, 50.0), (50.0, 120.0), Instant::now());
    assert!(!session.mask_drawn());
    assert!(session.mask_info_due().is_none());
}

#[test]
fn test_tool_switch_mid_rect_discards_preview() {
    let mut session = session_with_image(200, 200);
    let display = native_display(&session);
    session.set_tool(DrawTool::Rect);
    session.pointer_down(Point::new(10.0, 10.0), display).unwrap();
    session.pointer_move(Point::new(80.0, 80.0), display).unwrap();

    assert_eq!(session.set_tool(DrawTool::Brush), ToolEffect::PreviewDiscarded);
    assert!(session.layers().preview.is_blank());
    let effect = session
        .pointer_up(Point::new(80.0, 80.0), display, Instant::now())
        .unwrap();
    assert_eq!(effect, ToolEffect::Ignored);
    assert!(!session.mask_drawn());
}

#[test]
fn test_crop_preview_uses_padding_field() {
    let mut session = session_with_image(800, 600);
    drag_rect(&mut session, (100.0, 100.0), (300.0, 250.0), Instant::now());
    assert_eq!(session.crop_preview(), None);

    session.set_padding(Some(50));
    assert_eq!(session.crop_preview(), Some(PixelBox::new(50, 50, 300, 250)));
}
