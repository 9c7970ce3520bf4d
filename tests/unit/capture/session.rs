use std::cell::RefCell;

use super::*;
use crate::{
    capture::{display::StaticDisplay, position::Position},
    foundation::core::PixelPoint,
    render::{backend::FrameRGBA, cpu::CpuBackend},
};

const RED: [u8; 4] = [255, 0, 0, 255];
const BLUE: [u8; 4] = [0, 0, 255, 255];

#[derive(Default)]
struct RecordingListener {
    seen: RefCell<Vec<(u32, PositionMapper)>>,
}

impl VirtualDisplayListener for RecordingListener {
    fn on_new_virtual_display(&self, display_id: u32, mapper: PositionMapper) {
        self.seen.borrow_mut().push((display_id, mapper));
    }
}

fn session(options: CaptureOptions) -> CaptureSession {
    CaptureSession::new(options, DeviceCapabilities::default()).unwrap()
}

fn half_red_half_blue(width: u32, height: u32) -> FrameRGBA {
    let mut data = Vec::new();
    for _row in 0..height {
        for col in 0..width {
            data.extend_from_slice(if col < width / 2 { &RED } else { &BLUE });
        }
    }
    FrameRGBA::new(width, height, data).unwrap()
}

#[test]
fn full_display_capture_reproduces_frame() {
    let mut display = StaticDisplay::new(0, Size::new(16, 8), 0);
    let mut backend = CpuBackend::new();
    let mut s = session(CaptureOptions::default());

    let plan = s.prepare(&display).unwrap();
    assert!(!plan.dual);
    assert_eq!(plan.transform1, None);
    assert_eq!(s.video_size(), Some(Size::new(16, 8)));

    s.start(&mut backend, &mut display, None).unwrap();
    assert_eq!(display.attached_size(), Some(Size::new(16, 8)));

    let frame = half_red_half_blue(16, 8);
    s.render_frame(&mut backend, &SourceFrame::new(&frame))
        .unwrap();
    assert_eq!(backend.readback_rgba8().unwrap(), frame);

    s.stop(&mut backend);
    assert!(!s.is_started());
    s.release(&mut display);
    assert_eq!(display.attached_size(), None);
}

#[test]
fn unknown_display_is_a_configuration_error() {
    let display = StaticDisplay::new(0, Size::new(16, 8), 0);
    let mut s = session(CaptureOptions {
        display_id: 4,
        ..CaptureOptions::default()
    });
    assert!(matches!(
        s.prepare(&display),
        Err(SplitcapError::Configuration(_))
    ));
    assert!(s.plan().is_none());
}

#[test]
fn invalid_options_are_rejected_at_construction() {
    let options = CaptureOptions {
        angle: f64::INFINITY,
        ..CaptureOptions::default()
    };
    assert!(CaptureSession::new(options, DeviceCapabilities::default()).is_err());
}

#[test]
fn max_size_limits_single_region_and_is_updatable() {
    let display = StaticDisplay::new(0, Size::new(1080, 2400), 0);
    let mut s = session(CaptureOptions {
        max_size: 1200,
        ..CaptureOptions::default()
    });
    s.prepare(&display).unwrap();
    assert_eq!(s.video_size(), Some(Size::new(544, 1200)));

    assert!(s.set_max_size(0));
    assert_eq!(s.video_size(), Some(Size::new(544, 1200)));
    s.prepare(&display).unwrap();
    assert_eq!(s.video_size(), Some(Size::new(1080, 2400)));
}

#[test]
fn dual_region_rounds_each_region_before_packing() {
    let display = StaticDisplay::new(0, Size::new(1080, 2400), 0);
    let mut s = session(CaptureOptions {
        max_size: 1024,
        crop: Some(Rect::new(0, 0, 540, 1200)),
        crop_region2: Some(Rect::new(540, 1200, 1080, 2400)),
        ..CaptureOptions::default()
    });
    let plan = s.prepare(&display).unwrap();
    assert!(plan.dual);
    assert_eq!(plan.video_size(), Size::new(1088, 1200));
    let r2 = plan.layout.region2().unwrap();
    assert_eq!(r2.x, 544);
    assert_eq!(r2.output_size, Size::new(544, 1200));
    assert!(plan.transform2.is_some());
}

#[test]
fn dual_region_without_first_crop_places_second_at_origin() {
    let display = StaticDisplay::new(0, Size::new(1080, 2400), 0);
    let mut s = session(CaptureOptions {
        crop_region2: Some(Rect::new(0, 0, 200, 96)),
        ..CaptureOptions::default()
    });
    let plan = s.prepare(&display).unwrap();
    assert_eq!(plan.video_size(), Size::new(200, 96));
    assert_eq!(plan.layout.region1().unwrap().viewport(), None);
    assert_eq!(plan.layout.region2().unwrap().x, 0);
}

#[test]
fn dual_region_capture_composites_both_halves() {
    let mut display = StaticDisplay::new(0, Size::new(16, 8), 0);
    let mut backend = CpuBackend::new();
    let mut s = session(CaptureOptions {
        crop: Some(Rect::new(8, 0, 16, 8)),
        crop_region2: Some(Rect::new(0, 0, 8, 8)),
        ..CaptureOptions::default()
    });
    s.prepare(&display).unwrap();
    s.start(&mut backend, &mut display, None).unwrap();

    let frame = half_red_half_blue(16, 8);
    s.render_frame(&mut backend, &SourceFrame::new(&frame))
        .unwrap();
    let out = backend.readback_rgba8().unwrap();
    assert_eq!(out.size(), Size::new(16, 8));
    assert_eq!(out.pixel(0, 0), Some(BLUE));
    assert_eq!(out.pixel(7, 7), Some(BLUE));
    assert_eq!(out.pixel(8, 0), Some(RED));
    assert_eq!(out.pixel(15, 7), Some(RED));
    s.stop(&mut backend);
}

#[test]
fn locked_initial_orientation_survives_display_rotation() {
    let display = StaticDisplay::new(0, Size::new(1080, 2400), 0);
    display.rotate(1);
    let mut options = CaptureOptions::default();
    options.set_capture_orientation("@").unwrap();
    let mut s = session(options);

    s.prepare(&display).unwrap();
    assert_eq!(
        s.options().capture_orientation_lock,
        OrientationLock::LockedValue
    );
    assert_eq!(s.options().capture_orientation, Orientation::Orient270);
    assert_eq!(s.video_size(), Some(Size::new(2400, 1080)));

    display.rotate(3);
    s.prepare(&display).unwrap();
    assert_eq!(s.options().capture_orientation, Orientation::Orient270);
    assert_eq!(s.video_size(), Some(Size::new(2400, 1080)));
}

#[test]
fn unlocked_capture_follows_display() {
    let display = StaticDisplay::new(0, Size::new(1080, 2400), 0);
    let mut s = session(CaptureOptions::default());
    s.prepare(&display).unwrap();
    assert_eq!(s.video_size(), Some(Size::new(1080, 2400)));
    display.rotate(1);
    s.prepare(&display).unwrap();
    assert_eq!(s.video_size(), Some(Size::new(2400, 1080)));
}

#[test]
fn display_size_changes_invalidate_the_session() {
    let display = StaticDisplay::new(0, Size::new(1080, 2400), 0);
    let mut s = session(CaptureOptions::default());

    // nothing prepared yet: nothing to compare against
    s.notify_display_size(Size::new(1, 1));
    assert!(!s.is_invalidated());

    s.prepare(&display).unwrap();
    s.notify_display_size(Size::new(1080, 2400));
    assert!(!s.is_invalidated());

    let handle = s.invalidation_handle();
    std::thread::spawn(move || handle.notify_display_size(Size::new(2400, 1080)))
        .join()
        .unwrap();
    assert!(s.is_invalidated());

    s.prepare(&display).unwrap();
    assert!(!s.is_invalidated());
    s.request_invalidate();
    assert!(s.is_invalidated());
}

#[test]
fn missing_protected_buffers_flag_still_prepares() {
    let display = StaticDisplay::new(0, Size::new(64, 64), 0).with_flags(0);
    let mut s = session(CaptureOptions::default());
    assert!(s.prepare(&display).is_ok());
}

#[test]
fn listener_receives_display_and_mapper() {
    let mut backend = CpuBackend::new();
    let listener = RecordingListener::default();

    let mut main = StaticDisplay::new(0, Size::new(1024, 2048), 0).with_virtual_display();
    let mut s = session(CaptureOptions {
        crop: Some(Rect::new(100, 200, 612, 712)),
        ..CaptureOptions::default()
    });
    s.prepare(&main).unwrap();
    s.start(&mut backend, &mut main, Some(&listener)).unwrap();
    {
        let seen = listener.seen.borrow();
        let (id, mapper) = seen[0];
        // the main display keeps its id even when a virtual display was created
        assert_eq!(id, 0);
        assert_eq!(mapper.video_size(), Size::new(512, 512));
        assert_eq!(
            mapper.map(Position::new(0, 0, Size::new(512, 512))),
            Some(PixelPoint::new(100, 200))
        );
    }
    s.stop(&mut backend);

    let mut secondary = StaticDisplay::new(3, Size::new(64, 64), 0).with_virtual_display();
    let mut s = session(CaptureOptions {
        display_id: 3,
        ..CaptureOptions::default()
    });
    s.prepare(&secondary).unwrap();
    s.start(&mut backend, &mut secondary, Some(&listener)).unwrap();
    assert_eq!(listener.seen.borrow()[1].0, 1003);
    s.stop(&mut backend);
}

#[test]
fn lifecycle_misuse_is_reported() {
    let mut display = StaticDisplay::new(0, Size::new(16, 8), 0);
    let mut backend = CpuBackend::new();
    let mut s = session(CaptureOptions::default());
    let frame = FrameRGBA::solid(16, 8, RED);

    assert!(s.start(&mut backend, &mut display, None).is_err());
    assert!(
        s.render_frame(&mut backend, &SourceFrame::new(&frame))
            .is_err()
    );

    s.prepare(&display).unwrap();
    s.start(&mut backend, &mut display, None).unwrap();
    // restart replaces the compositor and re-attaches
    s.start(&mut backend, &mut display, None).unwrap();
    assert!(s.is_started());
    s.stop(&mut backend);
    assert!(
        s.render_frame(&mut backend, &SourceFrame::new(&frame))
            .is_err()
    );
}

#[test]
fn empty_output_cannot_start() {
    let mut display = StaticDisplay::new(0, Size::new(16, 8), 0);
    let mut backend = CpuBackend::new();
    let mut s = session(CaptureOptions {
        crop: Some(Rect::new(4, 4, 4, 4)),
        ..CaptureOptions::default()
    });
    assert_eq!(s.prepare(&display).unwrap().video_size(), Size::ZERO);
    assert!(matches!(
        s.start(&mut backend, &mut display, None),
        Err(SplitcapError::Validation(_))
    ));
    assert_eq!(display.attached_size(), None);
}
