use super::*;
use crate::{filter::region::RegionTransformBuilder, foundation::core::Rect};

#[test]
fn identity_mapper_keeps_points() {
    let size = Size::new(1024, 2048);
    let mapper = PositionMapper::create(size, None, size);
    assert_eq!(
        mapper.map(Position::new(256, 512, size)),
        Some(PixelPoint::new(256, 512))
    );
}

#[test]
fn cropped_video_maps_back_to_device_pixels() {
    let device = Size::new(1024, 2048);
    let region = RegionTransformBuilder::new(device)
        .add_crop(Rect::new(100, 200, 612, 712), false)
        .unwrap();
    let video = region.output_size();
    assert_eq!(video, Size::new(512, 512));

    let mapper = PositionMapper::create(video, region.inverse_transform().unwrap(), device);
    assert_eq!(
        mapper.map(Position::new(0, 0, video)),
        Some(PixelPoint::new(100, 200))
    );
    assert_eq!(
        mapper.map(Position::new(256, 256, video)),
        Some(PixelPoint::new(356, 456))
    );
}

#[test]
fn scaled_video_maps_to_larger_target() {
    let mapper = PositionMapper::create(Size::new(512, 1024), None, Size::new(1024, 2048));
    assert_eq!(
        mapper.map(Position::new(128, 256, Size::new(512, 1024))),
        Some(PixelPoint::new(256, 512))
    );
}

#[test]
fn mismatched_screen_size_is_rejected() {
    let size = Size::new(1024, 2048);
    let mapper = PositionMapper::create(size, None, size);
    assert_eq!(mapper.map(Position::new(1, 1, size.rotate())), None);
}

#[test]
fn empty_video_maps_nothing() {
    let mapper = PositionMapper::create(Size::ZERO, None, Size::new(8, 8));
    assert_eq!(mapper.map(Position::new(0, 0, Size::ZERO)), None);
}
