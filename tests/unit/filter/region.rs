use super::*;

const SOURCE: Size = Size::new(1080, 2400);

fn to_source_pixels(p: kurbo::Point) -> (f64, f64) {
    (
        p.x * f64::from(SOURCE.width),
        (1.0 - p.y) * f64::from(SOURCE.height),
    )
}

fn unit_corners() -> [kurbo::Point; 4] {
    [
        kurbo::Point::new(0.0, 0.0),
        kurbo::Point::new(1.0, 0.0),
        kurbo::Point::new(0.0, 1.0),
        kurbo::Point::new(1.0, 1.0),
    ]
}

#[test]
fn inverse_recovers_crop_corners_for_every_quarter_turn() {
    let crops = [
        Rect::new(0, 0, 1080, 2400),
        Rect::new(100, 200, 500, 900),
        Rect::new(1, 2399, 1080, 2400),
        Rect::new(540, 0, 541, 1),
    ];
    for crop in crops {
        for rotation in 0..4u8 {
            let region = RegionTransformBuilder::new(SOURCE)
                .add_crop(crop, false)
                .unwrap()
                .add_rotation(rotation)
                .unwrap();
            let inv = region.inverse_transform().unwrap().unwrap();

            let expected = [
                (crop.left, crop.top),
                (crop.right, crop.top),
                (crop.left, crop.bottom),
                (crop.right, crop.bottom),
            ];
            for corner in unit_corners() {
                let (x, y) = to_source_pixels(inv * corner);
                assert!(
                    expected.iter().any(|&(ex, ey)| {
                        (f64::from(ex) - x).abs() < 1e-6 && (f64::from(ey) - y).abs() < 1e-6
                    }),
                    "crop {crop} rotation {rotation}: corner {corner:?} -> ({x}, {y})"
                );
            }
        }
    }
}

#[test]
fn opposite_rotations_restore_output_size() {
    let base = RegionTransformBuilder::new(SOURCE)
        .add_crop(Rect::new(0, 0, 600, 300), false)
        .unwrap();
    for rotation in 0..4u8 {
        let rotated = base.add_rotation(rotation).unwrap();
        if rotation % 2 == 1 {
            assert_eq!(rotated.output_size(), Size::new(300, 600));
        }
        let restored = rotated.add_rotation((4 - rotation) % 4).unwrap();
        assert_eq!(restored.output_size(), base.output_size());
    }
}

#[test]
fn unlocked_natural_orientation_is_a_no_op() {
    let region = RegionTransformBuilder::new(SOURCE)
        .add_orientation(1, false, Orientation::Orient0)
        .unwrap()
        .add_angle(0.0)
        .unwrap();
    assert_eq!(region.output_size(), SOURCE);
    assert!(region.transform().is_none());
    assert!(region.inverse_transform().unwrap().is_none());
}

#[test]
fn locked_orientation_undoes_display_rotation() {
    // display currently rotated a quarter turn: the source is landscape
    let landscape = Size::new(2400, 1080);
    let region = RegionTransformBuilder::new(landscape)
        .add_orientation(1, true, Orientation::Orient0)
        .unwrap();
    assert_eq!(region.output_size(), Size::new(1080, 2400));

    let region = RegionTransformBuilder::new(landscape)
        .add_orientation(1, true, Orientation::Orient90)
        .unwrap();
    assert_eq!(region.output_size(), landscape);
}

#[test]
fn unlocked_orientation_rotates_relative_to_display() {
    let region = RegionTransformBuilder::new(SOURCE)
        .add_orientation(0, false, Orientation::Orient90)
        .unwrap();
    assert_eq!(region.output_size(), SOURCE.rotate());

    let flipped = RegionTransformBuilder::new(SOURCE)
        .add_orientation(0, false, Orientation::Flip0)
        .unwrap();
    assert_eq!(flipped.output_size(), SOURCE);
    let inv = flipped.inverse_transform().unwrap().unwrap();
    let p = inv * kurbo::Point::new(0.25, 0.5);
    assert!((p.x - 0.75).abs() < 1e-12 && (p.y - 0.5).abs() < 1e-12);
}

#[test]
fn angle_keeps_size_and_center() {
    let region = RegionTransformBuilder::new(SOURCE)
        .add_crop(Rect::new(0, 0, 1000, 500), false)
        .unwrap();
    let rotated = region.add_angle(33.0).unwrap();
    assert_eq!(rotated.output_size(), region.output_size());

    let center = kurbo::Point::new(0.5, 0.5);
    let inv_before = region.inverse_transform().unwrap().unwrap();
    let inv_after = rotated.inverse_transform().unwrap().unwrap();
    let a = inv_before * center;
    let b = inv_after * center;
    assert!((a.x - b.x).abs() < 1e-9 && (a.y - b.y).abs() < 1e-9);

    let corner = kurbo::Point::new(0.0, 0.0);
    assert!((inv_before * corner - inv_after * corner).hypot() > 1e-3);
}

#[test]
fn quarter_turn_angle_preserves_pixel_lengths() {
    // a 90 degree free angle on a 2:1 region rotates content without shearing it
    let region = RegionTransformBuilder::new(Size::new(200, 100))
        .add_angle(90.0)
        .unwrap();
    let inv = region.inverse_transform().unwrap().unwrap();
    let a = inv * kurbo::Point::new(0.5, 0.5);
    let b = inv * kurbo::Point::new(0.5, 0.7);
    // 0.2 of the output height is 20px; in the source it becomes horizontal: 20px / 200px
    assert!(((b.x - a.x).abs() - 0.1).abs() < 1e-9);
    assert!((b.y - a.y).abs() < 1e-9);
}

#[test]
fn zero_crop_yields_empty_region_with_defined_transform() {
    let region = RegionTransformBuilder::new(SOURCE)
        .add_crop(Rect::default(), false)
        .unwrap()
        .add_orientation(0, false, Orientation::Orient0)
        .unwrap()
        .add_angle(15.0)
        .unwrap();
    assert_eq!(region.output_size(), Size::ZERO);
    assert!(region.output_size().is_empty());
    assert!(region.inverse_transform().unwrap().is_none());

    let rotated = RegionTransformBuilder::new(SOURCE)
        .add_crop(Rect::new(10, 10, 10, 50), false)
        .unwrap()
        .add_rotation(1)
        .unwrap();
    assert_eq!(rotated.output_size(), Size::new(40, 0));
    assert!(rotated.inverse_transform().unwrap().is_some());
}

#[test]
fn transposed_crop_swaps_axes() {
    let landscape = Size::new(2400, 1080);
    let region = RegionTransformBuilder::new(landscape)
        .add_crop(Rect::new(0, 0, 100, 50), true)
        .unwrap();
    assert_eq!(region.output_size(), Size::new(50, 100));
}

#[test]
fn crop_outside_source_is_rejected() {
    let err = RegionTransformBuilder::new(SOURCE)
        .add_crop(Rect::new(0, 0, 1081, 10), false)
        .unwrap_err();
    assert!(matches!(err, SplitcapError::Validation(_)));
    assert!(
        RegionTransformBuilder::new(SOURCE)
            .add_crop(Rect::new(-1, 0, 10, 10), false)
            .is_err()
    );
    assert!(
        RegionTransformBuilder::new(SOURCE)
            .add_crop(Rect::new(50, 0, 10, 10), false)
            .is_err()
    );
}

#[test]
fn non_finite_angle_is_rejected() {
    assert!(
        RegionTransformBuilder::new(SOURCE)
            .add_angle(f64::NAN)
            .is_err()
    );
}

#[test]
fn incremental_and_single_pass_composition_agree() {
    let crop = Rect::new(100, 300, 700, 1500);
    let region = RegionTransformBuilder::new(SOURCE)
        .add_crop(crop, false)
        .unwrap()
        .add_orientation(0, false, Orientation::Orient270)
        .unwrap()
        .add_angle(12.5)
        .unwrap();

    let w = f64::from(SOURCE.width);
    let h = f64::from(SOURCE.height);
    let crop_m = affine::reframe(
        f64::from(crop.left) / w,
        1.0 - f64::from(crop.bottom) / h,
        f64::from(crop.width()) / w,
        f64::from(crop.height()) / h,
    )
    .unwrap();
    let orient_m = affine::rotate_ortho(1).unwrap();
    let size = region.output_size();
    let angle_m = affine::from_center(affine::with_aspect_ratio(
        affine::rotate_deg(-12.5),
        f64::from(size.width) / f64::from(size.height),
    ));
    let one_pass = angle_m * orient_m * crop_m;

    let forward = region.transform().unwrap();
    for p in [
        kurbo::Point::new(0.1, 0.2),
        kurbo::Point::new(0.5, 0.5),
        kurbo::Point::new(0.9, 0.4),
    ] {
        let a = forward * p;
        let b = one_pass * p;
        assert!((a.x - b.x).abs() < 1e-9 && (a.y - b.y).abs() < 1e-9);
    }
}
