use super::*;

#[test]
fn identity_is_neutral_for_mul() {
    let m: Mat4 = [
        2.0, 0.5, 0.0, 0.0, //
        -1.0, 3.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        4.0, 5.0, 0.0, 1.0,
    ];
    assert_eq!(mul(&MAT4_IDENTITY, &m), m);
    assert_eq!(mul(&m, &MAT4_IDENTITY), m);
}

#[test]
fn apply_xy_uses_translation_column() {
    let mut m = MAT4_IDENTITY;
    m[12] = 0.25;
    m[13] = -0.5;
    assert_eq!(apply_xy(&m, 1.0, 1.0), (1.25, 0.5));
}

#[test]
fn le_bytes_follow_column_order() {
    let bytes = to_le_bytes(&MAT4_IDENTITY);
    assert_eq!(&bytes[0..4], &1.0f32.to_le_bytes());
    assert_eq!(&bytes[4..8], &0.0f32.to_le_bytes());
    assert_eq!(&bytes[60..64], &1.0f32.to_le_bytes());
}
