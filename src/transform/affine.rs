//! Affine transform helpers.
//!
//! Matrices use kurbo's coefficient layout `[a, b, c, d, e, f]`:
//!
//! ```text
//! | a c e |
//! | b d f |
//! | 0 0 1 |
//! ```
//!
//! Normalized coordinates follow the GL texture convention: `(0, 0)` is the bottom-left corner
//! and `(1, 1)` the top-right corner of the unit square.

use crate::foundation::core::{Affine, PixelPoint, Size, Vec2};
use crate::foundation::error::{SplitcapError, SplitcapResult};
use crate::transform::mat4::Mat4;

/// The identity transform.
pub const IDENTITY: Affine = Affine::IDENTITY;

/// Apply `b` first, then `a`.
#[inline]
pub fn compose(a: Affine, b: Affine) -> Affine {
    a * b
}

#[inline]
pub fn identity() -> Affine {
    IDENTITY
}

/// Invert `m`, rejecting degenerate (zero-scale) transforms.
pub fn invert(m: Affine) -> SplitcapResult<Affine> {
    let det = m.determinant();
    if det == 0.0 || !det.is_finite() {
        return Err(SplitcapError::non_invertible(format!(
            "determinant is {det} for {:?}",
            m.as_coeffs()
        )));
    }
    let inv = m.inverse();
    if !inv.is_finite() {
        return Err(SplitcapError::non_invertible(format!(
            "inverse of {:?} is not finite",
            m.as_coeffs()
        )));
    }
    Ok(inv)
}

/// Expand into a column-major 4x4 homogeneous matrix for GPU upload.
pub fn to_4x4(m: Affine) -> Mat4 {
    let [a, b, c, d, e, f] = m.as_coeffs().map(|v| v as f32);
    [
        a, b, 0.0, 0.0, //
        c, d, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        e, f, 0.0, 1.0,
    ]
}

pub fn translate(x: f64, y: f64) -> Affine {
    Affine::translate(Vec2::new(x, y))
}

pub fn scale(x: f64, y: f64) -> Affine {
    Affine::scale_non_uniform(x, y)
}

/// Map the rectangle `(x, y, w, h)` onto the unit square.
pub fn reframe(x: f64, y: f64, w: f64, h: f64) -> SplitcapResult<Affine> {
    if w == 0.0 || h == 0.0 {
        return Err(SplitcapError::non_invertible(format!(
            "cannot reframe to an empty area: {w}x{h}"
        )));
    }
    Ok(scale(1.0 / w, 1.0 / h) * translate(-x, -y))
}

/// Counter-clockwise rotation of the unit square by `ccw_rotation` quarter turns.
pub fn rotate_ortho(ccw_rotation: u8) -> SplitcapResult<Affine> {
    let coeffs = match ccw_rotation {
        0 => return Ok(IDENTITY),
        1 => [0.0, 1.0, -1.0, 0.0, 1.0, 0.0],
        2 => [-1.0, 0.0, 0.0, -1.0, 1.0, 1.0],
        3 => [0.0, -1.0, 1.0, 0.0, 0.0, 1.0],
        other => {
            return Err(SplitcapError::validation(format!(
                "orthogonal rotation must be in 0..4, got {other}"
            )));
        }
    };
    Ok(Affine::new(coeffs))
}

/// Counter-clockwise rotation about the origin.
pub fn rotate_deg(ccw_degrees: f64) -> Affine {
    Affine::rotate(ccw_degrees.to_radians())
}

/// Horizontal flip of the unit square.
pub fn hflip() -> Affine {
    Affine::new([-1.0, 0.0, 0.0, 1.0, 1.0, 0.0])
}

/// Vertical flip of the unit square.
pub fn vflip() -> Affine {
    Affine::new([1.0, 0.0, 0.0, -1.0, 0.0, 1.0])
}

/// Conjugate `m` so that it operates on a square space of aspect ratio `ar` (width / height).
pub fn with_aspect_ratio(m: Affine, ar: f64) -> Affine {
    scale(1.0 / ar, 1.0) * m * scale(ar, 1.0)
}

/// Conjugate `m` so that it operates around the center of the unit square.
pub fn from_center(m: Affine) -> Affine {
    translate(0.5, 0.5) * m * translate(-0.5, -0.5)
}

/// Pixel coordinates (top-left origin) to normalized coordinates (bottom-left origin).
pub fn ndc_from_pixels(size: Size) -> Affine {
    let w = f64::from(size.width);
    let h = f64::from(size.height);
    Affine::new([1.0 / w, 0.0, 0.0, -1.0 / h, 0.0, 1.0])
}

/// Normalized coordinates (bottom-left origin) to pixel coordinates (top-left origin).
pub fn ndc_to_pixels(size: Size) -> Affine {
    let w = f64::from(size.width);
    let h = f64::from(size.height);
    Affine::new([w, 0.0, 0.0, -h, 0.0, h])
}

/// Apply `m` to an integer point, truncating the result toward zero.
pub fn apply(m: Affine, point: PixelPoint) -> PixelPoint {
    let p = m * kurbo::Point::new(f64::from(point.x), f64::from(point.y));
    PixelPoint::new(p.x as i32, p.y as i32)
}

#[cfg(test)]
#[path = "../../tests/unit/transform/affine.rs"]
mod tests;
