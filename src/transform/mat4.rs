//! Column-major 4x4 matrices, as uploaded to shader uniforms.

/// Column-major 4x4 matrix (`m[col * 4 + row]`).
pub type Mat4 = [f32; 16];

pub const MAT4_IDENTITY: Mat4 = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

/// `a × b` (apply `b` first).
pub fn mul(a: &Mat4, b: &Mat4) -> Mat4 {
    let mut out = [0.0f32; 16];
    for col in 0..4 {
        for row in 0..4 {
            out[col * 4 + row] = (0..4).map(|k| a[k * 4 + row] * b[col * 4 + k]).sum();
        }
    }
    out
}

/// Transform the homogeneous point `(x, y, 0, 1)` and return its `xy` components.
#[inline]
pub fn apply_xy(m: &Mat4, x: f32, y: f32) -> (f32, f32) {
    (m[0] * x + m[4] * y + m[12], m[1] * x + m[5] * y + m[13])
}

/// Serialize to little-endian bytes for a uniform buffer.
pub fn to_le_bytes(m: &Mat4) -> [u8; 64] {
    let mut out = [0u8; 64];
    for (chunk, v) in out.chunks_exact_mut(4).zip(m) {
        chunk.copy_from_slice(&v.to_le_bytes());
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/transform/mat4.rs"]
mod tests;
