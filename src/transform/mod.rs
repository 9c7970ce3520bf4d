/// Affine transforms over normalized texture coordinates.
pub mod affine;
/// Column-major 4x4 matrices for shader uniforms.
pub mod mat4;
