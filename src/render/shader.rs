//! The multi-region sampling program.
//!
//! The vertex stage passes a full-viewport quad through unchanged and computes
//! `tex_coords = (tex_matrix * user_matrix * tex_coords_in).xy`. The fragment stage samples the
//! input texture and writes transparent black wherever either coordinate leaves `[0, 1]`.
//!
//! The GLSL ES pair is what platform embedders hand to their GLES driver (the input is an
//! external streaming texture there); the WGSL module is the same program for the wgpu
//! backend.

use crate::foundation::error::{SplitcapError, SplitcapResult};

pub const ATTR_VERTEX_POS: &str = "vertex_pos";
pub const ATTR_TEX_COORDS_IN: &str = "tex_coords_in";
pub const UNIFORM_TEX: &str = "tex";
pub const UNIFORM_TEX_MATRIX: &str = "tex_matrix";
pub const UNIFORM_USER_MATRIX: &str = "user_matrix";

/// Quad corners in device coordinates, triangle-strip order.
pub const QUAD_VERTICES: [[f32; 2]; 4] = [[-1.0, -1.0], [1.0, -1.0], [-1.0, 1.0], [1.0, 1.0]];

/// Texture coordinates matching [`QUAD_VERTICES`].
pub const QUAD_TEX_COORDS: [[f32; 2]; 4] = [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]];

const VERTEX_GLSL: &str = "#version 100
attribute vec4 vertex_pos;
attribute vec4 tex_coords_in;
varying vec2 tex_coords;
uniform mat4 tex_matrix;
uniform mat4 user_matrix;
void main() {
    gl_Position = vertex_pos;
    tex_coords = (tex_matrix * user_matrix * tex_coords_in).xy;
}
";

const FRAGMENT_GLSL: &str = "#version 100
#extension GL_OES_EGL_image_external : require
precision highp float;
uniform samplerExternalOES tex;
varying vec2 tex_coords;
void main() {
    if (tex_coords.x >= 0.0 && tex_coords.x <= 1.0
            && tex_coords.y >= 0.0 && tex_coords.y <= 1.0) {
        gl_FragColor = texture2D(tex, tex_coords);
    } else {
        gl_FragColor = vec4(0.0, 0.0, 0.0, 0.0);
    }
}
";

const WGSL: &str = r#"
struct VsIn {
  @location(0) vertex_pos: vec2<f32>,
  @location(1) tex_coords_in: vec2<f32>,
};

struct VsOut {
  @builtin(position) pos: vec4<f32>,
  @location(0) tex_coords: vec2<f32>,
};

@group(0) @binding(0) var tex: texture_2d<f32>;
@group(0) @binding(1) var tex_sampler: sampler;
@group(0) @binding(2) var<uniform> tex_matrix: mat4x4<f32>;
@group(0) @binding(3) var<uniform> user_matrix: mat4x4<f32>;

@vertex
fn vs(in: VsIn) -> VsOut {
  var o: VsOut;
  o.pos = vec4<f32>(in.vertex_pos, 0.0, 1.0);
  o.tex_coords = (tex_matrix * user_matrix * vec4<f32>(in.tex_coords_in, 0.0, 1.0)).xy;
  return o;
}

@fragment
fn fs(in: VsOut) -> @location(0) vec4<f32> {
  let c = textureSample(tex, tex_sampler, in.tex_coords);
  let inside = all(in.tex_coords >= vec2<f32>(0.0)) && all(in.tex_coords <= vec2<f32>(1.0));
  return select(vec4<f32>(0.0), c, inside);
}
"#;

/// Source and interface of a program, as handed to a backend.
#[derive(Clone, Copy, Debug)]
pub struct ProgramSource {
    pub label: &'static str,
    pub vertex_glsl: &'static str,
    pub fragment_glsl: &'static str,
    pub wgsl: &'static str,
    /// Vertex attributes, in location order.
    pub attributes: &'static [&'static str],
    pub uniforms: &'static [&'static str],
}

pub const MULTI_REGION_PROGRAM: ProgramSource = ProgramSource {
    label: "splitcap_multi_region",
    vertex_glsl: VERTEX_GLSL,
    fragment_glsl: FRAGMENT_GLSL,
    wgsl: WGSL,
    attributes: &[ATTR_VERTEX_POS, ATTR_TEX_COORDS_IN],
    uniforms: &[UNIFORM_TEX, UNIFORM_TEX_MATRIX, UNIFORM_USER_MATRIX],
};

/// Locations resolved against the GLSL stages.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolvedLocations {
    pub attributes: Vec<(&'static str, u32)>,
    pub uniforms: Vec<(&'static str, u32)>,
}

impl ResolvedLocations {
    pub fn attribute(&self, name: &str) -> Option<u32> {
        self.attributes
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, loc)| *loc)
    }

    pub fn uniform(&self, name: &str) -> Option<u32> {
        self.uniforms
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, loc)| *loc)
    }
}

/// Declared names of `qualifier` (`attribute`, `uniform`) in declaration order.
fn declarations<'a>(
    source: &'a str,
    qualifier: &'static str,
) -> impl Iterator<Item = &'a str> + 'a {
    source.lines().filter_map(move |line| {
        let mut words = line.trim().trim_end_matches(';').split_whitespace();
        if words.next()? != qualifier {
            return None;
        }
        let _ty = words.next()?;
        words.next()
    })
}

impl ProgramSource {
    /// Resolve every declared attribute and uniform the way a GL link step does.
    ///
    /// Fails with [`SplitcapError::GraphicsInit`] when a required name is not declared.
    pub fn resolve_glsl_locations(&self) -> SplitcapResult<ResolvedLocations> {
        let vertex_attributes: Vec<&str> = declarations(self.vertex_glsl, "attribute").collect();
        let mut declared_uniforms: Vec<&str> = declarations(self.vertex_glsl, "uniform").collect();
        for name in declarations(self.fragment_glsl, "uniform") {
            if !declared_uniforms.contains(&name) {
                declared_uniforms.push(name);
            }
        }

        let mut resolved = ResolvedLocations::default();
        for &name in self.attributes {
            let loc = vertex_attributes
                .iter()
                .position(|n| *n == name)
                .ok_or_else(|| {
                    SplitcapError::graphics_init(format!(
                        "{}: failed to get '{name}' attribute location",
                        self.label
                    ))
                })?;
            resolved.attributes.push((name, loc as u32));
        }
        for &name in self.uniforms {
            let loc = declared_uniforms
                .iter()
                .position(|n| *n == name)
                .ok_or_else(|| {
                    SplitcapError::graphics_init(format!(
                        "{}: failed to get '{name}' uniform location",
                        self.label
                    ))
                })?;
            resolved.uniforms.push((name, loc as u32));
        }
        Ok(resolved)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/shader.rs"]
mod tests;
