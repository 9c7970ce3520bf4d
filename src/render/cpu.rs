use std::collections::HashMap;

use rayon::prelude::*;

use crate::{
    foundation::core::Size,
    foundation::error::{SplitcapError, SplitcapResult},
    layout::planner::Viewport,
    render::{
        backend::{CompositeBackend, FrameRGBA, ProgramId},
        shader::{ProgramSource, ResolvedLocations},
    },
    transform::mat4::{self, MAT4_IDENTITY, Mat4},
};

const TRANSPARENT: [u8; 4] = [0, 0, 0, 0];

/// Software rasterizer that executes the multi-region program on the CPU.
///
/// Sampling is nearest-neighbor. Fragments whose texture coordinate leaves the unit square
/// are written as transparent black; there is no blending, each draw replaces the pixels of
/// its viewport.
pub struct CpuBackend {
    target: Option<FrameRGBA>,
    programs: HashMap<ProgramId, ResolvedLocations>,
    next_program: u32,
    current_program: Option<ProgramId>,
    input: Option<FrameRGBA>,
    tex_matrix: Mat4,
    user_matrix: Mat4,
    viewport: Option<Viewport>,
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuBackend {
    pub fn new() -> Self {
        Self {
            target: None,
            programs: HashMap::new(),
            next_program: 1,
            current_program: None,
            input: None,
            tex_matrix: MAT4_IDENTITY,
            user_matrix: MAT4_IDENTITY,
            viewport: None,
        }
    }

    pub fn target(&self) -> Option<&FrameRGBA> {
        self.target.as_ref()
    }
}

/// Texel at normalized `(u, v)`, where `v` counts from the first stored row.
fn sample_nearest(tex: &FrameRGBA, u: f32, v: f32) -> [u8; 4] {
    let col = ((u * tex.width as f32).floor().max(0.0) as u32).min(tex.width - 1);
    let row = ((v * tex.height as f32).floor().max(0.0) as u32).min(tex.height - 1);
    tex.pixel(col, row).unwrap_or(TRANSPARENT)
}

impl CompositeBackend for CpuBackend {
    fn ensure_target(&mut self, size: Size) -> SplitcapResult<()> {
        if size.is_empty() {
            return Err(SplitcapError::validation(format!(
                "render target must be non-empty, got {size}"
            )));
        }
        if self.target.as_ref().map(FrameRGBA::size) != Some(size) {
            self.target = Some(FrameRGBA::solid(size.width, size.height, TRANSPARENT));
        }
        Ok(())
    }

    fn clear_target(&mut self, rgba: [u8; 4]) -> SplitcapResult<()> {
        let target = self
            .target
            .as_mut()
            .ok_or_else(|| SplitcapError::gpu("clear: no render target"))?;
        target
            .data
            .par_chunks_exact_mut(4)
            .for_each(|px| px.copy_from_slice(&rgba));
        Ok(())
    }

    fn create_program(&mut self, source: &ProgramSource) -> SplitcapResult<ProgramId> {
        let locations = source.resolve_glsl_locations()?;
        let id = ProgramId(self.next_program);
        self.next_program += 1;
        self.programs.insert(id, locations);
        Ok(id)
    }

    fn use_program(&mut self, program: ProgramId) -> SplitcapResult<()> {
        if !self.programs.contains_key(&program) {
            return Err(SplitcapError::gpu(format!(
                "use_program: unknown program {}",
                program.0
            )));
        }
        self.current_program = Some(program);
        Ok(())
    }

    fn delete_program(&mut self, program: ProgramId) {
        self.programs.remove(&program);
        if self.current_program == Some(program) {
            self.current_program = None;
        }
    }

    fn bind_input(&mut self, texture: &FrameRGBA) -> SplitcapResult<()> {
        if texture.size().is_empty() {
            return Err(SplitcapError::gpu("bind_input: empty texture"));
        }
        self.input = Some(texture.clone());
        Ok(())
    }

    fn set_tex_matrix(&mut self, m: &Mat4) -> SplitcapResult<()> {
        self.tex_matrix = *m;
        Ok(())
    }

    fn set_viewport(&mut self, viewport: Viewport) -> SplitcapResult<()> {
        self.viewport = Some(viewport);
        Ok(())
    }

    fn set_user_matrix(&mut self, m: &Mat4) -> SplitcapResult<()> {
        self.user_matrix = *m;
        Ok(())
    }

    fn draw_quad(&mut self) -> SplitcapResult<()> {
        if self.current_program.is_none() {
            return Err(SplitcapError::gpu("draw_quad: no program in use"));
        }
        let input = self
            .input
            .as_ref()
            .ok_or_else(|| SplitcapError::gpu("draw_quad: no input texture bound"))?;
        let viewport = self
            .viewport
            .ok_or_else(|| SplitcapError::gpu("draw_quad: no viewport set"))?;
        let target = self
            .target
            .as_mut()
            .ok_or_else(|| SplitcapError::gpu("draw_quad: no render target"))?;
        if viewport.width == 0 || viewport.height == 0 {
            return Ok(());
        }

        let m = mat4::mul(&self.tex_matrix, &self.user_matrix);
        let (tw, th) = (target.width, target.height);
        let x0 = viewport.x.min(tw);
        let x1 = viewport.x.saturating_add(viewport.width).min(tw);
        let (vw, vh) = (viewport.width as f32, viewport.height as f32);

        target
            .data
            .par_chunks_exact_mut(tw as usize * 4)
            .enumerate()
            .for_each(|(row, line)| {
                // window coordinates count rows from the bottom
                let gy = th - 1 - row as u32;
                if gy < viewport.y || gy - viewport.y >= viewport.height {
                    return;
                }
                let qy = ((gy - viewport.y) as f32 + 0.5) / vh;
                for x in x0..x1 {
                    let qx = ((x - viewport.x) as f32 + 0.5) / vw;
                    let (u, v) = mat4::apply_xy(&m, qx, qy);
                    let rgba = if (0.0..=1.0).contains(&u) && (0.0..=1.0).contains(&v) {
                        sample_nearest(input, u, v)
                    } else {
                        TRANSPARENT
                    };
                    let idx = x as usize * 4;
                    line[idx..idx + 4].copy_from_slice(&rgba);
                }
            });
        Ok(())
    }

    fn unbind(&mut self) -> SplitcapResult<()> {
        self.input = None;
        self.current_program = None;
        Ok(())
    }

    fn readback_rgba8(&mut self) -> SplitcapResult<FrameRGBA> {
        self.target
            .clone()
            .ok_or_else(|| SplitcapError::gpu("readback: no render target"))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/cpu.rs"]
mod tests;
