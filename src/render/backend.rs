use crate::{
    foundation::core::Size,
    foundation::error::{SplitcapError, SplitcapResult},
    layout::planner::Viewport,
    render::shader::ProgramSource,
    transform::{affine, mat4::Mat4},
};

/// Straight-alpha RGBA8 pixels, rows stored top to bottom.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRGBA {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl FrameRGBA {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> SplitcapResult<Self> {
        let expected = (width as usize) * (height as usize) * 4;
        if data.len() != expected {
            return Err(SplitcapError::validation(format!(
                "frame data has {} bytes, {width}x{height} RGBA8 needs {expected}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let data = rgba
            .iter()
            .copied()
            .cycle()
            .take((width as usize) * (height as usize) * 4)
            .collect();
        Self {
            width,
            height,
            data,
        }
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Pixel at column `x`, row `y` (top-down).
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        Some([
            self.data[idx],
            self.data[idx + 1],
            self.data[idx + 2],
            self.data[idx + 3],
        ])
    }
}

/// One input frame together with its texture matrix.
///
/// The texture matrix maps normalized coordinates (bottom-left origin) to the texture's own
/// sampling coordinates. Embedders streaming from a platform surface pass the matrix that
/// surface reports with each frame.
#[derive(Clone, Copy, Debug)]
pub struct SourceFrame<'a> {
    pub texture: &'a FrameRGBA,
    pub tex_matrix: Mat4,
}

impl<'a> SourceFrame<'a> {
    /// A frame stored top-down, sampled upright.
    pub fn new(texture: &'a FrameRGBA) -> Self {
        Self {
            texture,
            tex_matrix: affine::to_4x4(affine::vflip()),
        }
    }

    pub fn with_tex_matrix(texture: &'a FrameRGBA, tex_matrix: Mat4) -> Self {
        Self {
            texture,
            tex_matrix,
        }
    }
}

/// Handle to a linked program owned by a backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ProgramId(pub u32);

/// The graphics-context operations the compositor needs.
///
/// Calls mirror a GL-style state machine: bind state, then draw. Backends report failures of
/// a single command as [`SplitcapError::Gpu`], and program creation failures as
/// [`SplitcapError::GraphicsInit`].
pub trait CompositeBackend {
    /// (Re)allocate the render target. Contents are undefined until cleared.
    fn ensure_target(&mut self, size: Size) -> SplitcapResult<()>;
    fn clear_target(&mut self, rgba: [u8; 4]) -> SplitcapResult<()>;

    fn create_program(&mut self, source: &ProgramSource) -> SplitcapResult<ProgramId>;
    fn use_program(&mut self, program: ProgramId) -> SplitcapResult<()>;
    fn delete_program(&mut self, program: ProgramId);

    fn bind_input(&mut self, texture: &FrameRGBA) -> SplitcapResult<()>;
    fn set_tex_matrix(&mut self, m: &Mat4) -> SplitcapResult<()>;
    fn set_viewport(&mut self, viewport: Viewport) -> SplitcapResult<()>;
    fn set_user_matrix(&mut self, m: &Mat4) -> SplitcapResult<()>;
    /// Draw the full-viewport quad with the bound state.
    fn draw_quad(&mut self) -> SplitcapResult<()>;
    /// Unbind the input and the program. Pending draws are flushed.
    fn unbind(&mut self) -> SplitcapResult<()>;

    fn readback_rgba8(&mut self) -> SplitcapResult<FrameRGBA>;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    #[default]
    Cpu,
    #[cfg(feature = "gpu")]
    Gpu,
}

pub fn create_backend(kind: BackendKind) -> SplitcapResult<Box<dyn CompositeBackend>> {
    match kind {
        BackendKind::Cpu => Ok(Box::new(crate::render::cpu::CpuBackend::new())),
        #[cfg(feature = "gpu")]
        BackendKind::Gpu => Ok(Box::new(crate::render::gpu::WgpuBackend::new()?)),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/backend.rs"]
mod tests;
