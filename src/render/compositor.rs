use std::marker::PhantomData;

use crate::{
    foundation::error::{SplitcapError, SplitcapResult},
    layout::planner::{LayoutPlan, MAX_REGIONS, Viewport},
    render::{
        backend::{CompositeBackend, ProgramId, SourceFrame},
        shader::MULTI_REGION_PROGRAM,
    },
    transform::{affine, mat4::Mat4},
};

/// Lifecycle of a [`MultiRegionCompositor`]. There is no released state: releasing consumes
/// the compositor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompositorState {
    Uninitialized,
    Initialized,
    /// A draw is in flight. A compositor left here by a failed draw refuses further draws.
    Drawing,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct RegionDraw {
    viewport: Viewport,
    user_matrix: Mat4,
}

/// Draws every configured region of one input frame into its viewport of the combined
/// output, in a single pass over a shared program.
///
/// Bound to the thread owning the graphics context: the type is neither `Send` nor `Sync`.
pub struct MultiRegionCompositor {
    draws: [Option<RegionDraw>; MAX_REGIONS],
    program: Option<ProgramId>,
    state: CompositorState,
    _not_send: PhantomData<*const ()>,
}

impl MultiRegionCompositor {
    /// Regions without a drawable viewport are dropped here and never drawn.
    pub fn new(plan: &LayoutPlan) -> Self {
        let draws = plan.regions.map(|region| {
            let region = region?;
            Some(RegionDraw {
                viewport: region.viewport()?,
                user_matrix: affine::to_4x4(region.inverse_transform),
            })
        });
        Self {
            draws,
            program: None,
            state: CompositorState::Uninitialized,
            _not_send: PhantomData,
        }
    }

    pub fn state(&self) -> CompositorState {
        self.state
    }

    /// Number of regions a draw will render.
    pub fn drawable_regions(&self) -> usize {
        self.draws.iter().flatten().count()
    }

    /// Compile and link the shared program. Must run on the graphics thread.
    #[tracing::instrument(skip_all)]
    pub fn init(&mut self, backend: &mut dyn CompositeBackend) -> SplitcapResult<()> {
        if self.state != CompositorState::Uninitialized {
            return Err(SplitcapError::graphics_init(
                "compositor is already initialized",
            ));
        }
        let program = backend.create_program(&MULTI_REGION_PROGRAM)?;
        self.program = Some(program);
        self.state = CompositorState::Initialized;
        tracing::debug!(
            program = program.0,
            regions = self.drawable_regions(),
            "multi-region compositor initialized"
        );
        Ok(())
    }

    /// Render all drawable regions of `frame`.
    ///
    /// Errors are fatal: the compositor stays in [`CompositorState::Drawing`] and rejects every
    /// later draw.
    pub fn draw(
        &mut self,
        backend: &mut dyn CompositeBackend,
        frame: &SourceFrame<'_>,
    ) -> SplitcapResult<()> {
        let program = match (self.state, self.program) {
            (CompositorState::Initialized, Some(program)) => program,
            (CompositorState::Drawing, _) => {
                return Err(SplitcapError::gpu(
                    "compositor is unusable after a failed draw",
                ));
            }
            _ => return Err(SplitcapError::gpu("compositor is not initialized")),
        };
        self.state = CompositorState::Drawing;

        let drawn = (|| -> SplitcapResult<()> {
            backend.use_program(program)?;
            backend.bind_input(frame.texture)?;
            backend.set_tex_matrix(&frame.tex_matrix)?;
            for draw in self.draws.iter().flatten() {
                backend.set_viewport(draw.viewport)?;
                backend.set_user_matrix(&draw.user_matrix)?;
                backend.draw_quad()?;
            }
            Ok(())
        })();
        // bindings are dropped even when a command failed; the first error wins
        let unbound = backend.unbind();
        drawn.and(unbound)?;

        self.state = CompositorState::Initialized;
        Ok(())
    }

    /// Delete the program. Must run on the graphics thread.
    pub fn release(mut self, backend: &mut dyn CompositeBackend) {
        if let Some(program) = self.program.take() {
            backend.delete_program(program);
            tracing::debug!(program = program.0, "multi-region compositor released");
        }
    }
}

impl Drop for MultiRegionCompositor {
    fn drop(&mut self) {
        if let Some(program) = self.program {
            tracing::warn!(
                program = program.0,
                "compositor dropped without release, program leaked"
            );
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/compositor.rs"]
mod tests;
