use super::*;
use crate::{
    foundation::core::Size,
    layout::planner::{RegionInput, plan_layout},
    render::{backend::FrameRGBA, shader::ProgramSource},
};

#[derive(Default)]
struct MockBackend {
    calls: Vec<&'static str>,
    viewports: Vec<Viewport>,
    user_matrices: Vec<Mat4>,
    fail_create: bool,
    fail_draw: bool,
    fail_second_draw: bool,
    deleted: Vec<ProgramId>,
}

impl CompositeBackend for MockBackend {
    fn ensure_target(&mut self, _size: Size) -> SplitcapResult<()> {
        self.calls.push("ensure_target");
        Ok(())
    }

    fn clear_target(&mut self, _rgba: [u8; 4]) -> SplitcapResult<()> {
        self.calls.push("clear_target");
        Ok(())
    }

    fn create_program(&mut self, _source: &ProgramSource) -> SplitcapResult<ProgramId> {
        self.calls.push("create_program");
        if self.fail_create {
            return Err(SplitcapError::graphics_init("link failed"));
        }
        Ok(ProgramId(7))
    }

    fn use_program(&mut self, _program: ProgramId) -> SplitcapResult<()> {
        self.calls.push("use_program");
        Ok(())
    }

    fn delete_program(&mut self, program: ProgramId) {
        self.calls.push("delete_program");
        self.deleted.push(program);
    }

    fn bind_input(&mut self, _texture: &FrameRGBA) -> SplitcapResult<()> {
        self.calls.push("bind_input");
        Ok(())
    }

    fn set_tex_matrix(&mut self, _m: &Mat4) -> SplitcapResult<()> {
        self.calls.push("set_tex_matrix");
        Ok(())
    }

    fn set_viewport(&mut self, viewport: Viewport) -> SplitcapResult<()> {
        self.calls.push("set_viewport");
        self.viewports.push(viewport);
        Ok(())
    }

    fn set_user_matrix(&mut self, m: &Mat4) -> SplitcapResult<()> {
        self.calls.push("set_user_matrix");
        self.user_matrices.push(*m);
        Ok(())
    }

    fn draw_quad(&mut self) -> SplitcapResult<()> {
        self.calls.push("draw_quad");
        let draws = self.calls.iter().filter(|c| **c == "draw_quad").count();
        if self.fail_draw || (self.fail_second_draw && draws == 2) {
            return Err(SplitcapError::gpu("glDrawArrays"));
        }
        Ok(())
    }

    fn unbind(&mut self) -> SplitcapResult<()> {
        self.calls.push("unbind");
        Ok(())
    }

    fn readback_rgba8(&mut self) -> SplitcapResult<FrameRGBA> {
        self.calls.push("readback_rgba8");
        Ok(FrameRGBA::solid(1, 1, [0; 4]))
    }
}

fn two_region_plan() -> LayoutPlan {
    let shifted = affine::translate(0.25, 0.0);
    plan_layout(
        Some(RegionInput::new(Size::new(100, 200), affine::IDENTITY)),
        Some(RegionInput::new(Size::new(150, 200), shifted)),
        0,
    )
}

#[test]
fn draw_binds_once_and_draws_each_region() {
    let mut backend = MockBackend::default();
    let mut compositor = MultiRegionCompositor::new(&two_region_plan());
    compositor.init(&mut backend).unwrap();

    let tex = FrameRGBA::solid(4, 4, [255; 4]);
    compositor
        .draw(&mut backend, &SourceFrame::new(&tex))
        .unwrap();
    assert_eq!(
        backend.calls,
        vec![
            "create_program",
            "use_program",
            "bind_input",
            "set_tex_matrix",
            "set_viewport",
            "set_user_matrix",
            "draw_quad",
            "set_viewport",
            "set_user_matrix",
            "draw_quad",
            "unbind",
        ]
    );
    assert_eq!(
        backend.viewports,
        vec![Viewport::new(0, 0, 100, 200), Viewport::new(100, 0, 150, 200)]
    );
    assert_eq!(backend.user_matrices[0], affine::to_4x4(affine::IDENTITY));
    assert_eq!(
        backend.user_matrices[1],
        affine::to_4x4(affine::translate(0.25, 0.0))
    );
    assert_eq!(compositor.state(), CompositorState::Initialized);
    compositor.release(&mut backend);
    assert_eq!(backend.deleted, vec![ProgramId(7)]);
}

#[test]
fn empty_regions_are_skipped() {
    let plan = plan_layout(
        Some(RegionInput::new(Size::ZERO, affine::IDENTITY)),
        Some(RegionInput::new(Size::new(64, 64), affine::IDENTITY)),
        0,
    );
    let mut backend = MockBackend::default();
    let mut compositor = MultiRegionCompositor::new(&plan);
    assert_eq!(compositor.drawable_regions(), 1);
    compositor.init(&mut backend).unwrap();
    let tex = FrameRGBA::solid(2, 2, [0; 4]);
    compositor
        .draw(&mut backend, &SourceFrame::new(&tex))
        .unwrap();
    assert_eq!(backend.viewports, vec![Viewport::new(0, 0, 64, 64)]);
    assert_eq!(
        backend.calls.iter().filter(|c| **c == "draw_quad").count(),
        1
    );
    compositor.release(&mut backend);
}

#[test]
fn draw_before_init_is_rejected() {
    let mut backend = MockBackend::default();
    let mut compositor = MultiRegionCompositor::new(&two_region_plan());
    let tex = FrameRGBA::solid(2, 2, [0; 4]);
    let err = compositor
        .draw(&mut backend, &SourceFrame::new(&tex))
        .unwrap_err();
    assert!(matches!(err, SplitcapError::Gpu(_)));
    assert!(backend.calls.is_empty());
}

#[test]
fn failed_init_reports_graphics_init() {
    let mut backend = MockBackend {
        fail_create: true,
        ..MockBackend::default()
    };
    let mut compositor = MultiRegionCompositor::new(&two_region_plan());
    let err = compositor.init(&mut backend).unwrap_err();
    assert!(matches!(err, SplitcapError::GraphicsInit(_)));
    assert_eq!(compositor.state(), CompositorState::Uninitialized);
}

#[test]
fn double_init_is_rejected() {
    let mut backend = MockBackend::default();
    let mut compositor = MultiRegionCompositor::new(&two_region_plan());
    compositor.init(&mut backend).unwrap();
    assert!(compositor.init(&mut backend).is_err());
    compositor.release(&mut backend);
}

#[test]
fn failed_draw_is_fatal() {
    let mut backend = MockBackend {
        fail_draw: true,
        ..MockBackend::default()
    };
    let mut compositor = MultiRegionCompositor::new(&two_region_plan());
    compositor.init(&mut backend).unwrap();
    let tex = FrameRGBA::solid(2, 2, [0; 4]);
    assert!(matches!(
        compositor.draw(&mut backend, &SourceFrame::new(&tex)),
        Err(SplitcapError::Gpu(_))
    ));
    assert_eq!(compositor.state(), CompositorState::Drawing);
    assert_eq!(backend.calls.last(), Some(&"unbind"));
    assert_eq!(
        backend.calls.iter().filter(|c| **c == "draw_quad").count(),
        1
    );

    backend.fail_draw = false;
    backend.calls.clear();
    assert!(
        compositor
            .draw(&mut backend, &SourceFrame::new(&tex))
            .is_err()
    );
    assert!(backend.calls.is_empty());
    compositor.release(&mut backend);
}

#[test]
fn failure_on_second_region_still_unbinds() {
    let mut backend = MockBackend {
        fail_second_draw: true,
        ..MockBackend::default()
    };
    let mut compositor = MultiRegionCompositor::new(&two_region_plan());
    compositor.init(&mut backend).unwrap();
    let tex = FrameRGBA::solid(2, 2, [0; 4]);
    let err = compositor
        .draw(&mut backend, &SourceFrame::new(&tex))
        .unwrap_err();
    assert!(matches!(err, SplitcapError::Gpu(msg) if msg == "glDrawArrays"));
    assert_eq!(
        &backend.calls[backend.calls.len() - 2..],
        &["draw_quad", "unbind"]
    );
    assert_eq!(backend.viewports.len(), 2);
    compositor.release(&mut backend);
}
