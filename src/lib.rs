//! Splitcap composites one or two regions of a captured display into a single video frame.
//!
//! Each region is described by a crop of the display, an orientation and a free rotation
//! angle. The regions are placed side by side in the output and drawn by a single GPU-style
//! program that samples the display frame through each region's inverse transform.
//!
//! # Pipeline overview
//!
//! 1. **Transform**: [`RegionTransformBuilder`] folds crop, orientation and angle into a
//!    normalized-coordinate affine transform and an output size per region.
//! 2. **Layout**: [`plan_layout`] packs the regions into a combined output ([`LayoutPlan`]).
//! 3. **Composite**: [`MultiRegionCompositor`] draws every region of a [`SourceFrame`] into
//!    its viewport through a [`CompositeBackend`] ([`CpuBackend`], or the wgpu backend with
//!    the `gpu` feature).
//! 4. **Session**: [`CaptureSession`] drives the above from the display state and
//!    [`CaptureOptions`], attaches the display and publishes a [`PositionMapper`].
//!
//! Coordinates handed to the compositor follow the GL convention: normalized coordinates
//! have their origin at the bottom-left corner, and viewports are measured from the bottom
//! edge of the output.
#![forbid(unsafe_code)]

mod capture;
mod config;
mod filter;
mod foundation;
mod layout;
mod render;

/// Transform helpers shared by the region pipeline and renderers.
pub mod transform;

pub use capture::display::{
    AttachedDisplay, DeviceCapabilities, DisplayInfo, DisplaySink, DisplaySource,
    FLAG_SUPPORTS_PROTECTED_BUFFERS, StaticDisplay, VirtualDisplayListener,
};
pub use capture::position::{Position, PositionMapper};
pub use capture::session::{CapturePlan, CaptureSession, Invalidation};
pub use config::options::CaptureOptions;
pub use filter::region::RegionTransformBuilder;
pub use foundation::core::{Affine, PixelPoint, Point, Rect, Size, Vec2};
pub use foundation::error::{SplitcapError, SplitcapResult};
pub use foundation::orientation::{Orientation, OrientationLock, parse_capture_orientation};
pub use layout::planner::{
    LayoutPlan, MAX_REGIONS, RegionInput, RegionLayout, Viewport, plan_layout,
};
pub use render::backend::{
    BackendKind, CompositeBackend, FrameRGBA, ProgramId, SourceFrame, create_backend,
};
pub use render::compositor::{CompositorState, MultiRegionCompositor};
pub use render::cpu::CpuBackend;
#[cfg(feature = "gpu")]
pub use render::gpu::WgpuBackend;
pub use render::shader::{
    MULTI_REGION_PROGRAM, ProgramSource, QUAD_TEX_COORDS, QUAD_VERTICES, ResolvedLocations,
};
