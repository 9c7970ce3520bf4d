use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
};

use crate::{
    capture::{
        display::{
            DeviceCapabilities, DisplayInfo, DisplaySink, DisplaySource, VirtualDisplayListener,
        },
        position::PositionMapper,
    },
    config::options::CaptureOptions,
    filter::region::RegionTransformBuilder,
    foundation::core::{Affine, Rect, Size},
    foundation::error::{SplitcapError, SplitcapResult},
    foundation::orientation::{Orientation, OrientationLock},
    layout::planner::{LayoutPlan, RegionInput, plan_layout},
    render::{
        backend::{CompositeBackend, SourceFrame},
        compositor::MultiRegionCompositor,
    },
    transform::affine,
};

/// Everything derived from the display state and options by [`CaptureSession::prepare`].
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct CapturePlan {
    pub display: DisplayInfo,
    pub layout: LayoutPlan,
    /// Size of the surface the display is mirrored into.
    pub input_size: Size,
    /// Inverse transform of region 1 (output to source), `None` when it is the identity.
    pub transform1: Option<Affine>,
    pub transform2: Option<Affine>,
    pub dual: bool,
}

impl CapturePlan {
    pub fn video_size(&self) -> Size {
        self.layout.combined
    }
}

#[derive(Debug, Default)]
struct InvalidationState {
    invalidated: AtomicBool,
    session_display_size: Mutex<Option<Size>>,
}

/// Thread-safe handle that marks a session for reconfiguration.
///
/// Display monitors run outside the graphics thread, so they hold a clone of this handle
/// rather than the session.
#[derive(Clone, Debug, Default)]
pub struct Invalidation {
    state: Arc<InvalidationState>,
}

impl Invalidation {
    pub fn request(&self) {
        self.state.invalidated.store(true, Ordering::Release);
        tracing::debug!("capture invalidated");
    }

    /// Invalidate if `size` differs from the display size the session was prepared with.
    pub fn notify_display_size(&self, size: Size) {
        let session_size = *self
            .state
            .session_display_size
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        if let Some(session_size) = session_size
            && session_size != size
        {
            tracing::debug!(from = %session_size, to = %size, "display size changed");
            self.request();
        }
    }

    pub fn is_invalidated(&self) -> bool {
        self.state.invalidated.load(Ordering::Acquire)
    }

    fn reset(&self, display_size: Size) {
        *self
            .state
            .session_display_size
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = Some(display_size);
        self.state.invalidated.store(false, Ordering::Release);
    }
}

/// Screen capture of one display, optionally split into two regions composited side by side.
///
/// Lifecycle: [`prepare`](Self::prepare) → [`start`](Self::start) →
/// [`render_frame`](Self::render_frame)* → [`stop`](Self::stop). Reconfiguring (after an
/// invalidation) is `stop`, `prepare`, `start` again; [`release`](Self::release) detaches the
/// display for good.
pub struct CaptureSession {
    options: CaptureOptions,
    capabilities: DeviceCapabilities,
    plan: Option<CapturePlan>,
    compositor: Option<MultiRegionCompositor>,
    attached: bool,
    invalidation: Invalidation,
}

impl CaptureSession {
    pub fn new(options: CaptureOptions, capabilities: DeviceCapabilities) -> SplitcapResult<Self> {
        options.validate()?;
        tracing::debug!(?capabilities, display_id = options.display_id, "capture session created");
        Ok(Self {
            options,
            capabilities,
            plan: None,
            compositor: None,
            attached: false,
            invalidation: Invalidation::default(),
        })
    }

    pub fn options(&self) -> &CaptureOptions {
        &self.options
    }

    pub fn capabilities(&self) -> DeviceCapabilities {
        self.capabilities
    }

    pub fn plan(&self) -> Option<&CapturePlan> {
        self.plan.as_ref()
    }

    /// Combined output size of the last prepare.
    pub fn video_size(&self) -> Option<Size> {
        self.plan.as_ref().map(CapturePlan::video_size)
    }

    pub fn is_started(&self) -> bool {
        self.compositor.is_some()
    }

    /// Applies from the next [`prepare`](Self::prepare).
    pub fn set_max_size(&mut self, max_size: u32) -> bool {
        self.options.max_size = max_size;
        true
    }

    pub fn invalidation_handle(&self) -> Invalidation {
        self.invalidation.clone()
    }

    pub fn request_invalidate(&self) {
        self.invalidation.request();
    }

    pub fn notify_display_size(&self, size: Size) {
        self.invalidation.notify_display_size(size);
    }

    pub fn is_invalidated(&self) -> bool {
        self.invalidation.is_invalidated()
    }

    fn build_region(
        &self,
        display: &DisplayInfo,
        crop: Option<Rect>,
    ) -> SplitcapResult<RegionTransformBuilder> {
        let transposed = display.rotation % 2 != 0;
        let locked = self.options.capture_orientation_lock != OrientationLock::Unlocked;
        let mut region = RegionTransformBuilder::new(display.size);
        if let Some(crop) = crop {
            region = region.add_crop(crop, transposed)?;
        }
        region
            .add_orientation(display.rotation, locked, self.options.capture_orientation)?
            .add_angle(self.options.angle)
    }

    /// Read the display state and derive region transforms and the output layout.
    #[tracing::instrument(skip_all, fields(display_id = self.options.display_id))]
    pub fn prepare(&mut self, source: &dyn DisplaySource) -> SplitcapResult<&CapturePlan> {
        let display_id = self.options.display_id;
        let Some(info) = source.display_info(display_id)? else {
            tracing::error!(
                display_id,
                available = ?source.display_ids(),
                "display not found"
            );
            return Err(SplitcapError::configuration(format!(
                "unknown display id: {display_id}"
            )));
        };

        if !info.supports_protected_buffers() {
            tracing::warn!(
                "display doesn't have the protected buffers flag, mirroring can be restricted"
            );
        }
        self.invalidation.reset(info.size);

        if self.options.capture_orientation_lock == OrientationLock::LockedInitial {
            self.options.capture_orientation_lock = OrientationLock::LockedValue;
            self.options.capture_orientation = Orientation::from_rotation(info.rotation)?;
            tracing::debug!(
                orientation = %self.options.capture_orientation,
                "capture orientation locked to the initial display orientation"
            );
        }

        let max_size = self.options.normalized_max_size();
        let plan = match self.options.crop_region2 {
            None => {
                let region1 = self.build_region(&info, self.options.crop)?;
                let transform1 = region1.inverse_transform()?;
                let layout = plan_layout(
                    Some(RegionInput::new(
                        region1.output_size(),
                        transform1.unwrap_or(affine::IDENTITY),
                    )),
                    None,
                    max_size,
                );
                CapturePlan {
                    display: info,
                    layout,
                    input_size: info.size,
                    transform1,
                    transform2: None,
                    dual: false,
                }
            }
            Some(crop2) => {
                // a missing first crop still occupies the region 1 slot, with zero area
                let region1 =
                    self.build_region(&info, Some(self.options.crop.unwrap_or_default()))?;
                let region2 = self.build_region(&info, Some(crop2))?;
                let transform1 = region1.inverse_transform()?;
                let transform2 = region2.inverse_transform()?;
                if max_size != 0 {
                    tracing::warn!(max_size, "max size is not applied to a dual-region capture");
                }
                tracing::warn!("input positions are mapped through region 1 only");
                let layout = plan_layout(
                    Some(RegionInput::new(
                        region1.output_size().round8(),
                        transform1.unwrap_or(affine::IDENTITY),
                    )),
                    Some(RegionInput::new(
                        region2.output_size().round8(),
                        transform2.unwrap_or(affine::IDENTITY),
                    )),
                    max_size,
                );
                CapturePlan {
                    display: info,
                    layout,
                    input_size: info.size,
                    transform1,
                    transform2,
                    dual: true,
                }
            }
        };

        tracing::info!(
            display_size = %info.size,
            video_size = %plan.video_size(),
            dual = plan.dual,
            "capture prepared"
        );
        Ok(self.plan.insert(plan))
    }

    /// Allocate the output, build the compositor and mirror the display into the input.
    ///
    /// Restarting a started session releases the previous compositor and display first.
    #[tracing::instrument(skip_all)]
    pub fn start(
        &mut self,
        backend: &mut dyn CompositeBackend,
        sink: &mut dyn DisplaySink,
        listener: Option<&dyn VirtualDisplayListener>,
    ) -> SplitcapResult<()> {
        self.stop(backend);
        if self.attached {
            sink.detach();
            self.attached = false;
        }

        let plan = self
            .plan
            .as_ref()
            .ok_or_else(|| SplitcapError::configuration("capture session is not prepared"))?;
        let video_size = plan.video_size();
        if video_size.is_empty() {
            return Err(SplitcapError::validation(format!(
                "capture output is empty ({video_size})"
            )));
        }

        backend.ensure_target(video_size)?;
        let mut compositor = MultiRegionCompositor::new(&plan.layout);
        compositor.init(backend)?;

        let attached = match sink.attach(&plan.display, plan.input_size) {
            Ok(attached) => attached,
            Err(e) => {
                compositor.release(backend);
                return Err(e);
            }
        };
        self.attached = true;

        if let Some(listener) = listener {
            let display_id = plan.display.display_id;
            let (virtual_display_id, target_size) = match attached.virtual_display_id {
                Some(id) if display_id != 0 => (id, plan.input_size),
                _ => (display_id, plan.display.size),
            };
            let mapper = PositionMapper::create(video_size, plan.transform1, target_size);
            listener.on_new_virtual_display(virtual_display_id, mapper);
        }

        tracing::debug!(
            regions = compositor.drawable_regions(),
            virtual_display = ?attached.virtual_display_id,
            "capture started"
        );
        self.compositor = Some(compositor);
        Ok(())
    }

    /// Composite one input frame into the output target.
    pub fn render_frame(
        &mut self,
        backend: &mut dyn CompositeBackend,
        frame: &SourceFrame<'_>,
    ) -> SplitcapResult<()> {
        let compositor = self
            .compositor
            .as_mut()
            .ok_or_else(|| SplitcapError::gpu("capture session is not started"))?;
        backend.clear_target([0, 0, 0, 0])?;
        compositor.draw(backend, frame)
    }

    /// Release the compositor. Frames must no longer be rendered.
    pub fn stop(&mut self, backend: &mut dyn CompositeBackend) {
        if let Some(compositor) = self.compositor.take() {
            compositor.release(backend);
            tracing::debug!("capture stopped");
        }
    }

    /// Detach the mirrored display.
    pub fn release(&mut self, sink: &mut dyn DisplaySink) {
        if self.attached {
            sink.detach();
            self.attached = false;
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/capture/session.rs"]
mod tests;
