//! Platform collaborators of a capture session.
//!
//! A session never talks to a display server directly: it reads display state through
//! [`DisplaySource`], hands its input surface to a [`DisplaySink`], and announces the
//! resulting display to a [`VirtualDisplayListener`]. [`StaticDisplay`] is an in-process
//! implementation backed by a fixed display description.

use std::sync::Mutex;

use crate::{
    capture::position::PositionMapper,
    foundation::core::Size,
    foundation::error::{SplitcapError, SplitcapResult},
};

/// Display supports protected (secure) buffers; mirroring may be restricted without it.
pub const FLAG_SUPPORTS_PROTECTED_BUFFERS: u32 = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DisplayInfo {
    pub display_id: u32,
    /// Current size, already rotated by `rotation`.
    pub size: Size,
    /// Counter-clockwise quarter turns from the natural orientation.
    pub rotation: u8,
    pub layer_stack: u32,
    pub flags: u32,
}

impl DisplayInfo {
    pub fn supports_protected_buffers(&self) -> bool {
        self.flags & FLAG_SUPPORTS_PROTECTED_BUFFERS != 0
    }
}

/// Facts about the device, reported once by the platform when a session is created.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DeviceCapabilities {
    /// The device renders a spatial (head-mounted) display.
    pub spatial_display: bool,
}

pub trait DisplaySource {
    /// `Ok(None)` when no display has this id.
    fn display_info(&self, display_id: u32) -> SplitcapResult<Option<DisplayInfo>>;

    /// Known display ids, used to describe the alternatives when a lookup fails.
    fn display_ids(&self) -> Vec<u32>;
}

/// Result of attaching the capture input surface to a display.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AttachedDisplay {
    /// Id of the virtual display created for the capture, if the platform created one.
    pub virtual_display_id: Option<u32>,
}

/// Destination that mirrors a display into the capture input surface.
pub trait DisplaySink {
    fn attach(
        &mut self,
        display: &DisplayInfo,
        input_size: Size,
    ) -> SplitcapResult<AttachedDisplay>;
    fn detach(&mut self);
}

pub trait VirtualDisplayListener {
    fn on_new_virtual_display(&self, display_id: u32, mapper: PositionMapper);
}

/// A single display with a fixed description.
#[derive(Debug)]
pub struct StaticDisplay {
    info: Mutex<DisplayInfo>,
    attached: Option<Size>,
    virtual_display: bool,
}

impl StaticDisplay {
    pub fn new(display_id: u32, size: Size, rotation: u8) -> Self {
        Self {
            info: Mutex::new(DisplayInfo {
                display_id,
                size,
                rotation: rotation % 4,
                layer_stack: 0,
                flags: FLAG_SUPPORTS_PROTECTED_BUFFERS,
            }),
            attached: None,
            virtual_display: false,
        }
    }

    pub fn with_flags(self, flags: u32) -> Self {
        self.update(|info| info.flags = flags);
        self
    }

    /// Report a virtual display (id `display_id + 1000`) on attach.
    pub fn with_virtual_display(mut self) -> Self {
        self.virtual_display = true;
        self
    }

    /// Rotate the display by `rotation` counter-clockwise quarter turns from its current state.
    pub fn rotate(&self, rotation: u8) {
        self.update(|info| {
            if rotation % 2 != 0 {
                info.size = info.size.rotate();
            }
            info.rotation = (info.rotation + rotation) % 4;
        });
    }

    pub fn info(&self) -> DisplayInfo {
        *self.info.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn attached_size(&self) -> Option<Size> {
        self.attached
    }

    fn update(&self, f: impl FnOnce(&mut DisplayInfo)) {
        let mut info = self.info.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut info);
    }
}

impl DisplaySource for StaticDisplay {
    fn display_info(&self, display_id: u32) -> SplitcapResult<Option<DisplayInfo>> {
        let info = self.info();
        Ok((info.display_id == display_id).then_some(info))
    }

    fn display_ids(&self) -> Vec<u32> {
        vec![self.info().display_id]
    }
}

impl DisplaySink for StaticDisplay {
    fn attach(
        &mut self,
        display: &DisplayInfo,
        input_size: Size,
    ) -> SplitcapResult<AttachedDisplay> {
        if input_size.is_empty() {
            return Err(SplitcapError::display(format!(
                "cannot mirror display {} into an empty surface",
                display.display_id
            )));
        }
        self.attached = Some(input_size);
        Ok(AttachedDisplay {
            virtual_display_id: self
                .virtual_display
                .then_some(display.display_id + 1000),
        })
    }

    fn detach(&mut self) {
        self.attached = None;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/capture/display.rs"]
mod tests;
