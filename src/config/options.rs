use std::io::Read;

use crate::{
    foundation::core::Rect,
    foundation::error::{SplitcapError, SplitcapResult},
    foundation::orientation::{Orientation, OrientationLock, parse_capture_orientation},
};

/// Options of one capture session.
///
/// Every field has a default, so a JSON document only needs the fields it changes:
///
/// ```json
/// { "display_id": 0, "crop": { "left": 0, "top": 0, "right": 1080, "bottom": 1200 } }
/// ```
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CaptureOptions {
    pub display_id: u32,
    /// Longest-edge cap of a single-region capture; `0` disables it.
    pub max_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crop: Option<Rect>,
    /// Second region, packed to the right of the first.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crop_region2: Option<Rect>,
    pub capture_orientation_lock: OrientationLock,
    pub capture_orientation: Orientation,
    /// Free rotation in degrees, clockwise.
    pub angle: f64,
}

impl CaptureOptions {
    pub fn from_json_str(s: &str) -> SplitcapResult<Self> {
        let options: Self = serde_json::from_str(s)
            .map_err(|e| SplitcapError::serde(format!("capture options: {e}")))?;
        options.validate()?;
        Ok(options)
    }

    pub fn from_json_reader(r: impl Read) -> SplitcapResult<Self> {
        let options: Self = serde_json::from_reader(r)
            .map_err(|e| SplitcapError::serde(format!("capture options: {e}")))?;
        options.validate()?;
        Ok(options)
    }

    pub fn to_json_pretty(&self) -> SplitcapResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| SplitcapError::serde(format!("capture options: {e}")))
    }

    pub fn validate(&self) -> SplitcapResult<()> {
        if !self.angle.is_finite() {
            return Err(SplitcapError::validation("angle must be finite"));
        }
        for (name, crop) in [("crop", self.crop), ("crop_region2", self.crop_region2)] {
            let Some(crop) = crop else { continue };
            if crop.left < 0 || crop.top < 0 {
                return Err(SplitcapError::validation(format!(
                    "{name} origin must be >= 0, got {crop}"
                )));
            }
            if crop.width() < 0 || crop.height() < 0 {
                return Err(SplitcapError::validation(format!(
                    "{name} must have a non-negative size, got {crop}"
                )));
            }
        }
        Ok(())
    }

    /// `max_size` rounded down to a multiple of 8.
    pub fn normalized_max_size(&self) -> u32 {
        self.max_size & !7
    }

    pub fn is_dual_region(&self) -> bool {
        self.crop_region2.is_some()
    }

    /// Set lock and orientation from the `[@]<orientation>` notation.
    pub fn set_capture_orientation(&mut self, s: &str) -> SplitcapResult<()> {
        let (lock, orientation) = parse_capture_orientation(s)?;
        self.capture_orientation_lock = lock;
        self.capture_orientation = orientation;
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/config/options.rs"]
mod tests;
