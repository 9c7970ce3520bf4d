use std::{fmt, str::FromStr};

use crate::foundation::error::{SplitcapError, SplitcapResult};

/// Capture orientation: an optional horizontal flip followed by a clockwise quarter-turn rotation.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum Orientation {
    #[default]
    #[serde(rename = "0")]
    Orient0,
    #[serde(rename = "90")]
    Orient90,
    #[serde(rename = "180")]
    Orient180,
    #[serde(rename = "270")]
    Orient270,
    #[serde(rename = "flip0")]
    Flip0,
    #[serde(rename = "flip90")]
    Flip90,
    #[serde(rename = "flip180")]
    Flip180,
    #[serde(rename = "flip270")]
    Flip270,
}

impl Orientation {
    pub const ALL: [Orientation; 8] = [
        Orientation::Orient0,
        Orientation::Orient90,
        Orientation::Orient180,
        Orientation::Orient270,
        Orientation::Flip0,
        Orientation::Flip90,
        Orientation::Flip180,
        Orientation::Flip270,
    ];

    fn index(self) -> usize {
        self as usize
    }

    /// Clockwise rotation in quarter turns (`0..4`).
    pub fn rotation(self) -> u8 {
        (self.index() & 3) as u8
    }

    pub fn is_flipped(self) -> bool {
        self.index() & 4 != 0
    }

    /// Orientation matching a display rotation.
    ///
    /// Display rotations are counter-clockwise quarter turns; orientations are clockwise.
    pub fn from_rotation(ccw_rotation: u8) -> SplitcapResult<Self> {
        if ccw_rotation >= 4 {
            return Err(SplitcapError::validation(format!(
                "display rotation must be in 0..4, got {ccw_rotation}"
            )));
        }
        let cw_rotation = (4 - usize::from(ccw_rotation)) % 4;
        Ok(Self::ALL[cw_rotation])
    }

    pub fn name(self) -> &'static str {
        match self {
            Orientation::Orient0 => "0",
            Orientation::Orient90 => "90",
            Orientation::Orient180 => "180",
            Orientation::Orient270 => "270",
            Orientation::Flip0 => "flip0",
            Orientation::Flip90 => "flip90",
            Orientation::Flip180 => "flip180",
            Orientation::Flip270 => "flip270",
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Orientation {
    type Err = SplitcapError;

    fn from_str(s: &str) -> SplitcapResult<Self> {
        Self::ALL
            .into_iter()
            .find(|o| o.name() == s)
            .ok_or_else(|| {
                SplitcapError::configuration(format!(
                    "unsupported orientation \"{s}\" (expected one of 0, 90, 180, 270, flip0, flip90, flip180, flip270)"
                ))
            })
    }
}

/// Whether the capture orientation follows the display or stays fixed.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum OrientationLock {
    /// Orientation is applied relative to the current display rotation.
    #[default]
    Unlocked,
    /// Lock to whatever orientation the display has when capture starts.
    LockedInitial,
    /// Lock to an explicit orientation relative to the natural device orientation.
    LockedValue,
}

/// Parse the `[@]<orientation>` notation.
///
/// A leading `@` locks the orientation; `@` alone locks it to the initial display orientation.
pub fn parse_capture_orientation(s: &str) -> SplitcapResult<(OrientationLock, Orientation)> {
    match s.strip_prefix('@') {
        Some("") => Ok((OrientationLock::LockedInitial, Orientation::Orient0)),
        Some(rest) => Ok((OrientationLock::LockedValue, rest.parse()?)),
        None => Ok((OrientationLock::Unlocked, s.parse()?)),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/orientation.rs"]
mod tests;
