use std::{fmt, str::FromStr};

use crate::foundation::error::{SplitcapError, SplitcapResult};

pub use kurbo::{Affine, Point, Vec2};

/// Pixel dimensions of a display, region or output surface.
///
/// Zero in either dimension marks a region that contributes nothing and is never drawn.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const ZERO: Size = Size {
        width: 0,
        height: 0,
    };

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Swap width and height (quarter-turn rotation).
    pub fn rotate(self) -> Self {
        Self::new(self.height, self.width)
    }

    pub fn is_multiple_of_8(self) -> bool {
        self.width % 8 == 0 && self.height % 8 == 0
    }

    /// Cap the longest edge to `max_size`, preserving the aspect ratio.
    ///
    /// `max_size == 0` means "no limit".
    pub fn limit(self, max_size: u32) -> Self {
        if max_size == 0 {
            return self;
        }
        let portrait = self.height > self.width;
        let (major, minor) = if portrait {
            (self.height, self.width)
        } else {
            (self.width, self.height)
        };
        if major <= max_size {
            return self;
        }
        let new_minor = (u64::from(max_size) * u64::from(minor) / u64::from(major)) as u32;
        if portrait {
            Self::new(new_minor, max_size)
        } else {
            Self::new(max_size, new_minor)
        }
    }

    /// Round both dimensions up to the next multiple of 8 (codec/surface alignment).
    pub fn round8(self) -> Self {
        Self::new(self.width.next_multiple_of(8), self.height.next_multiple_of(8))
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Axis-aligned integer rectangle in source-space pixels (`right`/`bottom` exclusive).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(self) -> i32 {
        self.right - self.left
    }

    pub fn height(self) -> i32 {
        self.bottom - self.top
    }

    pub fn is_empty(self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }

    /// The same rectangle with x and y axes exchanged.
    pub fn transposed(self) -> Self {
        Self::new(self.top, self.left, self.bottom, self.right)
    }

    pub fn from_size(size: Size) -> Self {
        Self::new(0, 0, size.width as i32, size.height as i32)
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.width(),
            self.height(),
            self.left,
            self.top
        )
    }
}

/// Parses the `width:height:x:y` crop notation.
impl FromStr for Rect {
    type Err = SplitcapError;

    fn from_str(s: &str) -> SplitcapResult<Self> {
        let tokens: Vec<&str> = s.split(':').collect();
        if tokens.len() != 4 {
            return Err(SplitcapError::configuration(format!(
                "crop must contain 4 values separated by colons: \"{s}\""
            )));
        }
        let mut values = [0i32; 4];
        for (slot, token) in values.iter_mut().zip(&tokens) {
            *slot = token.trim().parse().map_err(|_| {
                SplitcapError::configuration(format!("invalid crop value \"{token}\" in \"{s}\""))
            })?;
        }
        let [width, height, x, y] = values;
        if width < 0 || height < 0 {
            return Err(SplitcapError::configuration(format!(
                "crop size must not be negative: \"{s}\""
            )));
        }
        let (Some(right), Some(bottom)) = (x.checked_add(width), y.checked_add(height)) else {
            return Err(SplitcapError::configuration(format!(
                "crop exceeds the coordinate range: \"{s}\""
            )));
        };
        Ok(Self::new(x, y, right, bottom))
    }
}

/// Integer pixel position, used when mapping input coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PixelPoint {
    pub x: i32,
    pub y: i32,
}

impl PixelPoint {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
