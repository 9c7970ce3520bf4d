use crate::{
    foundation::core::{Affine, PixelPoint, Size},
    transform::affine,
};

/// A point in video pixels, as reported by a client rendering a video of `screen_size`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Position {
    pub point: PixelPoint,
    pub screen_size: Size,
}

impl Position {
    pub fn new(x: i32, y: i32, screen_size: Size) -> Self {
        Self {
            point: PixelPoint::new(x, y),
            screen_size,
        }
    }
}

/// Maps positions in the captured video back to device (or virtual display) pixels.
///
/// Only the first region's inverse transform is used: in a dual-region capture, points
/// falling in the second region are mapped as if they belonged to the first.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PositionMapper {
    video_size: Size,
    transform: Option<Affine>,
}

impl PositionMapper {
    /// `filter_transform` maps normalized video coordinates to normalized source coordinates.
    pub fn create(video_size: Size, filter_transform: Option<Affine>, target_size: Size) -> Self {
        let transform = (!video_size.is_empty()).then(|| {
            let to_source = filter_transform.unwrap_or(affine::IDENTITY);
            affine::ndc_to_pixels(target_size) * to_source * affine::ndc_from_pixels(video_size)
        });
        Self {
            video_size,
            transform,
        }
    }

    pub fn video_size(&self) -> Size {
        self.video_size
    }

    /// `None` if the client's video size does not match the current one (e.g. a stale event
    /// from before a rotation).
    pub fn map(&self, position: Position) -> Option<PixelPoint> {
        if position.screen_size != self.video_size {
            return None;
        }
        let transform = self.transform?;
        Some(affine::apply(transform, position.point))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/capture/position.rs"]
mod tests;
