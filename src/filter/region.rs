use crate::{
    foundation::core::{Affine, Rect, Size},
    foundation::error::{SplitcapError, SplitcapResult},
    foundation::orientation::Orientation,
    transform::affine,
};

/// Derives the output size and sampling transform of one capture region.
///
/// Each step consumes the builder and returns the updated accumulator, so a region is
/// described by an explicit, ordered chain:
///
/// ```
/// # use splitcap::{Orientation, Rect, RegionTransformBuilder, Size};
/// # fn main() -> splitcap::SplitcapResult<()> {
/// let region = RegionTransformBuilder::new(Size::new(1080, 2400))
///     .add_crop(Rect::new(0, 0, 1080, 1200), false)?
///     .add_orientation(0, false, Orientation::Orient0)?
///     .add_angle(0.0)?;
/// assert_eq!(region.output_size(), Size::new(1080, 1200));
/// # Ok(())
/// # }
/// ```
///
/// The forward transform maps normalized source coordinates to normalized region
/// coordinates. Renderers need the inverse, which maps an output texture coordinate back
/// into the source texture.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RegionTransformBuilder {
    size: Size,
    transform: Option<Affine>,
}

impl RegionTransformBuilder {
    pub fn new(source_size: Size) -> Self {
        Self {
            size: source_size,
            transform: None,
        }
    }

    fn then(self, step: Affine, size: Size) -> Self {
        let transform = match self.transform {
            Some(prev) => affine::compose(step, prev),
            None => step,
        };
        Self {
            size,
            transform: Some(transform),
        }
    }

    /// Restrict the region to `crop`, given in pixels of the current (unrotated) source.
    ///
    /// When `transposed` is set the source is rotated by a quarter turn relative to its
    /// natural orientation, so the crop axes are exchanged first. A zero-area crop yields an
    /// empty region and leaves the transform untouched.
    pub fn add_crop(self, crop: Rect, transposed: bool) -> SplitcapResult<Self> {
        let crop = if transposed { crop.transposed() } else { crop };
        let (input_w, input_h) = (self.size.width as i32, self.size.height as i32);
        if crop.width() < 0
            || crop.height() < 0
            || crop.left < 0
            || crop.top < 0
            || crop.right > input_w
            || crop.bottom > input_h
        {
            return Err(SplitcapError::validation(format!(
                "crop {crop} exceeds the input area ({})",
                self.size
            )));
        }

        let size = Size::new(crop.width() as u32, crop.height() as u32);
        if size.is_empty() {
            tracing::debug!(%crop, "zero-area crop, region will not be drawn");
            return Ok(Self {
                size,
                transform: self.transform,
            });
        }

        let input_w = f64::from(self.size.width);
        let input_h = f64::from(self.size.height);
        let x = f64::from(crop.left) / input_w;
        // GL origin is bottom-left
        let y = 1.0 - f64::from(crop.bottom) / input_h;
        let w = f64::from(crop.width()) / input_w;
        let h = f64::from(crop.height()) / input_h;
        Ok(self.then(affine::reframe(x, y, w, h)?, size))
    }

    /// Rotate the region counter-clockwise by `ccw_rotation` quarter turns.
    pub fn add_rotation(self, ccw_rotation: u8) -> SplitcapResult<Self> {
        let ccw_rotation = ccw_rotation % 4;
        if ccw_rotation == 0 {
            return Ok(self);
        }
        let size = if ccw_rotation % 2 != 0 {
            self.size.rotate()
        } else {
            self.size
        };
        Ok(self.then(affine::rotate_ortho(ccw_rotation)?, size))
    }

    /// Apply a capture orientation: flip first, then the clockwise rotation.
    pub fn add_capture_orientation(self, orientation: Orientation) -> SplitcapResult<Self> {
        let mut builder = self;
        if orientation.is_flipped() {
            builder = builder.then(affine::hflip(), builder.size);
        }
        let ccw_rotation = (4 - orientation.rotation()) % 4;
        builder.add_rotation(ccw_rotation)
    }

    /// Orient the region.
    ///
    /// Unlocked, `orientation` is applied on top of the current display rotation. Locked,
    /// the display rotation is undone first, so `orientation` is reached from the natural
    /// device orientation whatever the display currently does.
    pub fn add_orientation(
        self,
        display_rotation: u8,
        locked: bool,
        orientation: Orientation,
    ) -> SplitcapResult<Self> {
        let builder = if locked {
            let reverse_display_rotation = (4 - display_rotation % 4) % 4;
            self.add_rotation(reverse_display_rotation)?
        } else {
            self
        };
        builder.add_capture_orientation(orientation)
    }

    /// Rotate the content by a free clockwise angle around the region center.
    ///
    /// The output size is unchanged: content rotated out of the rectangle is masked, and
    /// uncovered areas render transparent.
    pub fn add_angle(self, cw_degrees: f64) -> SplitcapResult<Self> {
        if !cw_degrees.is_finite() {
            return Err(SplitcapError::validation(format!(
                "angle must be finite, got {cw_degrees}"
            )));
        }
        if cw_degrees == 0.0 || self.size.is_empty() {
            return Ok(self);
        }
        let aspect_ratio = f64::from(self.size.width) / f64::from(self.size.height);
        let rotation = affine::from_center(affine::with_aspect_ratio(
            affine::rotate_deg(-cw_degrees),
            aspect_ratio,
        ));
        Ok(self.then(rotation, self.size))
    }

    pub fn output_size(&self) -> Size {
        self.size
    }

    /// Forward transform, or `None` when no step altered the source mapping.
    pub fn transform(&self) -> Option<Affine> {
        self.transform
    }

    pub fn inverse_transform(&self) -> SplitcapResult<Option<Affine>> {
        self.transform.map(affine::invert).transpose()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/filter/region.rs"]
mod tests;
