use crate::{
    foundation::core::{Affine, Size},
    transform::affine,
};

/// Number of regions a capture can composite side by side.
pub const MAX_REGIONS: usize = 2;

/// A render sub-rectangle of the combined output, in GL window coordinates
/// (`x, y` is the bottom-left corner).
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Viewport {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn size(self) -> Size {
        Size::new(self.width, self.height)
    }
}

/// One region as produced by its transform builder.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RegionInput {
    pub size: Size,
    pub inverse_transform: Affine,
}

impl RegionInput {
    pub fn new(size: Size, inverse_transform: Affine) -> Self {
        Self {
            size,
            inverse_transform,
        }
    }
}

/// Placement of one region inside the combined output.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RegionLayout {
    pub inverse_transform: Affine,
    pub output_size: Size,
    pub x: u32,
    pub y: u32,
}

impl RegionLayout {
    /// `None` for an empty region, which is never drawn.
    pub fn viewport(&self) -> Option<Viewport> {
        if self.output_size.is_empty() {
            return None;
        }
        Some(Viewport::new(
            self.x,
            self.y,
            self.output_size.width,
            self.output_size.height,
        ))
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LayoutPlan {
    pub combined: Size,
    pub regions: [Option<RegionLayout>; MAX_REGIONS],
}

impl LayoutPlan {
    pub fn region1(&self) -> Option<&RegionLayout> {
        self.regions[0].as_ref()
    }

    pub fn region2(&self) -> Option<&RegionLayout> {
        self.regions[1].as_ref()
    }

    /// Viewports in draw order, empty regions skipped.
    pub fn viewports(&self) -> impl Iterator<Item = Viewport> + '_ {
        self.regions.iter().flatten().filter_map(RegionLayout::viewport)
    }
}

/// Pack up to two regions into one combined output.
///
/// A single region fills the whole output, limited to `max_size` on its longest edge. Once a
/// second region is configured, regions are concatenated horizontally from the left edge,
/// both anchored at the bottom (`y = 0`), and `max_size` is not applied. Empty regions
/// reserve no width.
///
/// The combined size is rounded up to a multiple of 8.
pub fn plan_layout(
    region1: Option<RegionInput>,
    region2: Option<RegionInput>,
    max_size: u32,
) -> LayoutPlan {
    let plan = match (region1, region2) {
        (None, None) => LayoutPlan {
            combined: Size::ZERO,
            regions: [None, None],
        },
        (Some(r1), None) => {
            let combined = r1.size.limit(max_size).round8();
            LayoutPlan {
                combined,
                regions: [
                    Some(RegionLayout {
                        inverse_transform: r1.inverse_transform,
                        output_size: if r1.size.is_empty() {
                            r1.size
                        } else {
                            combined
                        },
                        x: 0,
                        y: 0,
                    }),
                    None,
                ],
            }
        }
        (r1, Some(r2)) => {
            let r1 = r1.unwrap_or_else(|| RegionInput::new(Size::ZERO, affine::IDENTITY));
            let mut x = 0u32;
            let mut height = 0u32;
            let mut place = |r: RegionInput| {
                let layout = RegionLayout {
                    inverse_transform: r.inverse_transform,
                    output_size: r.size,
                    x,
                    y: 0,
                };
                if !r.size.is_empty() {
                    x += r.size.width;
                    height = height.max(r.size.height);
                }
                layout
            };
            let regions = [Some(place(r1)), Some(place(r2))];
            LayoutPlan {
                combined: Size::new(x, height).round8(),
                regions,
            }
        }
    };

    tracing::debug!(
        combined = %plan.combined,
        regions = plan.viewports().count(),
        "planned capture layout"
    );
    plan
}

#[cfg(test)]
#[path = "../../tests/unit/layout/planner.rs"]
mod tests;
