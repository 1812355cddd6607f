use crate::coords::{self, DisplayPoint, ImagePoint, SurfaceSize};
use crate::error::SelectionError;
use crate::windowing::CANONICAL_SIZE;

/// Share of the display surface width covered by the automatic
/// carotid rectangle.
pub const AUTO_REGION_WIDTH_FRACTION: f32 = 0.4;
/// Share of the display surface height covered by the automatic
/// carotid rectangle.
pub const AUTO_REGION_HEIGHT_FRACTION: f32 = 0.3;

/// Axis-aligned rectangle in canonical image space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl RegionRect {
    /// Rectangle spanned by two corner points, in either drag order.
    pub fn from_corners(a: ImagePoint, b: ImagePoint) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            width: a.x.abs_diff(b.x),
            height: a.y.abs_diff(b.y),
        }
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// Candidate carotid region and its provenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Region {
    #[default]
    None,
    Manual(RegionRect),
    Automatic(RegionRect),
}

/// Tracks the single active candidate region. Manual drawing and the
/// automatic heuristic are mutually exclusive: committing either kind
/// replaces the other, and starting a manual drag already discards an
/// automatic region.
#[derive(Debug, Clone, Default)]
pub struct RegionSelector {
    region: Region,
}

impl RegionSelector {
    pub fn new() -> Self {
        Self {
            region: Region::None,
        }
    }

    pub fn region(&self) -> Region {
        self.region
    }

    pub fn active_rect(&self) -> Option<RegionRect> {
        match self.region {
            Region::None => None,
            Region::Manual(rect) | Region::Automatic(rect) => Some(rect),
        }
    }

    /// Marks the start of a manual drag. Any automatic region is
    /// discarded immediately, before the drag completes.
    pub fn begin_manual_drag(&mut self) {
        if matches!(self.region, Region::Automatic(_)) {
            self.region = Region::None;
        }
    }

    /// Commits a manually drawn rectangle from its drag corners in
    /// display space. Either corner falling outside the displayed
    /// image, or a zero-area result, rejects the whole commit and
    /// leaves the current region untouched.
    pub fn set_manual(
        &mut self,
        start: DisplayPoint,
        end: DisplayPoint,
        surface: SurfaceSize,
    ) -> Result<RegionRect, SelectionError> {
        let rect = convert_corners(start, end, surface)?;
        self.region = Region::Manual(rect);
        Ok(rect)
    }

    /// Commits the centered heuristic rectangle for the given surface.
    pub fn set_automatic(&mut self, surface: SurfaceSize) -> Result<RegionRect, SelectionError> {
        let width = surface.width * AUTO_REGION_WIDTH_FRACTION;
        let height = surface.height * AUTO_REGION_HEIGHT_FRACTION;
        let x = (surface.width - width) / 2.0;
        let y = (surface.height - height) / 2.0;
        let rect = convert_corners(
            DisplayPoint::new(x, y),
            DisplayPoint::new(x + width, y + height),
            surface,
        )?;
        self.region = Region::Automatic(rect);
        Ok(rect)
    }

    /// Clears the region entirely.
    pub fn reset(&mut self) {
        self.region = Region::None;
    }
}

fn convert_corners(
    a: DisplayPoint,
    b: DisplayPoint,
    surface: SurfaceSize,
) -> Result<RegionRect, SelectionError> {
    let a = coords::to_image_space(a, surface, CANONICAL_SIZE)?;
    let b = coords::to_image_space(b, surface, CANONICAL_SIZE)?;
    let rect = RegionRect::from_corners(a, b);
    if rect.width == 0 || rect.height == 0 {
        return Err(SelectionError::DegenerateRegion);
    }
    Ok(rect)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SURFACE: SurfaceSize = SurfaceSize {
        width: 512.0,
        height: 512.0,
    };

    fn manual_rect(selector: &mut RegionSelector) -> RegionRect {
        selector
            .set_manual(
                DisplayPoint::new(40.0, 60.0),
                DisplayPoint::new(140.0, 110.0),
                SURFACE,
            )
            .unwrap()
    }

    #[test]
    fn corners_normalize_in_either_drag_order() {
        let a = ImagePoint { x: 140, y: 60 };
        let b = ImagePoint { x: 40, y: 110 };
        let rect = RegionRect::from_corners(a, b);
        assert_eq!(
            rect,
            RegionRect {
                x: 40,
                y: 60,
                width: 100,
                height: 50
            }
        );
    }

    #[test]
    fn manual_commit_replaces_automatic() {
        let mut selector = RegionSelector::new();
        selector.set_automatic(SURFACE).unwrap();
        let rect = manual_rect(&mut selector);
        assert_eq!(selector.region(), Region::Manual(rect));
    }

    #[test]
    fn automatic_commit_replaces_manual() {
        let mut selector = RegionSelector::new();
        manual_rect(&mut selector);
        let rect = selector.set_automatic(SURFACE).unwrap();
        assert_eq!(selector.region(), Region::Automatic(rect));
    }

    #[test]
    fn drag_start_discards_automatic_before_completion() {
        let mut selector = RegionSelector::new();
        selector.set_automatic(SURFACE).unwrap();
        selector.begin_manual_drag();
        assert_eq!(selector.region(), Region::None);
    }

    #[test]
    fn drag_start_keeps_manual_region() {
        let mut selector = RegionSelector::new();
        let rect = manual_rect(&mut selector);
        selector.begin_manual_drag();
        assert_eq!(selector.region(), Region::Manual(rect));
    }

    #[test]
    fn out_of_bounds_corner_rejects_and_preserves_state() {
        let mut selector = RegionSelector::new();
        let rect = manual_rect(&mut selector);
        let result = selector.set_manual(
            DisplayPoint::new(-4.0, 10.0),
            DisplayPoint::new(90.0, 90.0),
            SURFACE,
        );
        assert!(matches!(result, Err(SelectionError::OutOfBounds { .. })));
        assert_eq!(selector.region(), Region::Manual(rect));
    }

    #[test]
    fn zero_area_drag_is_rejected() {
        let mut selector = RegionSelector::new();
        let result = selector.set_manual(
            DisplayPoint::new(100.0, 50.0),
            DisplayPoint::new(100.4, 90.0),
            SURFACE,
        );
        assert_eq!(result.unwrap_err(), SelectionError::DegenerateRegion);
        assert_eq!(selector.region(), Region::None);
    }

    #[test]
    fn automatic_rect_is_centered() {
        let mut selector = RegionSelector::new();
        let rect = selector.set_automatic(SURFACE).unwrap();
        // 40% x 30% of a 512 surface at scale 1, truncated corners
        assert_eq!(
            rect,
            RegionRect {
                x: 153,
                y: 179,
                width: 205,
                height: 153
            }
        );
    }

    #[test]
    fn reset_clears_any_region() {
        let mut selector = RegionSelector::new();
        manual_rect(&mut selector);
        selector.reset();
        assert_eq!(selector.region(), Region::None);
    }
}
